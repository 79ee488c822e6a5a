/*!
 * Child Programs
 * Bodies exec'd many times over by the driver programs
 */

use crate::core::limits::POINTER_SIZE;
use crate::syscalls::{ProgramResult, UserContext};
use std::thread;
use std::time::Duration;

/// Sleeps for a PID-dependent moment, then exits with status 0
///
/// The staggered delay makes siblings finish out of exec order.
pub fn child_exit(ctx: &mut UserContext) -> ProgramResult<i32> {
    let delay = u64::from((ctx.pid() * 7) % 5);
    thread::sleep(Duration::from_millis(delay));
    ctx.exit(0)?;
    Ok(0)
}

/// Treats the bytes of argv[0] as a pointer and exits with the word it names
///
/// The address is interpreted in this process's own memory, so a pointer
/// taken in the parent never reaches the parent's data. A pointer outside
/// the address space kills the process.
pub fn child_deref(ctx: &mut UserContext) -> ProgramResult<i32> {
    let args = ctx.raw_args()?;
    let Some(first) = args.first() else {
        ctx.exit(-1)?;
        return Ok(-1);
    };

    let mut bytes = [0u8; POINTER_SIZE];
    for (dst, src) in bytes.iter_mut().zip(first) {
        *dst = *src;
    }
    let value = ctx.read_i32(u32::from_le_bytes(bytes))?;
    ctx.exit(value)?;
    Ok(value)
}
