/*!
 * echo
 * Prints its argument count and each argument
 */

use crate::syscalls::{ProgramResult, UserContext};

pub fn echo(ctx: &mut UserContext) -> ProgramResult<i32> {
    let args = ctx.args()?;
    ctx.print(&format!("{} arguments\n", args.len()))?;
    for (i, arg) in args.iter().enumerate() {
        ctx.print(&format!("arg {i}: {arg}\n"))?;
    }
    Ok(0)
}
