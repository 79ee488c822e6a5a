/*!
 * Built-in Programs
 *
 * Native user programs shipped with the kernel, and the executable images
 * that name them. Each image's entry symbol is bound in `entries()`.
 */

mod children;
mod drivers;
mod echo;

use crate::core::errors::KernelError;
use crate::core::types::KernelResult;
use crate::loader::{EntryTable, ImageBuilder, MemImageStore};
use crate::syscalls::{ProgramResult, UserContext};
use std::sync::Arc;

pub use children::{child_deref, child_exit};
pub use drivers::{child_deref_test, child_exit_test, exec_test};
pub use echo::echo;

/// Image name and entry symbol of every built-in program
pub const BUILTINS: &[(&str, &str)] = &[
    ("echo.coff", "echo"),
    ("halt.coff", "halt"),
    ("child_exit.coff", "child_exit"),
    ("child_deref.coff", "child_deref"),
    ("exec_test.coff", "exec_test"),
    ("child_exit_test.coff", "child_exit_test"),
    ("child_deref_test.coff", "child_deref_test"),
];

/// Entry table binding every built-in symbol
pub fn entries() -> EntryTable {
    let table = EntryTable::new();
    table.register("echo", Arc::new(echo));
    table.register("halt", Arc::new(halt));
    table.register("child_exit", Arc::new(child_exit));
    table.register("child_deref", Arc::new(child_deref));
    table.register("exec_test", Arc::new(exec_test));
    table.register("child_exit_test", Arc::new(child_exit_test));
    table.register("child_deref_test", Arc::new(child_deref_test));
    table
}

/// In-memory store holding an image for every built-in program
pub fn images() -> KernelResult<MemImageStore> {
    let store = MemImageStore::new();
    for &(name, entry) in BUILTINS {
        let image = ImageBuilder::new(entry)
            .section(".text", entry.as_bytes().to_vec())
            .build();
        store
            .insert_image(name, &image)
            .map_err(|source| KernelError::ImageEncoding {
                name: name.to_string(),
                source,
            })?;
    }
    Ok(store)
}

/// Stop the machine; prints a message if the kernel refuses
pub fn halt(ctx: &mut UserContext) -> ProgramResult<i32> {
    ctx.halt()?;
    ctx.print("Machine halt did not happen\n")?;
    Ok(1)
}

/// exec `name` with `args` through the syscall ABI, as a C driver would
pub(crate) fn spawn(ctx: &mut UserContext, name: &str, args: &[&str]) -> ProgramResult<i32> {
    let saved = ctx.stack_pointer();
    let name_ptr = ctx.push_str(name)?;
    let argv = ctx.push_argv(args)?;
    let pid = ctx.exec(name_ptr, args.len() as i32, argv);
    ctx.restore_stack(saved);
    pid
}
