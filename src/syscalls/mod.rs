/*!
 * Syscalls Module
 *
 * User-facing side of the kernel: the per-process context, the numeric
 * syscall ABI, and the console device behind fds 0 and 1.
 */

pub mod console;
pub mod context;
mod handlers;
pub mod numbers;
pub mod trap;

pub use console::Console;
pub use context::UserContext;
pub use numbers::Syscall;
pub use trap::{ProgramResult, Trap};
