/*!
 * Userprog Kernel Library
 * Process creation, argument passing, and exit-status collection for user programs
 */

pub mod core;
pub mod loader;
pub mod memory;
pub mod monitoring;
pub mod process;
pub mod programs;
pub mod syscalls;

// Re-exports
pub use crate::core::{ConfigError, KernelConfig, KernelError, Pid, KERNEL_PID, SYSCALL_FAILURE};
pub use loader::{
    DirImageStore, EntryTable, ImageBuilder, ImageFile, ImageStore, LayeredImageStore, LoadError,
    Loader, MemImageStore, UserProgram,
};
pub use memory::{AddressSpace, FramePool, FrameStats, MemoryError};
pub use monitoring::init_tracing;
pub use process::{
    ArgumentVector, ExecError, ExitKind, ExitStatus, JoinError, KernelStats, MarshalError,
    ProcessError, ProcessInfo, ProcessManager, ProcessState, Shutdown,
};
pub use syscalls::{Console, ProgramResult, Syscall, Trap, UserContext};
