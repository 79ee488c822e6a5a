/*!
 * Traps
 * Ways a user program leaves `main` other than returning
 */

use crate::core::types::VAddr;
use crate::memory::MemoryError;
use crate::process::ExitStatus;
use thiserror::Error;

/// Result of anything a user program does that can end the process
pub type ProgramResult<T> = Result<T, Trap>;

/// Events that unwind a user program out of `main`
///
/// `Exit` and `Halt` are requested by the program itself; the rest are
/// faults that kill the process with status -1.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Trap {
    #[error("exit({0})")]
    Exit(i32),

    #[error("halt")]
    Halt,

    #[error("Address error at 0x{vaddr:x} (+{len} bytes)")]
    AddressError { vaddr: VAddr, len: usize },

    #[error("Stack overflow: {requested} bytes requested")]
    StackOverflow { requested: usize },

    #[error("Illegal syscall {0}")]
    IllegalSyscall(u32),
}

impl Trap {
    /// Exit status recorded for a process that unwound with this trap
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Trap::Exit(code) => ExitStatus::normal(*code),
            Trap::Halt => ExitStatus::normal(0),
            Trap::AddressError { .. } | Trap::StackOverflow { .. } | Trap::IllegalSyscall(_) => {
                ExitStatus::abnormal()
            }
        }
    }
}

impl From<MemoryError> for Trap {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::InvalidAddress { vaddr, len } => Trap::AddressError { vaddr, len },
            // Only address checks fail once a process is running
            MemoryError::OutOfFrames { .. } | MemoryError::AddressSpaceTooLarge { .. } => {
                Trap::AddressError { vaddr: 0, len: 0 }
            }
        }
    }
}
