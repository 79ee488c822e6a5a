/*!
 * Process Types
 * Common types for process management
 */

use crate::core::types::Pid;
use crate::loader::LoadError;
use crate::memory::MemoryError;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Process table operation result
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Process table errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ProcessError {
    #[error("Process not found: {0}")]
    #[diagnostic(
        code(process::not_found),
        help("The process never existed or was already joined.")
    )]
    NotFound(Pid),

    #[error("Process {pid} is not a child of {caller}")]
    #[diagnostic(code(process::not_child))]
    NotChild { pid: Pid, caller: Pid },

    #[error("Process {0} has not exited yet")]
    #[diagnostic(code(process::not_yet_exited))]
    NotYetExited(Pid),

    #[error("Process limit reached: {current}/{limit} live processes")]
    #[diagnostic(
        code(process::limit_reached),
        help("Join finished children to release their records.")
    )]
    LimitReached { current: usize, limit: usize },

    #[error("Process identifiers exhausted")]
    #[diagnostic(
        code(process::pids_exhausted),
        help("PIDs are never reused; restart the kernel.")
    )]
    PidsExhausted,

    #[error("Invalid state transition for process {pid}: {from:?} -> {to:?}")]
    #[diagnostic(
        code(process::invalid_transition),
        help("This is a kernel bug: a record changed state twice.")
    )]
    InvalidStateTransition {
        pid: Pid,
        from: ProcessState,
        to: ProcessState,
    },
}

/// Lifecycle of a process record
///
/// `Created → Running → Exited → Reclaimed`; no state is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Registered, thread not yet launched
    Created,
    Running,
    /// Terminated; status waiting for a join
    Exited,
    /// Status collected, record removed from the table
    Reclaimed,
}

/// How a process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitKind {
    /// Returned from main or called exit
    Normal,
    /// Killed by a trap or a panic
    Abnormal,
}

/// Exit status collected by join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    pub code: i32,
    pub kind: ExitKind,
}

impl ExitStatus {
    /// Status code recorded for abnormally terminated processes
    pub const FAILURE_CODE: i32 = -1;

    #[inline]
    pub const fn normal(code: i32) -> Self {
        Self {
            code,
            kind: ExitKind::Normal,
        }
    }

    #[inline]
    pub const fn abnormal() -> Self {
        Self {
            code: Self::FAILURE_CODE,
            kind: ExitKind::Abnormal,
        }
    }

    #[inline]
    pub const fn is_normal(&self) -> bool {
        matches!(self.kind, ExitKind::Normal)
    }
}

/// Point-in-time copy of a process record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessInfo {
    pub pid: Pid,
    pub name: String,
    pub state: ProcessState,
    pub parent: Option<Pid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<ExitStatus>,
}

pub type MarshalResult<T> = Result<T, MarshalError>;

/// Argument marshalling errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum MarshalError {
    #[error("Too many arguments: {count} (max {max})")]
    #[diagnostic(code(marshal::too_many_args))]
    TooManyArgs { count: usize, max: usize },

    #[error("Argument {index} too long: {len} bytes (max {max})")]
    #[diagnostic(code(marshal::arg_too_long))]
    ArgTooLong { index: usize, len: usize, max: usize },

    #[error("Arguments need {needed} bytes, argument page holds {capacity}")]
    #[diagnostic(code(marshal::args_too_large))]
    ArgsTooLarge { needed: usize, capacity: usize },

    #[error("Argument {index} contains a NUL byte")]
    #[diagnostic(
        code(marshal::embedded_nul),
        help("Arguments are passed as C strings and cannot contain NUL.")
    )]
    EmbeddedNul { index: usize },

    #[error("Argument page write failed: {0}")]
    #[diagnostic(code(marshal::memory))]
    Memory(#[from] MemoryError),
}

pub type ExecResult<T> = Result<T, ExecError>;

/// Every way exec can fail; all collapse to -1 at the syscall boundary
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ExecError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Marshal(#[from] MarshalError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Process(#[from] ProcessError),

    #[error("Failed to launch process thread: {0}")]
    #[diagnostic(code(exec::spawn_failed))]
    SpawnFailed(String),

    #[error("Machine is halted")]
    #[diagnostic(code(exec::halted))]
    Halted,
}

impl ExecError {
    /// Whether the name failed to resolve, so a retry with another name may succeed
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExecError::Load(LoadError::NotFound(_)))
    }
}

pub type JoinResult<T> = Result<T, JoinError>;

/// Join failures; never produced after blocking on a valid child
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum JoinError {
    #[error("No such process: {0}")]
    #[diagnostic(code(join::no_such_process))]
    NoSuchProcess(Pid),

    #[error("Process {pid} is not a child of {caller}")]
    #[diagnostic(
        code(join::not_child),
        help("Only the parent that exec'd a process may join it.")
    )]
    NotChild { pid: Pid, caller: Pid },
}
