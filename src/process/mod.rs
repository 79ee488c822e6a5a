/*!
 * Process Module
 * Process table, argument marshalling, and the exec/join service
 */

mod executor;
pub mod manager;
pub mod manager_builder;
pub mod marshal;
pub mod table;
pub mod types;

// Re-export for convenience
pub use manager::{KernelStats, ProcessManager, Shutdown};
pub use manager_builder::ProcessManagerBuilder;
pub use marshal::{marshal, unmarshal, ArgLayout, ArgumentVector};
pub use table::{ProcessTable, TableCounters};
pub use types::{
    ExecError, ExecResult, ExitKind, ExitStatus, JoinError, JoinResult, MarshalError,
    MarshalResult, ProcessError, ProcessInfo, ProcessResult, ProcessState,
};
