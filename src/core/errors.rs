/*!
 * Error Types
 * Top-level error for kernel setup and the root process
 */

use miette::Diagnostic;
use thiserror::Error;

pub use super::config::ConfigError;
pub use crate::loader::LoadError;
pub use crate::memory::MemoryError;
pub use crate::process::{ExecError, JoinError, MarshalError, ProcessError};

#[derive(Error, Debug, Diagnostic)]
pub enum KernelError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Join(#[from] JoinError),

    #[error("Failed to encode image {name}: {source}")]
    #[diagnostic(code(kernel::image_encoding))]
    ImageEncoding {
        name: String,
        #[source]
        source: bincode::Error,
    },
}
