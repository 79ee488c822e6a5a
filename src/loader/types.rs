/*!
 * Loader Types
 */

use crate::memory::MemoryError;
use miette::Diagnostic;
use thiserror::Error;

pub type LoadResult<T> = Result<T, LoadError>;

/// Executable loading errors
///
/// `NotFound` is kept distinct so callers can retry with another name.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum LoadError {
    #[error("Invalid executable name: {0:?}")]
    #[diagnostic(
        code(loader::invalid_name),
        help("Executable names are non-empty, at most 256 bytes and end in `.coff`.")
    )]
    InvalidName(String),

    #[error("Executable not found: {0}")]
    #[diagnostic(code(loader::not_found))]
    NotFound(String),

    #[error("Malformed executable {name}: {reason}")]
    #[diagnostic(code(loader::malformed))]
    Malformed { name: String, reason: String },

    #[error("Bad magic in {name}: 0x{found:04x}")]
    #[diagnostic(code(loader::bad_magic))]
    BadMagic { name: String, found: u16 },

    #[error("Fragmented executable {name}: section {section} starts at page {first_vpn}, expected {expected}")]
    #[diagnostic(
        code(loader::fragmented),
        help("Sections must be contiguous and start at page 0.")
    )]
    Fragmented {
        name: String,
        section: String,
        first_vpn: u32,
        expected: u32,
    },

    #[error("Unknown entry point {entry} in {name}")]
    #[diagnostic(code(loader::unknown_entry))]
    UnknownEntry { name: String, entry: String },

    #[error("Insufficient memory for {name}: {source}")]
    #[diagnostic(code(loader::insufficient_memory))]
    Memory {
        name: String,
        #[source]
        source: MemoryError,
    },
}
