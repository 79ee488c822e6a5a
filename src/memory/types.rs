/*!
 * Memory Types
 * Common types for memory management
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum MemoryError {
    #[error("Out of physical memory: requested {requested} pages, {available} free of {total}")]
    #[diagnostic(
        code(memory::out_of_frames),
        help("Join finished processes or raise KERNEL_PHYS_PAGES.")
    )]
    OutOfFrames {
        requested: usize,
        available: usize,
        total: usize,
    },

    #[error("Invalid virtual address: 0x{vaddr:x} (+{len} bytes)")]
    #[diagnostic(code(memory::invalid_address))]
    InvalidAddress { vaddr: u32, len: usize },

    #[error("Address space too large: {pages} pages")]
    #[diagnostic(code(memory::too_large))]
    AddressSpaceTooLarge { pages: usize },
}

/// Physical frame pool statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FrameStats {
    pub total_frames: usize,
    pub used_frames: usize,
    pub free_frames: usize,
}
