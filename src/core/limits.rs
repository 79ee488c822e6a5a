/*!
 * System Limits and Constants
 *
 * Centralized location for system-wide limits and magic numbers.
 * Grouped by domain. Runtime-tunable values only provide the defaults
 * used by `KernelConfig`.
 */

// =============================================================================
// MEMORY LAYOUT
// =============================================================================

/// Size of one virtual page / physical frame in bytes
pub const PAGE_SIZE: usize = 0x400;

/// Pages reserved for each process stack
pub const DEFAULT_STACK_PAGES: usize = 8;

/// Pages reserved after the stack for the argument vector
pub const ARG_PAGES: usize = 1;

/// Default size of the physical frame pool (1 MiB)
pub const DEFAULT_PHYS_PAGES: usize = 1024;

/// Width of a user pointer in bytes
pub const POINTER_SIZE: usize = 4;

// =============================================================================
// ARGUMENT / STRING LIMITS
// =============================================================================

/// Longest string read from user memory, excluding the terminator
pub const MAX_STRING_LENGTH: usize = 256;

/// Maximum number of arguments accepted by exec
/// Each argument costs at least a pointer plus a terminator in the arg page
pub const MAX_ARGC: usize = PAGE_SIZE / (POINTER_SIZE + 1);

// =============================================================================
// PROCESS LIMITS
// =============================================================================

/// Default cap on live process records (running or awaiting join)
pub const DEFAULT_MAX_PROCESSES: usize = 256;

/// Per-process file descriptor table size
pub const MAX_OPEN_FILES: usize = 16;

// =============================================================================
// EXECUTABLE FORMAT
// =============================================================================

/// Magic number stamped in every executable image header
pub const IMAGE_MAGIC: u16 = 0x0162;

/// Suffix every executable name must carry
pub const EXECUTABLE_SUFFIX: &str = ".coff";

/// Largest encoded image the loader will decode (16 MiB)
pub const MAX_IMAGE_BYTES: u64 = 16 * 1024 * 1024;
