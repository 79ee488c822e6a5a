/*!
 * Memory Module
 * Physical frame accounting and per-process address spaces
 */

pub mod address_space;
pub mod frames;
pub mod types;

pub use address_space::AddressSpace;
pub use frames::{FramePool, FrameReservation};
pub use types::{FrameStats, MemoryError, MemoryResult};
