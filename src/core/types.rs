/*!
 * Core Types
 * Common types used across the kernel
 */

/// Process ID type
pub type Pid = u32;

/// Virtual address inside a user address space
pub type VAddr = u32;

/// Virtual page number
pub type Vpn = u32;

/// File descriptor type
pub type Fd = i32;

/// PID reserved for the kernel itself; parent of the root process
pub const KERNEL_PID: Pid = 0;

/// Value returned to user programs for every failed syscall
pub const SYSCALL_FAILURE: i32 = -1;

/// Common result type for kernel operations
pub type KernelResult<T> = Result<T, super::errors::KernelError>;
