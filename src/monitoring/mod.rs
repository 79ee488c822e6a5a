/*!
 * Monitoring
 * Structured logging setup and syscall tracing
 */

mod tracer;

pub use tracer::{init_tracing, span_syscall, SyscallSpan};
