/*!
 * Tracing
 * Subscriber setup and per-syscall spans using the tracing crate
 */

use crate::core::types::Pid;
use crate::syscalls::Syscall;
use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Non-blocking syscalls slower than this are reported
const SLOW_SYSCALL: Duration = Duration::from_millis(10);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - KERNEL_TRACE_JSON: Enable JSON output (default: false)
///
/// A second call is a no-op.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("KERNEL_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Span covering one syscall from dispatch to return
pub struct SyscallSpan {
    span: Span,
    start: Instant,
    call: Syscall,
    pid: Pid,
}

impl SyscallSpan {
    pub fn new(call: Syscall, pid: Pid) -> Self {
        let span = span!(
            Level::TRACE,
            "syscall",
            syscall = call.name(),
            pid,
            result = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            call,
            pid,
        }
    }

    pub fn record_result(&self, value: i32) {
        self.span.record("result", value);
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for SyscallSpan {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let _entered = self.span.enter();

        // join waits on a child by design
        if elapsed > SLOW_SYSCALL && self.call != Syscall::Join {
            warn!(
                syscall = self.call.name(),
                pid = self.pid,
                duration_ms = elapsed.as_millis() as u64,
                "slow syscall detected"
            );
        } else {
            debug!(
                syscall = self.call.name(),
                pid = self.pid,
                duration_us = elapsed.as_micros() as u64,
                "syscall completed"
            );
        }
    }
}

/// Open a span for `call` made by `pid`
#[inline]
pub fn span_syscall(call: Syscall, pid: Pid) -> SyscallSpan {
    SyscallSpan::new(call, pid)
}
