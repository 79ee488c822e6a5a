/*!
 * Console Device
 *
 * Shared byte-stream console behind file descriptors 0 and 1. Output is
 * always captured; with echo enabled it is mirrored to the host stdout.
 */

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Default)]
struct ConsoleInner {
    output: Mutex<Vec<u8>>,
    input: Mutex<VecDeque<u8>>,
    echo: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

impl Console {
    /// Capture-only console
    pub fn new() -> Self {
        Self::default()
    }

    /// Console that also mirrors output to the host stdout
    pub fn with_echo() -> Self {
        Self {
            inner: Arc::new(ConsoleInner {
                echo: true,
                ..Default::default()
            }),
        }
    }

    /// Whether output is mirrored to the host stdout
    pub fn echoes(&self) -> bool {
        self.inner.echo
    }

    pub fn write(&self, bytes: &[u8]) -> usize {
        // Hold the capture lock across the echo so lines from different
        // processes are not interleaved mid-write
        let mut output = self.inner.output.lock();
        output.extend_from_slice(bytes);
        if self.inner.echo {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout.write_all(bytes).and_then(|_| stdout.flush()) {
                warn!(error = %e, "Console echo failed");
            }
        }
        bytes.len()
    }

    /// Non-blocking read of whatever input is buffered
    pub fn read(&self, buf: &mut [u8]) -> usize {
        let mut input = self.inner.input.lock();
        let n = buf.len().min(input.len());
        for (dst, src) in buf.iter_mut().zip(input.drain(..n)) {
            *dst = src;
        }
        n
    }

    pub fn feed_input(&self, bytes: &[u8]) {
        self.inner.input.lock().extend(bytes.iter().copied());
    }

    /// Everything written so far
    pub fn output(&self) -> Vec<u8> {
        self.inner.output.lock().clone()
    }

    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.inner.output.lock()).into_owned()
    }

    /// Drain captured output
    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut *self.inner.output.lock())
    }
}
