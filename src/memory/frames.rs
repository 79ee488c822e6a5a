/*!
 * Physical Frame Pool
 *
 * Global budget of page frames shared by every address space.
 * Frames are handed out as RAII reservations: dropping the reservation
 * (normally when the owning address space is dropped at process exit)
 * returns the frames to the pool.
 */

use super::types::{FrameStats, MemoryError, MemoryResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug)]
struct PoolInner {
    total: usize,
    used: AtomicUsize,
}

/// Shared pool of physical frames
#[derive(Debug, Clone)]
pub struct FramePool {
    inner: Arc<PoolInner>,
}

impl FramePool {
    pub fn new(total_frames: usize) -> Self {
        debug!(total_frames, "Frame pool initialized");
        Self {
            inner: Arc::new(PoolInner {
                total: total_frames,
                used: AtomicUsize::new(0),
            }),
        }
    }

    /// Reserve `pages` frames, failing without side effects if the pool is short
    pub fn reserve(&self, pages: usize) -> MemoryResult<FrameReservation> {
        let total = self.inner.total;
        self.inner
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(pages).filter(|&next| next <= total)
            })
            .map_err(|used| MemoryError::OutOfFrames {
                requested: pages,
                available: total - used,
                total,
            })?;

        trace!(pages, "Reserved frames");
        Ok(FrameReservation {
            pool: Arc::clone(&self.inner),
            pages,
        })
    }

    pub fn stats(&self) -> FrameStats {
        let used = self.inner.used.load(Ordering::Acquire);
        FrameStats {
            total_frames: self.inner.total,
            used_frames: used,
            free_frames: self.inner.total - used,
        }
    }
}

/// Frames held by one address space
#[derive(Debug)]
pub struct FrameReservation {
    pool: Arc<PoolInner>,
    pages: usize,
}

impl FrameReservation {
    #[inline]
    pub fn pages(&self) -> usize {
        self.pages
    }
}

impl Drop for FrameReservation {
    fn drop(&mut self) {
        self.pool.used.fetch_sub(self.pages, Ordering::AcqRel);
        trace!(pages = self.pages, "Released frames");
    }
}
