/*!
 * Process Table
 *
 * Process-wide registry of process records keyed by PID.
 *
 * # Locking
 *
 * The map is a sharded `DashMap`, so unrelated records never share a lock.
 * Each record carries its own mutex and condition variable; every state
 * transition happens under that mutex, which serializes an exit against a
 * concurrent join of the same record. Shard locks are never held while
 * blocking on a record.
 *
 * PIDs come from a monotonically increasing counter and are never reused.
 * Live records are counted by a slot counter reserved before insertion, so
 * the record limit holds under concurrent registration.
 */

use super::types::{ExitStatus, ProcessError, ProcessInfo, ProcessResult, ProcessState};
use crate::core::types::Pid;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug)]
struct RecordState {
    state: ProcessState,
    exit_status: Option<ExitStatus>,
    /// `None` once the parent is gone; the record then reaps itself on exit
    parent: Option<Pid>,
}

#[derive(Debug)]
struct ProcessRecord {
    pid: Pid,
    name: String,
    slot: Mutex<RecordState>,
    exited: Condvar,
}

impl ProcessRecord {
    fn snapshot(&self) -> ProcessInfo {
        let slot = self.slot.lock();
        ProcessInfo {
            pid: self.pid,
            name: self.name.clone(),
            state: slot.state,
            parent: slot.parent,
            exit_status: slot.exit_status,
        }
    }
}

/// Counters kept by the table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounters {
    pub registered: u64,
    pub reclaimed: u64,
}

pub struct ProcessTable {
    records: DashMap<Pid, Arc<ProcessRecord>, RandomState>,
    next_pid: AtomicU32,
    live: AtomicUsize,
    max_records: usize,
    registered: AtomicU64,
    reclaimed: AtomicU64,
}

impl ProcessTable {
    /// PIDs handed out start here; lower values are reserved for the kernel
    pub const FIRST_PID: Pid = 1;

    /// Largest PID handed out; user code sees PIDs as non-negative `i32`
    pub const MAX_PID: Pid = i32::MAX as Pid;

    pub fn new(max_records: usize) -> Self {
        Self {
            // 64 shards: exec, exit and join all touch the map concurrently
            records: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                64,
            ),
            next_pid: AtomicU32::new(Self::FIRST_PID),
            live: AtomicUsize::new(0),
            max_records,
            registered: AtomicU64::new(0),
            reclaimed: AtomicU64::new(0),
        }
    }

    /// Allocate a fresh PID and insert a `Created` record for it
    pub fn register(&self, name: &str, parent: Option<Pid>) -> ProcessResult<Pid> {
        let limit = self.max_records;
        self.live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                live.checked_add(1).filter(|&next| next <= limit)
            })
            .map_err(|current| ProcessError::LimitReached { current, limit })?;

        // Allocate PID atomically; the counter stops one past MAX_PID
        let pid = match self
            .next_pid
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| {
                (next <= Self::MAX_PID).then(|| next + 1)
            }) {
            Ok(pid) => pid,
            Err(_) => {
                self.live.fetch_sub(1, Ordering::AcqRel);
                return Err(ProcessError::PidsExhausted);
            }
        };

        let record = Arc::new(ProcessRecord {
            pid,
            name: name.to_string(),
            slot: Mutex::new(RecordState {
                state: ProcessState::Created,
                exit_status: None,
                parent,
            }),
            exited: Condvar::new(),
        });
        self.records.insert(pid, record);
        self.registered.fetch_add(1, Ordering::Relaxed);

        trace!(pid, name, ?parent, "Registered process record");
        Ok(pid)
    }

    /// Created → Running, once the process thread exists
    pub fn mark_running(&self, pid: Pid) -> ProcessResult<()> {
        let record = self.record(pid)?;
        let mut slot = record.slot.lock();
        if slot.state != ProcessState::Created {
            return Err(ProcessError::InvalidStateTransition {
                pid,
                from: slot.state,
                to: ProcessState::Running,
            });
        }
        slot.state = ProcessState::Running;
        Ok(())
    }

    /// Remove a record whose thread never started
    ///
    /// Only valid before any exit was recorded; the caller guarantees no
    /// thread is running the process.
    pub fn discard(&self, pid: Pid) -> ProcessResult<()> {
        let record = self.record(pid)?;
        {
            let mut slot = record.slot.lock();
            if !matches!(slot.state, ProcessState::Created | ProcessState::Running) {
                return Err(ProcessError::InvalidStateTransition {
                    pid,
                    from: slot.state,
                    to: ProcessState::Reclaimed,
                });
            }
            slot.state = ProcessState::Reclaimed;
            record.exited.notify_all();
        }
        self.remove_record(pid);
        Ok(())
    }

    /// Drop the parent link of `pid`; it is reclaimed on exit instead of joined
    pub fn detach(&self, pid: Pid) -> ProcessResult<()> {
        let record = self.record(pid)?;
        record.slot.lock().parent = None;
        Ok(())
    }

    /// Whether `pid` is registered and has not exited yet
    pub fn is_live(&self, pid: Pid) -> bool {
        self.record(pid).is_ok_and(|r| {
            matches!(
                r.slot.lock().state,
                ProcessState::Created | ProcessState::Running
            )
        })
    }

    /// Running → Exited, exactly once
    ///
    /// A second call, or a call on a record that is not running, is rejected
    /// and leaves the record untouched. Orphans are reclaimed immediately.
    pub fn mark_exited(&self, pid: Pid, status: ExitStatus) -> ProcessResult<()> {
        let record = self.record(pid)?;
        let orphan = {
            let mut slot = record.slot.lock();
            if slot.state != ProcessState::Running {
                return Err(ProcessError::InvalidStateTransition {
                    pid,
                    from: slot.state,
                    to: ProcessState::Exited,
                });
            }
            slot.exit_status = Some(status);
            if slot.parent.is_none() {
                slot.state = ProcessState::Reclaimed;
                true
            } else {
                slot.state = ProcessState::Exited;
                record.exited.notify_all();
                false
            }
        };

        if orphan {
            self.remove_reclaimed(pid);
            debug!(pid, code = status.code, "Orphan exited and was reclaimed");
        }
        Ok(())
    }

    /// Remove and return the status of an exited child without blocking
    pub fn take(&self, pid: Pid, caller: Pid) -> ProcessResult<ExitStatus> {
        let record = self.record(pid)?;
        let status = {
            let mut slot = record.slot.lock();
            Self::check_parent(&slot, pid, caller)?;
            match slot.state {
                ProcessState::Exited => Self::reclaim(&mut slot, pid)?,
                ProcessState::Reclaimed => return Err(ProcessError::NotFound(pid)),
                ProcessState::Created | ProcessState::Running => {
                    return Err(ProcessError::NotYetExited(pid))
                }
            }
        };
        self.remove_reclaimed(pid);
        Ok(status)
    }

    /// Block until the child exits, then remove and return its status
    ///
    /// Of several concurrent callers for the same child exactly one gets the
    /// status; the rest see `NotFound`.
    pub fn wait_and_take(&self, pid: Pid, caller: Pid) -> ProcessResult<ExitStatus> {
        let record = self.record(pid)?;
        let status = {
            let mut slot = record.slot.lock();
            Self::check_parent(&slot, pid, caller)?;
            while matches!(slot.state, ProcessState::Created | ProcessState::Running) {
                trace!(pid, caller, "Waiting for child to exit");
                record.exited.wait(&mut slot);
            }
            if slot.state == ProcessState::Reclaimed {
                return Err(ProcessError::NotFound(pid));
            }
            Self::reclaim(&mut slot, pid)?
        };
        self.remove_reclaimed(pid);
        Ok(status)
    }

    /// Detach the children of an exiting parent
    ///
    /// Exited children nobody can join any more are reclaimed; running ones
    /// become orphans. Returns the number of records reclaimed.
    pub fn orphan_children(&self, parent: Pid) -> usize {
        // Collect first: no shard lock may be held while removing
        let children: Vec<Arc<ProcessRecord>> = self
            .records
            .iter()
            .filter(|r| r.value().slot.lock().parent == Some(parent))
            .map(|r| Arc::clone(r.value()))
            .collect();

        let mut reclaimed = 0;
        for child in children {
            let remove = {
                let mut slot = child.slot.lock();
                if slot.parent != Some(parent) {
                    continue;
                }
                slot.parent = None;
                if slot.state == ProcessState::Exited {
                    slot.state = ProcessState::Reclaimed;
                    true
                } else {
                    false
                }
            };
            if remove {
                self.remove_reclaimed(child.pid);
                reclaimed += 1;
            }
        }

        if reclaimed > 0 {
            debug!(parent, reclaimed, "Reclaimed unjoined children");
        }
        reclaimed
    }

    pub fn get(&self, pid: Pid) -> Option<ProcessInfo> {
        self.records.get(&pid).map(|r| r.value().snapshot())
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.records.contains_key(&pid)
    }

    pub fn list(&self) -> Vec<ProcessInfo> {
        let records: Vec<Arc<ProcessRecord>> =
            self.records.iter().map(|r| Arc::clone(r.value())).collect();
        let mut infos: Vec<ProcessInfo> = records.iter().map(|r| r.snapshot()).collect();
        infos.sort_by_key(|p| p.pid);
        infos
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn counters(&self) -> TableCounters {
        TableCounters {
            registered: self.registered.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
        }
    }

    fn record(&self, pid: Pid) -> ProcessResult<Arc<ProcessRecord>> {
        self.records
            .get(&pid)
            .map(|r| Arc::clone(r.value()))
            .ok_or(ProcessError::NotFound(pid))
    }

    fn check_parent(slot: &RecordState, pid: Pid, caller: Pid) -> ProcessResult<()> {
        if slot.parent == Some(caller) {
            Ok(())
        } else if slot.state == ProcessState::Reclaimed {
            Err(ProcessError::NotFound(pid))
        } else {
            Err(ProcessError::NotChild { pid, caller })
        }
    }

    /// Exited → Reclaimed under the record lock
    fn reclaim(slot: &mut RecordState, pid: Pid) -> ProcessResult<ExitStatus> {
        let status = slot
            .exit_status
            .ok_or(ProcessError::InvalidStateTransition {
                pid,
                from: slot.state,
                to: ProcessState::Reclaimed,
            })?;
        slot.state = ProcessState::Reclaimed;
        Ok(status)
    }

    fn remove_reclaimed(&self, pid: Pid) {
        if self.remove_record(pid) {
            self.reclaimed.fetch_add(1, Ordering::Relaxed);
            trace!(pid, "Removed process record");
        }
    }

    /// Remove `pid` from the map and release its slot
    fn remove_record(&self, pid: Pid) -> bool {
        let removed = self.records.remove(&pid).is_some();
        if removed {
            self.live.fetch_sub(1, Ordering::AcqRel);
        }
        removed
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new(crate::core::limits::DEFAULT_MAX_PROCESSES)
    }
}
