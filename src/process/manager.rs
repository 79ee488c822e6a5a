/*!
 * Process Management
 *
 * The exec/join service. `exec` loads an image, marshals its arguments,
 * registers a record and launches the process; `join` blocks until a child
 * exits and reclaims its record; `terminate` is how a process thread
 * reports its own end.
 */

use super::executor::{Launch, ProcessExecutor};
use super::manager_builder::ProcessManagerBuilder;
use super::marshal::{marshal, ArgumentVector};
use super::table::ProcessTable;
use super::types::{
    ExecError, ExecResult, ExitStatus, JoinError, JoinResult, ProcessError, ProcessInfo,
};
use crate::core::config::KernelConfig;
use crate::core::types::{Pid, KERNEL_PID};
use crate::loader::Loader;
use crate::memory::{FrameStats, FramePool};
use crate::syscalls::Console;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub(super) struct ManagerInner {
    pub(super) config: KernelConfig,
    pub(super) loader: Loader,
    pub(super) frames: FramePool,
    pub(super) table: ProcessTable,
    pub(super) console: Console,
    /// Process threads currently alive
    pub(super) alive: Mutex<usize>,
    pub(super) idle: Condvar,
    pub(super) halted: AtomicBool,
    /// PID of the current root process, `KERNEL_PID` when none
    pub(super) root: AtomicU32,
}

/// How a `run` ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Shutdown {
    pub root: Pid,
    /// Root exit status; `None` only if it could not be collected
    pub status: Option<ExitStatus>,
    pub halted: bool,
}

/// Snapshot of kernel-wide counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct KernelStats {
    pub live_records: usize,
    pub running: usize,
    pub registered: u64,
    pub reclaimed: u64,
    pub frames: FrameStats,
    pub halted: bool,
}

#[derive(Clone)]
pub struct ProcessManager {
    inner: Arc<ManagerInner>,
}

impl ProcessManager {
    pub(super) fn from_inner(inner: ManagerInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Create a builder for constructing a ProcessManager
    pub fn builder() -> ProcessManagerBuilder {
        ProcessManagerBuilder::new()
    }

    /// Load `name`, copy `args` into it and start it as a child of `parent`
    ///
    /// Nothing is registered unless loading and marshalling both succeed.
    /// `parent` must be `KERNEL_PID` or a process that has not exited.
    #[instrument(skip(self, args), fields(argc = args.len()))]
    pub fn exec(&self, parent: Pid, name: &str, args: &ArgumentVector) -> ExecResult<Pid> {
        if self.is_halted() {
            return Err(ExecError::Halted);
        }
        if parent != KERNEL_PID && !self.inner.table.is_live(parent) {
            return Err(ProcessError::NotFound(parent).into());
        }

        let image = self.inner.loader.load(name)?;
        args.validate()?;
        let mut space = image.instantiate(&self.inner.frames, self.inner.config.stack_pages)?;
        let layout = marshal(&mut space, args)?;

        let pid = self.inner.table.register(name, Some(parent))?;
        // A parent that exited after the check above has already orphaned
        // its children and will never see this one
        if parent != KERNEL_PID && !self.inner.table.is_live(parent) {
            if let Err(e) = self.inner.table.detach(pid) {
                warn!(pid, error = %e, "Failed to detach child of exited parent");
            }
        }
        if parent == KERNEL_PID {
            // Published before the thread starts so the root can halt at once
            let _ = self.inner.root.compare_exchange(
                KERNEL_PID,
                pid,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }

        // Count the thread before it exists so `wait_idle` cannot miss it
        *self.inner.alive.lock() += 1;

        let launch = Launch {
            pid,
            name: name.to_string(),
            program: image.program,
            space,
            args: layout,
        };

        let launched = self
            .inner
            .table
            .mark_running(pid)
            .map_err(ExecError::from)
            .and_then(|()| {
                ProcessExecutor::spawn(self.clone(), launch)
                    .map_err(|e| ExecError::SpawnFailed(e.to_string()))
            });
        if let Err(e) = launched {
            error!(pid, error = %e, "Failed to launch process");
            if let Err(err) = self.inner.table.discard(pid) {
                warn!(pid, error = %err, "Failed to discard unlaunched process");
            }
            let _ = self.inner.root.compare_exchange(
                pid,
                KERNEL_PID,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            self.release_alive();
            return Err(e);
        }

        info!(pid, parent, name, "Created process");
        Ok(pid)
    }

    /// Block until `pid` exits, then reclaim it and return its status
    ///
    /// Fails immediately if `pid` is not a live or unjoined child of `caller`.
    #[instrument(skip(self))]
    pub fn join(&self, caller: Pid, pid: Pid) -> JoinResult<ExitStatus> {
        let status = self
            .inner
            .table
            .wait_and_take(pid, caller)
            .map_err(|e| Self::join_error(e, pid))?;
        debug!(caller, pid, code = status.code, "Joined child");
        Ok(status)
    }

    /// Non-blocking join: `Ok(None)` while the child is still running
    pub fn try_join(&self, caller: Pid, pid: Pid) -> JoinResult<Option<ExitStatus>> {
        match self.inner.table.take(pid, caller) {
            Ok(status) => Ok(Some(status)),
            Err(ProcessError::NotYetExited(_)) => Ok(None),
            Err(e) => Err(Self::join_error(e, pid)),
        }
    }

    fn join_error(err: ProcessError, pid: Pid) -> JoinError {
        match err {
            ProcessError::NotChild { pid, caller } => JoinError::NotChild { pid, caller },
            _ => JoinError::NoSuchProcess(pid),
        }
    }

    /// Record the end of process `pid`; called from its own thread
    pub(crate) fn terminate(&self, pid: Pid, status: ExitStatus) {
        if let Err(e) = self.inner.table.mark_exited(pid, status) {
            error!(pid, error = %e, "Exit status recorded twice");
        }
        self.inner.table.orphan_children(pid);
        let _ = self.inner.root.compare_exchange(
            pid,
            KERNEL_PID,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self.release_alive();
    }

    fn release_alive(&self) {
        let mut alive = self.inner.alive.lock();
        *alive = alive.saturating_sub(1);
        if *alive == 0 {
            debug!("Last process exited");
            self.inner.idle.notify_all();
        }
    }

    /// Stop the machine; only the root process may do this
    pub fn halt(&self, caller: Pid) -> bool {
        let root = self.inner.root.load(Ordering::Acquire);
        if root == KERNEL_PID || caller != root {
            debug!(caller, root, "Halt refused");
            return false;
        }

        info!(caller, "Machine halted");
        self.inner.halted.store(true, Ordering::Release);
        let _alive = self.inner.alive.lock();
        self.inner.idle.notify_all();
        true
    }

    pub fn is_halted(&self) -> bool {
        self.inner.halted.load(Ordering::Acquire)
    }

    /// Block until every process has exited or the machine halts
    pub fn wait_idle(&self) {
        let mut alive = self.inner.alive.lock();
        while *alive > 0 && !self.is_halted() {
            self.inner.idle.wait(&mut alive);
        }
    }

    /// Boot `name` as the root process and run until the machine stops
    #[instrument(skip(self, args))]
    pub fn run(&self, name: &str, args: &ArgumentVector) -> ExecResult<Shutdown> {
        let root = self.exec(KERNEL_PID, name, args)?;
        info!(root, name, "Root process started");

        self.wait_idle();

        // Either everything has exited or root itself is halting, so this is brief
        let halted = self.is_halted();
        let status = match self.join(KERNEL_PID, root) {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(root, error = %e, "Root status unavailable");
                None
            }
        };

        info!(root, ?status, halted, "Machine stopped");
        Ok(Shutdown {
            root,
            status,
            halted,
        })
    }

    pub fn get_process(&self, pid: Pid) -> Option<ProcessInfo> {
        self.inner.table.get(pid)
    }

    pub fn list_processes(&self) -> Vec<ProcessInfo> {
        self.inner.table.list()
    }

    /// Processes whose threads have not finished yet
    pub fn running_count(&self) -> usize {
        *self.inner.alive.lock()
    }

    pub fn console(&self) -> &Console {
        &self.inner.console
    }

    pub fn config(&self) -> &KernelConfig {
        &self.inner.config
    }

    pub fn loader(&self) -> &Loader {
        &self.inner.loader
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.inner.frames.stats()
    }

    pub fn stats(&self) -> KernelStats {
        let counters = self.inner.table.counters();
        KernelStats {
            live_records: self.inner.table.len(),
            running: self.running_count(),
            registered: counters.registered,
            reclaimed: counters.reclaimed,
            frames: self.frame_stats(),
            halted: self.is_halted(),
        }
    }
}

impl std::fmt::Debug for ProcessManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessManager")
            .field("config", &self.inner.config)
            .field("live_records", &self.inner.table.len())
            .field("halted", &self.is_halted())
            .finish()
    }
}
