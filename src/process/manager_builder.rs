/*!
 * Process Manager Builder
 * Builder pattern for ProcessManager construction
 */

use super::manager::{ManagerInner, ProcessManager};
use super::table::ProcessTable;
use crate::core::config::KernelConfig;
use crate::core::types::KERNEL_PID;
use crate::loader::{EntryTable, ImageStore, Loader, MemImageStore, UserProgram};
use crate::memory::FramePool;
use crate::syscalls::Console;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU32};
use std::sync::Arc;
use tracing::info;

/// Builder for ProcessManager
pub struct ProcessManagerBuilder {
    config: KernelConfig,
    store: Option<Arc<dyn ImageStore>>,
    entries: EntryTable,
    console: Option<Console>,
}

impl ProcessManagerBuilder {
    /// Create a new ProcessManager builder
    pub fn new() -> Self {
        Self {
            config: KernelConfig::default(),
            store: None,
            entries: EntryTable::new(),
            console: None,
        }
    }

    pub fn with_config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    /// Where exec looks up executable images
    pub fn with_image_store(mut self, store: Arc<dyn ImageStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the entry table wholesale
    pub fn with_entries(mut self, entries: EntryTable) -> Self {
        self.entries = entries;
        self
    }

    /// Bind a single entry symbol
    pub fn with_entry<P>(self, symbol: impl Into<String>, program: P) -> Self
    where
        P: UserProgram + 'static,
    {
        self.entries.register(symbol, Arc::new(program));
        self
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = Some(console);
        self
    }

    /// Build the ProcessManager
    pub fn build(self) -> ProcessManager {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemImageStore::new()) as Arc<dyn ImageStore>);
        let console = self.console.unwrap_or_else(|| {
            if self.config.console_echo {
                Console::with_echo()
            } else {
                Console::new()
            }
        });

        info!(
            phys_pages = self.config.phys_pages,
            stack_pages = self.config.stack_pages,
            max_processes = self.config.max_processes,
            entries = self.entries.len(),
            "Process manager initialized"
        );

        ProcessManager::from_inner(ManagerInner {
            loader: Loader::new(store, self.entries),
            frames: FramePool::new(self.config.phys_pages),
            table: ProcessTable::new(self.config.max_processes),
            console,
            alive: Mutex::new(0),
            idle: Condvar::new(),
            halted: AtomicBool::new(false),
            root: AtomicU32::new(KERNEL_PID),
            config: self.config,
        })
    }
}

impl Default for ProcessManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
