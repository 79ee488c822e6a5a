/*!
 * Entry Table
 *
 * Binds the entry symbols named in executable images to the native
 * routines that run as the process body.
 */

use crate::syscalls::{ProgramResult, UserContext};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// Body of a user program
///
/// `main` receives the process's context; its return value is the exit
/// status. A `Trap` returned through `?` ends the process the same way a
/// hardware exception would.
pub trait UserProgram: Send + Sync {
    fn main(&self, ctx: &mut UserContext) -> ProgramResult<i32>;
}

impl<F> UserProgram for F
where
    F: Fn(&mut UserContext) -> ProgramResult<i32> + Send + Sync,
{
    fn main(&self, ctx: &mut UserContext) -> ProgramResult<i32> {
        self(ctx)
    }
}

/// Registry of entry symbols
#[derive(Clone, Default)]
pub struct EntryTable {
    entries: Arc<DashMap<String, Arc<dyn UserProgram>>>,
}

impl EntryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `symbol`, replacing any previous binding
    pub fn register(&self, symbol: impl Into<String>, program: Arc<dyn UserProgram>) {
        self.entries.insert(symbol.into(), program);
    }

    pub fn resolve(&self, symbol: &str) -> Option<Arc<dyn UserProgram>> {
        self.entries.get(symbol).map(|r| Arc::clone(r.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for EntryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut symbols: Vec<String> = self.entries.iter().map(|r| r.key().clone()).collect();
        symbols.sort();
        f.debug_struct("EntryTable").field("symbols", &symbols).finish()
    }
}
