use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A detached process the shell is tracking.
#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    pub started: Instant,
    registration: u64,
}

/// One row of a [`ProcessRegistry::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub elapsed: Duration,
}

/// Names one call to [`ProcessRegistry::register`].
///
/// A pid can be reused once its process has been reaped; the ticket tells a
/// later registration of the same pid apart from this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub pid: u32,
    id: u64,
}

#[derive(Debug, Default)]
struct Table {
    processes: BTreeMap<u32, ProcessRecord>,
    registrations: u64,
}

/// Table of background processes that have been started and whose exit has
/// not been observed yet.
///
/// Cloning the registry yields another handle to the same table. Every
/// operation takes the same lock, so a snapshot never observes a half-applied
/// registration or removal.
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    table: Arc<Mutex<Table>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `pid`, stamping it with the current time.
    pub fn register(&self, pid: u32, name: impl Into<String>) -> Registration {
        let mut table = self.lock();
        table.registrations += 1;
        let id = table.registrations;
        let record = ProcessRecord {
            pid,
            name: name.into(),
            started: Instant::now(),
            registration: id,
        };
        table.processes.insert(pid, record);
        Registration { pid, id }
    }

    /// Stops tracking `pid`. Unknown pids are ignored.
    pub fn unregister(&self, pid: u32) -> Option<ProcessRecord> {
        self.lock().processes.remove(&pid)
    }

    /// Removes the record created by `registration`, leaving alone a newer
    /// record that reused the same pid.
    pub fn release(&self, registration: Registration) -> Option<ProcessRecord> {
        match self.lock().processes.entry(registration.pid) {
            Entry::Occupied(entry) if entry.get().registration == registration.id => {
                Some(entry.remove())
            }
            _ => None,
        }
    }

    /// Point-in-time listing of every tracked process, ordered by pid.
    pub fn snapshot(&self) -> Vec<ProcessEntry> {
        let table = self.lock();
        let now = Instant::now();
        table
            .processes
            .values()
            .map(|record| ProcessEntry {
                pid: record.pid,
                name: record.name.clone(),
                elapsed: now.saturating_duration_since(record.started),
            })
            .collect()
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.lock().processes.contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.lock().processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().processes.is_empty()
    }

    // Holders never leave the table half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
