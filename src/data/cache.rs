use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::model::LineItemTable;

/// Time-bounded memo of the loaded table.
///
/// The source is static within a session, so the cache has no key. Readers
/// get an `Arc` snapshot; a reload swaps the whole table, never mutating a
/// table someone else holds.
#[derive(Debug)]
pub struct LoadCache {
    ttl: Duration,
    slot: Mutex<Option<Cached>>,
}

#[derive(Debug)]
struct Cached {
    loaded_at: Instant,
    table: Arc<LineItemTable>,
}

impl LoadCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached table, running `load` when nothing is cached or the
    /// cached copy is older than the TTL. A failed load leaves the slot empty.
    pub fn get_or_load<E, F>(&self, load: F) -> Result<Arc<LineItemTable>, E>
    where
        F: FnOnce() -> Result<LineItemTable, E>,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = slot.as_ref() {
            if cached.loaded_at.elapsed() < self.ttl {
                log::debug!("Load cache hit ({} rows)", cached.table.len());
                return Ok(Arc::clone(&cached.table));
            }
            log::debug!("Load cache expired after {:?}", self.ttl);
        }

        *slot = None;
        let table = Arc::new(load()?);
        log::debug!("Load cache filled ({} rows)", table.len());
        *slot = Some(Cached {
            loaded_at: Instant::now(),
            table: Arc::clone(&table),
        });
        Ok(table)
    }

    /// Drop the cached table so the next read reloads.
    pub fn invalidate(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
