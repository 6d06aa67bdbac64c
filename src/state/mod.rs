//! Cross-run availability state.
//!
//! The snapshot for a store is read once at the start of a diff and fully
//! replaced at the end. The read and the write are not atomic: a crash in
//! between re-notifies on the next run, but a transition is never missed.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::store::SnapshotStore;

pub const DEFAULT_KEY_PREFIX: &str = "amul:";
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub struct AvailabilityStateStore {
    backend: Option<Box<dyn SnapshotStore>>,
    key_prefix: String,
    retention: Duration,
}

impl AvailabilityStateStore {
    pub fn new(
        backend: Box<dyn SnapshotStore>,
        key_prefix: impl Into<String>,
        retention: Duration,
    ) -> Self {
        Self {
            backend: Some(backend),
            key_prefix: key_prefix.into(),
            retention,
        }
    }

    /// A store with no backend. Every diff reports the full current set.
    pub fn degraded(key_prefix: impl Into<String>, retention: Duration) -> Self {
        Self {
            backend: None,
            key_prefix: key_prefix.into(),
            retention,
        }
    }

    /// Wrap the result of opening a backend, degrading when it failed.
    pub fn connect<S, E>(
        opened: std::result::Result<S, E>,
        key_prefix: impl Into<String>,
        retention: Duration,
    ) -> Self
    where
        S: SnapshotStore + 'static,
        E: std::fmt::Display,
    {
        match opened {
            Ok(backend) => {
                info!("Connected to snapshot store");
                Self::new(Box::new(backend), key_prefix, retention)
            }
            Err(e) => {
                warn!(
                    "Snapshot store not available, deduplication disabled: {}",
                    e
                );
                Self::degraded(key_prefix, retention)
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.backend.is_none()
    }

    pub fn key_for(&self, store: &str) -> String {
        format!("{}{}:available", self.key_prefix, store)
    }

    /// Identifiers last recorded as available. Empty on first run or when
    /// the backend cannot be read.
    pub fn previous_available(&self, store: &str) -> BTreeSet<String> {
        let Some(backend) = &self.backend else {
            return BTreeSet::new();
        };

        match backend.read_set(&self.key_for(store)) {
            Ok(set) => set,
            Err(e) => {
                error!("Failed to read previous state for {}: {}", store, e);
                BTreeSet::new()
            }
        }
    }

    /// Replace the stored set for `store` and refresh its retention window.
    pub fn record_available(&self, store: &str, available: &BTreeSet<String>) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };

        let key = self.key_for(store);
        let result = backend
            .replace_set(&key, available)
            .and_then(|()| backend.expire(&key, self.retention));

        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to update state for {}: {}", store, e);
                false
            }
        }
    }

    /// Newly available identifiers (`current - previous`), then persist
    /// `current` as the new snapshot.
    pub fn diff_and_update(&self, store: &str, current: &BTreeSet<String>) -> BTreeSet<String> {
        let previous = self.previous_available(store);
        let newly_available: BTreeSet<String> = current.difference(&previous).cloned().collect();

        self.record_available(store, current);

        info!(
            "Previous available: {}, Current available: {}, Newly available: {}",
            previous.len(),
            current.len(),
            newly_available.len()
        );

        newly_available
    }
}
