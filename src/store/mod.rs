pub mod sqlite;

use std::collections::BTreeSet;
use std::time::Duration;

use crate::app::Result;

pub use sqlite::SqliteSnapshotStore;

/// Durable key/value store of identifier sets with per-key expiry.
pub trait SnapshotStore: Send + Sync {
    /// Members stored at `key`, empty when the key is missing or expired.
    fn read_set(&self, key: &str) -> Result<BTreeSet<String>>;
    /// Replace the whole set at `key`. Clears any expiry on the key.
    fn replace_set(&self, key: &str, members: &BTreeSet<String>) -> Result<()>;
    /// Expire `key` once `ttl` has elapsed.
    fn expire(&self, key: &str, ttl: Duration) -> Result<()>;
}
