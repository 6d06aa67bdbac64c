//! Liveness checks for scheduled deployments.
//!
//! Each successful run leaves a heartbeat file holding the unix time of the
//! last catalog fetch. `stockwatch health` fails when the heartbeat is stale
//! or the snapshot database cannot be opened.

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::app::{Result, WatchError};
use crate::store::SqliteSnapshotStore;

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(900);

#[derive(Debug, Clone, PartialEq)]
pub struct HealthCheck {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl HealthCheck {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Record `now` as the time of the last successful fetch.
pub fn write_heartbeat(path: &Path, now: DateTime<Utc>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, now.timestamp().to_string())?;
    Ok(())
}

/// Time of the last recorded fetch, `None` when no heartbeat exists yet.
pub fn read_heartbeat(path: &Path) -> Result<Option<DateTime<Utc>>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let trimmed = content.trim();
    // accept fractional seconds as written by other tools
    let seconds = trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().map(|s| s as i64))
        .ok_or_else(|| WatchError::Other(format!("Invalid heartbeat timestamp: {:?}", trimmed)))?;

    DateTime::from_timestamp(seconds, 0)
        .map(Some)
        .ok_or_else(|| WatchError::Other(format!("Heartbeat timestamp out of range: {}", seconds)))
}

pub fn check_snapshot_store(db_path: &Path) -> HealthCheck {
    match SqliteSnapshotStore::new(db_path) {
        Ok(_) => HealthCheck::pass("snapshot_store", format!("Opened {}", db_path.display())),
        Err(e) => HealthCheck::fail("snapshot_store", format!("Snapshot store check failed: {}", e)),
    }
}

pub fn check_last_fetch(path: &Path, max_age: Duration, now: DateTime<Utc>) -> HealthCheck {
    let last = match read_heartbeat(path) {
        Ok(Some(last)) => last,
        Ok(None) => {
            return HealthCheck::pass(
                "last_fetch_time",
                "No previous fetch timestamp found (first run), considering healthy",
            )
        }
        Err(e) => {
            return HealthCheck::fail(
                "last_fetch_time",
                format!("Error checking last fetch time: {}", e),
            )
        }
    };

    let age = (now - last).num_seconds();
    if age > max_age.as_secs() as i64 {
        HealthCheck::fail(
            "last_fetch_time",
            format!(
                "Last product fetch was {} seconds ago (> {} seconds)",
                age,
                max_age.as_secs()
            ),
        )
    } else {
        HealthCheck::pass(
            "last_fetch_time",
            format!("Last product fetch was {} seconds ago", age),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(seconds, 0).unwrap()
    }

    #[test]
    fn test_heartbeat_roundtrip_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("last_fetch");

        write_heartbeat(&path, at(1_700_000_000)).unwrap();
        assert_eq!(read_heartbeat(&path).unwrap(), Some(at(1_700_000_000)));
    }

    #[test]
    fn test_missing_heartbeat_is_healthy() {
        let dir = TempDir::new().unwrap();
        let check = check_last_fetch(&dir.path().join("absent"), DEFAULT_MAX_AGE, at(0));
        assert!(check.passed);
        assert!(check.detail.contains("first run"));
    }

    #[test]
    fn test_stale_heartbeat_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_fetch");
        write_heartbeat(&path, at(1_000)).unwrap();

        let fresh = check_last_fetch(&path, DEFAULT_MAX_AGE, at(1_900));
        assert!(fresh.passed);

        let stale = check_last_fetch(&path, DEFAULT_MAX_AGE, at(1_901));
        assert!(!stale.passed);
        assert_eq!(
            stale.detail,
            "Last product fetch was 901 seconds ago (> 900 seconds)"
        );
    }

    #[test]
    fn test_fractional_timestamp_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_fetch");
        fs::write(&path, "1700000000.75\n").unwrap();
        assert_eq!(read_heartbeat(&path).unwrap(), Some(at(1_700_000_000)));
    }

    #[test]
    fn test_garbage_heartbeat_fails_check() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_fetch");
        fs::write(&path, "yesterday").unwrap();

        let check = check_last_fetch(&path, DEFAULT_MAX_AGE, at(0));
        assert!(!check.passed);
    }

    #[test]
    fn test_snapshot_store_check() {
        let dir = TempDir::new().unwrap();
        assert!(check_snapshot_store(&dir.path().join("state.db")).passed);
        assert!(!check_snapshot_store(&dir.path().join("missing").join("state.db")).passed);
    }
}
