use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::app::{Result, WatchError};
use crate::domain::RawDetail;
use crate::fetcher::pool::SessionPool;
use crate::source::CatalogSource;

pub const DEFAULT_WORKERS: usize = 12;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one per-alias unit of work
enum Outcome {
    Fetched(Option<RawDetail>),
    NoSession(WatchError),
}

/// Fans detail fetches out over pooled sessions.
///
/// Owns the session pool for its lifetime; [`FetchOrchestrator::shutdown`]
/// disposes every session the pool ever handed out.
pub struct FetchOrchestrator<C: CatalogSource> {
    source: Arc<C>,
    pool: Arc<SessionPool<C::Session>>,
    request_timeout: Duration,
}

impl<C: CatalogSource> FetchOrchestrator<C> {
    pub fn new(source: Arc<C>) -> Self {
        Self::with_timeout(source, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(source: Arc<C>, request_timeout: Duration) -> Self {
        Self {
            source,
            pool: Arc::new(SessionPool::new()),
            request_timeout,
        }
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SessionPool<C::Session> {
        &self.pool
    }

    /// Fetch detail for every alias with at most `concurrency` in flight.
    ///
    /// Every alias gets an entry; failed, empty and timed-out fetches map to
    /// `None`. Only fails when no session could be opened at all.
    pub async fn fetch_details_parallel(
        &self,
        aliases: &[String],
        concurrency: usize,
    ) -> Result<HashMap<String, Option<RawDetail>>> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut seen = HashSet::new();
        let mut handles = Vec::new();

        info!(
            "Fetching detailed info for {} products using {} workers",
            aliases.len(),
            concurrency.max(1)
        );

        for alias in aliases.iter().filter(|a| seen.insert(a.as_str())) {
            let source = Arc::clone(&self.source);
            let pool = Arc::clone(&self.pool);
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.request_timeout;
            let task_alias = alias.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");
                fetch_single(source.as_ref(), &pool, &task_alias, timeout).await
            });

            handles.push((alias.clone(), handle));
        }

        let mut results = HashMap::with_capacity(handles.len());
        let mut session_errors = Vec::new();

        for (alias, handle) in handles {
            let detail = match handle.await {
                Ok(Outcome::Fetched(detail)) => detail,
                Ok(Outcome::NoSession(e)) => {
                    session_errors.push(e);
                    None
                }
                Err(e) => {
                    error!("Task join error for {}: {}", alias, e);
                    None
                }
            };
            debug!("Completed fetching details for: {}", alias);
            results.insert(alias, detail);
        }

        if !results.is_empty() && session_errors.len() == results.len() && self.pool.created() == 0
        {
            let reason = session_errors
                .first()
                .map(ToString::to_string)
                .unwrap_or_default();
            return Err(WatchError::NoSessions(reason));
        }

        let fetched = results.values().filter(|d| d.is_some()).count();
        info!(
            "Successfully fetched details for {}/{} products",
            fetched,
            results.len()
        );

        Ok(results)
    }

    /// Dispose of every pooled session, then release the source.
    ///
    /// Disposal failures are logged at debug and otherwise ignored.
    pub async fn shutdown(&self) {
        let sessions = self.pool.drain();
        let created = self.pool.created();
        if sessions.len() < created {
            warn!(
                "{} of {} fetch sessions were not returned to the pool",
                created - sessions.len(),
                created
            );
        }

        let count = sessions.len();
        for session in sessions {
            if let Err(e) = self.source.close_session(session).await {
                debug!("Failed to close fetch session: {}", e);
            }
        }
        if count > 0 {
            debug!("Closed {} fetch sessions", count);
        }

        self.source.shutdown().await;
    }
}

async fn fetch_single<C: CatalogSource>(
    source: &C,
    pool: &Arc<SessionPool<C::Session>>,
    alias: &str,
    timeout: Duration,
) -> Outcome {
    // the deadline covers opening a session as well as the fetch itself
    let unit = async {
        let mut session = pool.acquire(|| source.open_session()).await?;
        Ok::<_, WatchError>(source.fetch_detail(alias, &mut *session).await)
    };

    let detail = match tokio::time::timeout(timeout, unit).await {
        Ok(Err(e)) => {
            debug!(alias, error = %e, "could not obtain a fetch session");
            return Outcome::NoSession(e);
        }
        Ok(Ok(Ok(Some(detail)))) => Some(detail),
        Ok(Ok(Ok(None))) => {
            debug!(alias, "Could not fetch detailed info");
            None
        }
        Ok(Ok(Err(e))) => {
            debug!(alias, error = %e, "detail fetch failed");
            None
        }
        Err(_) => {
            debug!(alias, ?timeout, "detail fetch timed out");
            None
        }
    };

    Outcome::Fetched(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawCatalogEntry, StoreContext};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    /// Fake source: sessions are numbered; behaviour per alias is scripted
    /// by prefix (`fail-`, `empty-`, `slow-`, `panic-`).
    #[derive(Default)]
    struct ScriptedSource {
        opened: AtomicUsize,
        closed: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        sessions_used: Mutex<Vec<usize>>,
        refuse_sessions: bool,
        open_delay: Duration,
        delay: Duration,
    }

    #[async_trait]
    impl CatalogSource for ScriptedSource {
        type Session = usize;

        async fn open_session(&self) -> Result<usize> {
            if self.refuse_sessions {
                return Err(WatchError::Browser("chrome not installed".into()));
            }
            tokio::time::sleep(self.open_delay).await;
            Ok(self.opened.fetch_add(1, Ordering::SeqCst))
        }

        async fn close_session(&self, _session: usize) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Err(WatchError::Browser("already gone".into()))
        }

        async fn list_catalog(&self, _store: &StoreContext) -> Result<Vec<RawCatalogEntry>> {
            Ok(Vec::new())
        }

        async fn fetch_detail(
            &self,
            alias: &str,
            session: &mut usize,
        ) -> Result<Option<RawDetail>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.sessions_used.lock().unwrap().push(*session);

            tokio::time::sleep(self.delay).await;
            if alias.starts_with("slow-") {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if alias.starts_with("fail-") {
                return Err(WatchError::Browser("navigation failed".into()));
            }
            if alias.starts_with("panic-") {
                panic!("driver crashed");
            }
            if alias.starts_with("empty-") {
                return Ok(None);
            }
            Ok(Some(RawDetail {
                inventory_quantity: Some(alias.len() as i64),
                ..Default::default()
            }))
        }
    }

    fn aliases(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_all_succeed() {
        let orchestrator = FetchOrchestrator::new(Arc::new(ScriptedSource::default()));
        let results = orchestrator
            .fetch_details_parallel(&aliases(&["a", "bb", "ccc"]), 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results["bb"].as_ref().unwrap().inventory_quantity, Some(2));
    }

    #[tokio::test]
    async fn test_failures_are_recorded_as_absent() {
        let orchestrator = FetchOrchestrator::new(Arc::new(ScriptedSource::default()));
        let names = aliases(&["a", "fail-1", "b", "empty-1", "fail-2", "c", "panic-1"]);
        let results = orchestrator.fetch_details_parallel(&names, 3).await.unwrap();

        assert_eq!(results.len(), names.len());
        let absent: Vec<&String> = results
            .iter()
            .filter(|(_, d)| d.is_none())
            .map(|(a, _)| a)
            .collect();
        assert_eq!(absent.len(), 4);
        assert!(results["a"].is_some());
    }

    #[tokio::test]
    async fn test_timeout_is_per_unit() {
        let source = Arc::new(ScriptedSource::default());
        let orchestrator = FetchOrchestrator::with_timeout(source, Duration::from_millis(100));
        let names = aliases(&["a", "slow-1", "b", "slow-2"]);

        let started = Instant::now();
        let results = orchestrator.fetch_details_parallel(&names, 2).await.unwrap();

        // two rounds of two at most one timeout each
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(results.len(), 4);
        assert!(results["slow-1"].is_none());
        assert!(results["slow-2"].is_none());
        assert!(results["a"].is_some());
    }

    #[tokio::test]
    async fn test_timeout_covers_session_open() {
        let source = Arc::new(ScriptedSource {
            open_delay: Duration::from_secs(3),
            ..Default::default()
        });
        let orchestrator = FetchOrchestrator::with_timeout(source, Duration::from_millis(100));

        let started = Instant::now();
        let results = orchestrator
            .fetch_details_parallel(&aliases(&["a", "b"]), 2)
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(results.len(), 2);
        assert!(results.values().all(Option::is_none));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let source = Arc::new(ScriptedSource {
            delay: Duration::from_millis(20),
            ..Default::default()
        });
        let orchestrator = FetchOrchestrator::new(Arc::clone(&source));
        let names: Vec<String> = (0..12).map(|i| format!("item-{}", i)).collect();

        orchestrator.fetch_details_parallel(&names, 3).await.unwrap();

        assert!(source.peak.load(Ordering::SeqCst) <= 3);
        assert!(source.opened.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_sessions_reused_across_runs() {
        let source = Arc::new(ScriptedSource::default());
        let orchestrator = FetchOrchestrator::new(Arc::clone(&source));

        orchestrator
            .fetch_details_parallel(&aliases(&["a", "b", "c", "d"]), 2)
            .await
            .unwrap();
        let opened = source.opened.load(Ordering::SeqCst);

        orchestrator
            .fetch_details_parallel(&aliases(&["e", "f"]), 1)
            .await
            .unwrap();
        assert!(opened >= 1);
        assert_eq!(source.opened.load(Ordering::SeqCst), opened);
    }

    #[tokio::test]
    async fn test_duplicate_aliases_collapse() {
        let source = Arc::new(ScriptedSource::default());
        let orchestrator = FetchOrchestrator::new(Arc::clone(&source));
        let results = orchestrator
            .fetch_details_parallel(&aliases(&["a", "a", "b"]), 4)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(source.sessions_used.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_runs() {
        let orchestrator = FetchOrchestrator::new(Arc::new(ScriptedSource::default()));
        let results = orchestrator
            .fetch_details_parallel(&aliases(&["a"]), 0)
            .await
            .unwrap();
        assert!(results["a"].is_some());
    }

    #[tokio::test]
    async fn test_no_sessions_is_fatal() {
        let source = Arc::new(ScriptedSource {
            refuse_sessions: true,
            ..Default::default()
        });
        let orchestrator = FetchOrchestrator::new(source);
        let result = orchestrator
            .fetch_details_parallel(&aliases(&["a", "b"]), 2)
            .await;

        assert!(matches!(result, Err(WatchError::NoSessions(_))));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let orchestrator = FetchOrchestrator::new(Arc::new(ScriptedSource::default()));
        let results = orchestrator.fetch_details_parallel(&[], 4).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_disposes_all_sessions_and_swallows_errors() {
        let source = Arc::new(ScriptedSource::default());
        let orchestrator = FetchOrchestrator::new(Arc::clone(&source));
        orchestrator
            .fetch_details_parallel(&aliases(&["a", "b", "c", "fail-1"]), 4)
            .await
            .unwrap();

        let opened = source.opened.load(Ordering::SeqCst);
        orchestrator.shutdown().await;

        assert_eq!(source.closed.load(Ordering::SeqCst), opened);
        assert_eq!(orchestrator.pool().idle_count(), 0);
    }
}
