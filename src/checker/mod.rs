//! One availability check, end to end.
//!
//! ```text
//! CatalogSource ─► FetchOrchestrator ─► Normalizer ─► AvailabilityStateStore ─► Notifier
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::app::{Result, WatchError};
use crate::domain::{Item, StoreContext};
use crate::fetcher::{FetchOrchestrator, DEFAULT_WORKERS};
use crate::normalizer::Normalizer;
use crate::notifier::Notifier;
use crate::source::CatalogSource;
use crate::state::AvailabilityStateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckPhase {
    Idle,
    FetchingCatalog,
    FetchingDetails,
    Diffing,
    Notifying,
    Done,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Report every item and leave the stored snapshot alone
    pub force: bool,
    /// Render notifications without sending them
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct CheckSettings {
    pub pincode: Option<String>,
    pub default_store: String,
    pub workers: usize,
    pub request_timeout: Duration,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            pincode: None,
            default_store: String::new(),
            workers: DEFAULT_WORKERS,
            request_timeout: crate::fetcher::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub store: String,
    pub total: usize,
    pub available: usize,
    pub unavailable: usize,
    /// Items handed to the notifier
    pub notified: usize,
    /// Notifier result; `None` when there was nothing to send
    pub delivered: Option<bool>,
    pub degraded: bool,
    pub phase: CheckPhase,
}

pub struct AvailabilityChecker<C: CatalogSource> {
    source: Arc<C>,
    orchestrator: FetchOrchestrator<C>,
    normalizer: Normalizer,
    state: AvailabilityStateStore,
    notifier: Arc<dyn Notifier>,
    settings: CheckSettings,
    phase: CheckPhase,
}

impl<C: CatalogSource> AvailabilityChecker<C> {
    pub fn new(
        source: Arc<C>,
        normalizer: Normalizer,
        state: AvailabilityStateStore,
        notifier: Arc<dyn Notifier>,
        settings: CheckSettings,
    ) -> Self {
        let orchestrator =
            FetchOrchestrator::with_timeout(Arc::clone(&source), settings.request_timeout);
        Self {
            source,
            orchestrator,
            normalizer,
            state,
            notifier,
            settings,
            phase: CheckPhase::Idle,
        }
    }

    pub fn phase(&self) -> CheckPhase {
        self.phase
    }

    pub fn state(&self) -> &AvailabilityStateStore {
        &self.state
    }

    fn set_phase(&mut self, phase: CheckPhase) {
        debug!("Checker phase: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn fail<T>(&mut self, err: WatchError) -> Result<T> {
        self.set_phase(CheckPhase::Failed);
        Err(err)
    }

    pub async fn run(&mut self, options: RunOptions) -> Result<RunReport> {
        self.set_phase(CheckPhase::FetchingCatalog);

        let store = match StoreContext::resolve(
            self.settings.pincode.as_deref(),
            &self.settings.default_store,
        ) {
            Ok(store) => store,
            Err(e) => return self.fail(e),
        };

        let raw = match self.source.list_catalog(&store).await {
            Ok(raw) => raw,
            Err(e) => return self.fail(e),
        };
        if raw.is_empty() {
            return self.fail(WatchError::EmptyCatalog {
                store: store.name.clone(),
            });
        }
        info!(
            "Retrieved {} products from API for store: {}",
            raw.len(),
            store.name
        );

        self.set_phase(CheckPhase::FetchingDetails);
        let aliases = self.normalizer.aliases(&raw);
        let details = match self
            .orchestrator
            .fetch_details_parallel(&aliases, self.settings.workers)
            .await
        {
            Ok(details) => details,
            Err(e) => return self.fail(e),
        };
        let items = self.normalizer.build(&raw, &details, &store);

        self.set_phase(CheckPhase::Diffing);
        let available = items.iter().filter(|i| i.available).count();
        let unavailable = items.len() - available;
        let degraded = self.state.is_degraded();
        let to_notify = self.select(&items, &store, &options);

        self.set_phase(CheckPhase::Notifying);
        let delivered = if to_notify.is_empty() {
            info!("No newly available products to notify about");
            None
        } else {
            let delivered = self
                .notifier
                .notify(&to_notify, options.force, options.dry_run)
                .await;
            if !delivered {
                warn!("Notification for {} products was not delivered", to_notify.len());
            }
            Some(delivered)
        };

        info!(
            "Current status - Available: {}, Unavailable: {}",
            available, unavailable
        );
        for item in items.iter().filter(|i| !i.available) {
            debug!("Product unavailable: {}", item.name);
        }

        self.set_phase(CheckPhase::Done);
        Ok(RunReport {
            store: store.name,
            total: items.len(),
            available,
            unavailable,
            notified: to_notify.len(),
            delivered,
            degraded,
            phase: self.phase,
        })
    }

    fn select(&self, items: &[Item], store: &StoreContext, options: &RunOptions) -> Vec<Item> {
        if options.force {
            info!(
                "Force notify enabled. Sending status for all {} products",
                items.len()
            );
            return items.to_vec();
        }

        let available: Vec<&Item> = items.iter().filter(|i| i.available).collect();

        if self.state.is_degraded() {
            warn!(
                "Snapshot store unavailable, reporting all {} available products",
                available.len()
            );
            return available.into_iter().cloned().collect();
        }

        let current: BTreeSet<String> = available.iter().map(|i| i.alias.clone()).collect();
        let delta = self.state.diff_and_update(store.key(), &current);
        if !delta.is_empty() {
            info!("Found {} newly available products", delta.len());
        }

        available
            .into_iter()
            .filter(|i| delta.contains(&i.alias))
            .cloned()
            .collect()
    }

    /// Close every browser or client session held for this checker.
    pub async fn shutdown(&self) {
        self.orchestrator.shutdown().await;
    }
}
