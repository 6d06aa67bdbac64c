use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::Result;
use crate::checker::{AvailabilityChecker, CheckSettings};
use crate::config::Config;
use crate::normalizer::Normalizer;
use crate::notifier::{Notifier, TelegramNotifier};
use crate::source::{CatalogSource, ChromeCatalogSource, HttpCatalogSource};
use crate::state::AvailabilityStateStore;
use crate::store::SqliteSnapshotStore;

const FALLBACK_USER_AGENT: &str = concat!("stockwatch/", env!("CARGO_PKG_VERSION"));

/// Wires the configured collaborators together for one invocation.
pub struct AppContext {
    pub config: Config,
    pub notifier: Arc<dyn Notifier>,
    pub normalizer: Normalizer,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let notifier = TelegramNotifier::new(
            config.notify.bot_token.clone(),
            config.notify.channel_id.clone(),
            config.notify.timeout(),
        )?
        .with_footer(config.notify.footer.clone());
        let normalizer = Normalizer::new(&config.catalog.product_base_url);

        Ok(Self {
            config,
            notifier: Arc::new(notifier),
            normalizer,
        })
    }

    /// Open the snapshot database, degrading to stateless operation when it
    /// cannot be opened.
    pub fn open_state(&self) -> AvailabilityStateStore {
        let state = &self.config.state;
        let opened = state
            .db_path()
            .map_err(|e| e.to_string())
            .and_then(|path| SqliteSnapshotStore::new(path).map_err(|e| e.to_string()));

        AvailabilityStateStore::connect(opened, state.key_prefix.clone(), state.retention())
    }

    pub fn chrome_source(&self) -> ChromeCatalogSource {
        ChromeCatalogSource::new(self.config.browser.clone(), self.config.catalog.clone())
    }

    pub fn http_source(&self) -> Result<HttpCatalogSource> {
        let user_agent = self
            .config
            .browser
            .user_agent
            .as_deref()
            .unwrap_or(FALLBACK_USER_AGENT);
        HttpCatalogSource::new(
            self.config.catalog.clone(),
            self.config.fetch.request_timeout(),
            user_agent,
        )
    }

    pub fn checker<C: CatalogSource>(&self, source: Arc<C>) -> AvailabilityChecker<C> {
        let settings = CheckSettings {
            pincode: self.config.store.pincode.clone(),
            default_store: self.config.store.default_store.clone(),
            workers: self.config.fetch.max_workers,
            request_timeout: self.config.fetch.request_timeout(),
        };

        AvailabilityChecker::new(
            source,
            self.normalizer.clone(),
            self.open_state(),
            Arc::clone(&self.notifier),
            settings,
        )
    }

    pub fn heartbeat_path(&self) -> Result<PathBuf> {
        Ok(self.config.state.heartbeat_path()?)
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        Ok(self.config.state.db_path()?)
    }
}
