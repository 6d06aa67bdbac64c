//! Catalog sources.
//!
//! A source lists a store's catalog and fetches per-item detail through a
//! session. Sessions are expensive (a browser process, or an HTTP client with
//! its own connection pool) so the fetch orchestrator pools and reuses them.
//!
//! ```text
//! list_catalog(store) → [RawCatalogEntry]
//! open_session() → Session → fetch_detail(alias, &mut Session) → RawDetail?
//! ```
//!
//! - [`HttpCatalogSource`]: talks to the storefront API directly
//! - [`ChromeCatalogSource`]: drives headless Chrome and reads the API
//!   responses out of the recorded network traffic

mod capture;
mod chrome;
mod config;
mod http;

pub use capture::CapturedResponse;
pub use chrome::{ChromeCatalogSource, ChromeSession};
pub use config::{BrowserSettings, CatalogSettings};
pub use http::{HttpCatalogSource, HttpSession};

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::{RawCatalogEntry, RawDetail, StoreContext};

#[async_trait]
pub trait CatalogSource: Send + Sync + 'static {
    type Session: Send + 'static;

    /// Create a new fetch session.
    async fn open_session(&self) -> Result<Self::Session>;

    /// Dispose of a session and its underlying resources.
    async fn close_session(&self, session: Self::Session) -> Result<()>;

    /// Raw catalog listing for a store.
    async fn list_catalog(&self, store: &StoreContext) -> Result<Vec<RawCatalogEntry>>;

    /// Raw detail for one item, `None` when the source had nothing for it.
    async fn fetch_detail(
        &self,
        alias: &str,
        session: &mut Self::Session,
    ) -> Result<Option<RawDetail>>;

    /// Release anything the source holds outside of pooled sessions.
    async fn shutdown(&self) {}
}
