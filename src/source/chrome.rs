use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::{Element, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::app::{Result, WatchError};
use crate::domain::{RawCatalogEntry, RawDetail, StoreContext};
use crate::source::capture::{api_responses, CapturedResponse};
use crate::source::{BrowserSettings, CatalogSettings, CatalogSource};

const PINCODE_INPUT: &str = "input[placeholder=\"Enter Your Pincode\"]";
const PINCODE_RESULT: &str = "div.list-group-item.text-left.searchproduct-name a.searchitem-name";
const PINCODE_CONFIRMATION: &str = "div.pincode_wrap span.ms-2.fw-semibold";

/// How long to keep draining captured network events once the page settled
const DRAIN_WINDOW: Duration = Duration::from_millis(500);
const DRAIN_POLL: Duration = Duration::from_millis(50);

static SESSION_SEQ: AtomicUsize = AtomicUsize::new(0);

/// One headless Chrome process with a single page
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    data_dir: PathBuf,
}

impl ChromeSession {
    async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let data_dir = std::env::temp_dir().join(format!(
            "stockwatch-chrome-{}-{}",
            std::process::id(),
            SESSION_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&data_dir)
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-background-timer-throttling")
            .arg("--disable-renderer-backgrounding")
            .arg("--disable-popup-blocking")
            .arg("--disable-sync")
            .arg("--no-first-run");

        if !settings.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| WatchError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            WatchError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| WatchError::Browser(format!("Failed to create page: {}", e)))?;

        if let Some(ref ua) = settings.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| WatchError::Browser(format!("Failed to set user agent: {}", e)))?;
        }

        page.execute(EnableParams::default())
            .await
            .map_err(|e| WatchError::Browser(format!("Failed to enable network events: {}", e)))?;

        Ok(Self {
            browser,
            page,
            handler,
            data_dir,
        })
    }

    async fn close(mut self) -> Result<()> {
        let result = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| WatchError::Browser(format!("Failed to close browser: {}", e)));

        let _ = self.browser.wait().await;
        self.handler.abort();
        let _ = tokio::fs::remove_dir_all(&self.data_dir).await;

        result
    }

    /// Load `url` and record every response the page received while loading
    async fn capture(&self, url: &str, settle: Duration) -> Result<Vec<CapturedResponse>> {
        let mut events = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| WatchError::Browser(format!("Failed to listen for responses: {}", e)))?;

        self.page
            .goto(url)
            .await
            .map_err(|e| WatchError::Browser(format!("Navigation to {} failed: {}", url, e)))?;

        tokio::time::sleep(settle).await;

        let deadline = Instant::now() + DRAIN_WINDOW;
        let mut captured = Vec::new();
        while Instant::now() < deadline {
            match tokio::time::timeout(DRAIN_POLL, events.next()).await {
                Ok(Some(event)) => captured.push(CapturedResponse::new(
                    event.request_id.inner().clone(),
                    event.response.url.clone(),
                )),
                Ok(None) | Err(_) => break,
            }
        }

        Ok(captured)
    }

    /// Body of a captured response, decoded when the browser returned base64
    async fn response_body(&self, response: &CapturedResponse) -> Result<String> {
        let reply = self
            .page
            .execute(GetResponseBodyParams::new(RequestId::new(
                response.request_id.clone(),
            )))
            .await
            .map_err(|e| WatchError::Browser(format!("Failed to read response body: {}", e)))?;

        if !reply.result.base64_encoded {
            return Ok(reply.result.body.clone());
        }

        let bytes = STANDARD
            .decode(reply.result.body.as_bytes())
            .map_err(|e| WatchError::Browser(format!("Invalid base64 response body: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| WatchError::Browser(format!("Response body is not UTF-8: {}", e)))
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<Element> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.page.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(e) if Instant::now() >= deadline => {
                    return Err(WatchError::Browser(format!(
                        "Timed out waiting for {}: {}",
                        selector, e
                    )))
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(200)).await,
            }
        }
    }
}

/// Catalog source that drives headless Chrome.
///
/// The storefront API rejects direct requests, so pages are loaded in a real
/// browser and the API responses are read back out of the captured network
/// traffic. The store is selected once, on a primary session that also
/// serves the catalog listing; detail fetches run on pooled sessions.
pub struct ChromeCatalogSource {
    browser: BrowserSettings,
    catalog: CatalogSettings,
    primary: Mutex<Option<ChromeSession>>,
}

impl ChromeCatalogSource {
    pub fn new(browser: BrowserSettings, catalog: CatalogSettings) -> Self {
        Self {
            browser,
            catalog,
            primary: Mutex::new(None),
        }
    }

    async fn select_store(&self, session: &ChromeSession, store: &StoreContext) -> Result<()> {
        let timeout = self.browser.element_timeout();
        let landing = self.catalog.landing_page();
        session
            .page
            .goto(landing.as_str())
            .await
            .map_err(|e| WatchError::Browser(format!("Navigation to {} failed: {}", landing, e)))?;

        let input = session.wait_for_element(PINCODE_INPUT, timeout).await?;
        input
            .click()
            .await
            .map_err(|e| WatchError::Browser(format!("Failed to focus pincode input: {}", e)))?
            .type_str(&store.pincode)
            .await
            .map_err(|e| WatchError::Browser(format!("Failed to type pincode: {}", e)))?;

        let result = session.wait_for_element(PINCODE_RESULT, timeout).await?;
        result
            .click()
            .await
            .map_err(|e| WatchError::Browser(format!("Failed to pick store: {}", e)))?;

        let confirmation = session.wait_for_element(PINCODE_CONFIRMATION, timeout).await?;
        let text = confirmation
            .inner_text()
            .await
            .map_err(|e| WatchError::Browser(format!("Failed to read confirmation: {}", e)))?
            .unwrap_or_default();
        info!("Pin code confirmed: {}", text.trim());

        Ok(())
    }
}

#[async_trait]
impl CatalogSource for ChromeCatalogSource {
    type Session = ChromeSession;

    async fn open_session(&self) -> Result<ChromeSession> {
        ChromeSession::launch(&self.browser).await
    }

    async fn close_session(&self, session: ChromeSession) -> Result<()> {
        session.close().await
    }

    async fn list_catalog(&self, store: &StoreContext) -> Result<Vec<RawCatalogEntry>> {
        let mut primary = self.primary.lock().await;
        if primary.is_none() {
            let session = ChromeSession::launch(&self.browser).await?;
            if let Err(e) = self.select_store(&session, store).await {
                let _ = session.close().await;
                return Err(e);
            }
            *primary = Some(session);
        }
        let Some(session) = primary.as_ref() else {
            return Err(WatchError::Browser("Primary browser session unavailable".into()));
        };

        let captured = session
            .capture(&self.catalog.category_page(), self.browser.wait_after_load())
            .await?;
        let responses = api_responses(
            captured,
            &self.catalog.api_prefix(),
            &self.catalog.endpoint,
        );

        let Some(response) = responses.iter().find(|r| r.is_category_listing()) else {
            error!("Could not find products data.");
            return Ok(Vec::new());
        };

        let body = session.response_body(response).await?;
        let json: serde_json::Value = serde_json::from_str(&body)?;
        let entries = RawCatalogEntry::list_from_response(&json);
        info!("Found {} {} products.", entries.len(), self.catalog.category);
        Ok(entries)
    }

    async fn fetch_detail(
        &self,
        alias: &str,
        session: &mut ChromeSession,
    ) -> Result<Option<RawDetail>> {
        let captured = session
            .capture(&self.catalog.product_page(alias), self.browser.detail_wait())
            .await?;
        let responses = api_responses(
            captured,
            &self.catalog.api_prefix(),
            &self.catalog.endpoint,
        );

        let Some(response) = responses.iter().find(|r| r.mentions_alias(alias)) else {
            debug!(alias, "no detail response captured");
            return Ok(None);
        };

        let body = session.response_body(response).await?;
        Ok(RawDetail::from_body(alias, &body))
    }

    async fn shutdown(&self) {
        if let Some(session) = self.primary.lock().await.take() {
            if let Err(e) = session.close().await {
                debug!("Failed to close primary browser session: {}", e);
            }
        }
    }
}
