use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the catalog lives on the storefront
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Storefront origin (default: https://shop.amul.com)
    pub base_url: String,

    /// Category browsed for the catalog listing (default: protein)
    pub category: String,

    /// Prefix for product links in notifications
    pub product_base_url: String,

    /// Entity endpoint the storefront's API requests go through
    pub endpoint: String,

    /// Page size for the direct API listing
    pub page_limit: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: "https://shop.amul.com".to_string(),
            category: "protein".to_string(),
            product_base_url: "https://shop.amul.com/product".to_string(),
            endpoint: "ms.products".to_string(),
            page_limit: 100,
        }
    }
}

impl CatalogSettings {
    fn origin(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Page that lists the category in the browser
    pub fn category_page(&self) -> String {
        format!("{}/en/browse/{}", self.origin(), self.category)
    }

    /// Product page in the browser
    pub fn product_page(&self, alias: &str) -> String {
        format!("{}/en/product/{}", self.origin(), alias)
    }

    /// Landing page used for store selection
    pub fn landing_page(&self) -> String {
        format!("{}/en/", self.origin())
    }

    /// Prefix every storefront API response URL starts with
    pub fn api_prefix(&self) -> String {
        format!("{}/api/", self.origin())
    }

    /// Entity endpoint for direct API requests
    pub fn entity_url(&self) -> String {
        format!("{}/api/1/entity/{}", self.origin(), self.endpoint)
    }
}

/// Configuration for the browser-driven catalog source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Wait after loading the category page before reading captured traffic (ms)
    pub wait_after_load_ms: u64,

    /// Wait after loading a product page before reading captured traffic (ms)
    pub detail_wait_ms: u64,

    /// How long to wait for store-selection elements to appear (seconds)
    pub element_timeout_secs: u64,

    /// User agent string to use
    pub user_agent: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            wait_after_load_ms: 2000,
            detail_wait_ms: 800,
            element_timeout_secs: 10,
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36"
                    .to_string(),
            ),
        }
    }
}

impl BrowserSettings {
    pub fn wait_after_load(&self) -> Duration {
        Duration::from_millis(self.wait_after_load_ms)
    }

    pub fn detail_wait(&self) -> Duration {
        Duration::from_millis(self.detail_wait_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }
}
