use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::app::Result;
use crate::domain::{RawCatalogEntry, RawDetail, StoreContext};
use crate::source::{CatalogSettings, CatalogSource};

/// Direct client for the storefront's entity API.
///
/// Each session is its own `reqwest::Client`, so concurrent detail fetches
/// run over independent connection pools. The store chosen for the last
/// listing scopes every later detail request.
pub struct HttpCatalogSource {
    client: Client,
    settings: CatalogSettings,
    timeout: Duration,
    user_agent: String,
    selected: RwLock<Option<StoreContext>>,
}

/// A detail-fetch session: one HTTP client and its connections
pub struct HttpSession {
    client: Client,
}

impl HttpCatalogSource {
    pub fn new(settings: CatalogSettings, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Self::build_client(&settings, timeout, user_agent)?;
        Ok(Self {
            client,
            settings,
            timeout,
            user_agent: user_agent.to_string(),
            selected: RwLock::new(None),
        })
    }

    fn build_client(
        settings: &CatalogSettings,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        let origin = settings.base_url.trim_end_matches('/');
        if let Ok(value) = HeaderValue::from_str(origin) {
            headers.insert(ORIGIN, value);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("{}/", origin)) {
            headers.insert(REFERER, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(client)
    }

    fn listing_url(&self, store: &StoreContext) -> Result<Url> {
        let mut url = Url::parse(&self.settings.entity_url())?;
        url.query_pairs_mut()
            .append_pair("filters[0][field]", "categories")
            .append_pair("filters[0][value][0]", &self.settings.category)
            .append_pair("filters[0][operator]", "in")
            .append_pair("limit", &self.settings.page_limit.to_string())
            .append_pair("start", "0");
        scope_to_store(&mut url, store);
        Ok(url)
    }

    fn detail_url(&self, alias: &str) -> Result<Url> {
        let mut url = Url::parse(&self.settings.entity_url())?;
        url.query_pairs_mut()
            .append_pair("filters[0][field]", "alias")
            .append_pair("filters[0][value]", alias)
            .append_pair("limit", "1");
        let selected = self.selected.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(store) = selected.as_ref() {
            scope_to_store(&mut url, store);
        }
        Ok(url)
    }
}

/// Scope a request to the selected store
fn scope_to_store(url: &mut Url, store: &StoreContext) {
    url.query_pairs_mut()
        .append_pair("substore", store.key())
        .append_pair("pincode", &store.pincode);
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    type Session = HttpSession;

    async fn open_session(&self) -> Result<HttpSession> {
        let client = Self::build_client(&self.settings, self.timeout, &self.user_agent)?;
        Ok(HttpSession { client })
    }

    async fn close_session(&self, _session: HttpSession) -> Result<()> {
        Ok(())
    }

    async fn list_catalog(&self, store: &StoreContext) -> Result<Vec<RawCatalogEntry>> {
        *self.selected.write().unwrap_or_else(PoisonError::into_inner) = Some(store.clone());
        let url = self.listing_url(store)?;
        tracing::debug!(store = %store.name, %url, "requesting catalog listing");

        let response = self.client.get(url).send().await?;
        response.error_for_status_ref()?;
        let body: serde_json::Value = response.json().await?;

        let entries = RawCatalogEntry::list_from_response(&body);
        tracing::info!("Found {} {} products.", entries.len(), self.settings.category);
        Ok(entries)
    }

    async fn fetch_detail(
        &self,
        alias: &str,
        session: &mut HttpSession,
    ) -> Result<Option<RawDetail>> {
        let url = self.detail_url(alias)?;
        let response = session.client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        response.error_for_status_ref()?;

        let body = response.text().await?;
        Ok(RawDetail::from_body(alias, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENTITY_PATH: &str = "/api/1/entity/ms.products";

    fn source(server: &MockServer) -> HttpCatalogSource {
        let settings = CatalogSettings {
            base_url: server.uri(),
            ..Default::default()
        };
        HttpCatalogSource::new(settings, Duration::from_secs(5), "stockwatch-test/0.1").unwrap()
    }

    fn store() -> StoreContext {
        StoreContext::resolve(Some("110001"), "delhi").unwrap()
    }

    #[tokio::test]
    async fn test_list_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ENTITY_PATH))
            .and(query_param("filters[0][field]", "categories"))
            .and(query_param("filters[0][value][0]", "protein"))
            .and(query_param("substore", "delhi"))
            .and(query_param("pincode", "110001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"alias": "whey", "name": "Whey", "available": 1, "price": 800},
                    {"name": "placeholder"}
                ]
            })))
            .mount(&server)
            .await;

        let entries = source(&server).list_catalog(&store()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].alias.as_deref(), Some("whey"));
        assert_eq!(entries[0].price, Some(800.0));
        assert_eq!(entries[1].alias, None);
    }

    #[tokio::test]
    async fn test_list_catalog_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ENTITY_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(source(&server).list_catalog(&store()).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ENTITY_PATH))
            .and(query_param("filters[0][field]", "alias"))
            .and(query_param("filters[0][value]", "whey"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"alias": "whey", "inventory_quantity": "25", "weight": 1000}]
            })))
            .mount(&server)
            .await;

        let source = source(&server);
        let mut session = source.open_session().await.unwrap();
        let detail = source.fetch_detail("whey", &mut session).await.unwrap().unwrap();
        assert_eq!(detail.inventory_quantity, Some(25));
        assert_eq!(detail.weight, Some(1000));
    }

    #[tokio::test]
    async fn test_fetch_detail_keeps_listed_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ENTITY_PATH))
            .and(query_param("filters[0][field]", "categories"))
            .and(query_param("substore", "delhi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(ENTITY_PATH))
            .and(query_param("filters[0][field]", "alias"))
            .and(query_param("substore", "delhi"))
            .and(query_param("pincode", "110001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"alias": "whey", "inventory_quantity": 3}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = source(&server);
        source.list_catalog(&store()).await.unwrap();
        let mut session = source.open_session().await.unwrap();
        let detail = source.fetch_detail("whey", &mut session).await.unwrap().unwrap();
        assert_eq!(detail.inventory_quantity, Some(3));
    }

    #[tokio::test]
    async fn test_fetch_detail_not_found_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ENTITY_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = source(&server);
        let mut session = source.open_session().await.unwrap();
        assert!(source.fetch_detail("gone", &mut session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_detail_malformed_body_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ENTITY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let source = source(&server);
        let mut session = source.open_session().await.unwrap();
        assert!(source.fetch_detail("whey", &mut session).await.unwrap().is_none());
    }
}
