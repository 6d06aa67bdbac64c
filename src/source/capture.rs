//! Selection of storefront API responses out of recorded browser traffic.

use std::collections::HashSet;

use url::Url;

/// A response observed on the browser's network domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    pub request_id: String,
    pub url: String,
}

impl CapturedResponse {
    pub fn new(request_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            url: url.into(),
        }
    }

    /// Decoded query values of the response URL
    fn query_values(&self) -> Vec<(String, String)> {
        Url::parse(&self.url)
            .map(|url| {
                url.query_pairs()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether this is the category listing request
    pub fn is_category_listing(&self) -> bool {
        self.query_values()
            .iter()
            .any(|(k, v)| k == "filters[0][field]" && v == "categories")
    }

    /// Whether this request was made for the given product alias
    pub fn mentions_alias(&self, alias: &str) -> bool {
        self.url.contains(alias)
            || self.query_values().iter().any(|(_, v)| v.contains(alias))
    }
}

/// Keep the responses under `api_prefix` whose URL contains `endpoint`,
/// dropping repeated URLs. Order of arrival is preserved.
pub fn api_responses(
    captured: impl IntoIterator<Item = CapturedResponse>,
    api_prefix: &str,
    endpoint: &str,
) -> Vec<CapturedResponse> {
    let mut seen = HashSet::new();
    captured
        .into_iter()
        .filter(|r| r.url.starts_with(api_prefix) && r.url.contains(endpoint))
        .filter(|r| seen.insert(r.url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "https://shop.amul.com/api/";

    #[test]
    fn test_api_responses_filters_and_dedupes() {
        let captured = vec![
            CapturedResponse::new("1", "https://shop.amul.com/en/browse/protein"),
            CapturedResponse::new("2", "https://shop.amul.com/api/1/entity/ms.products?x=1"),
            CapturedResponse::new("3", "https://shop.amul.com/api/1/entity/ms.products?x=1"),
            CapturedResponse::new("4", "https://shop.amul.com/api/1/entity/ms.settings"),
            CapturedResponse::new("5", "https://cdn.example.com/api/ms.products"),
            CapturedResponse::new("6", "https://shop.amul.com/api/1/entity/ms.products?x=2"),
        ];

        let kept = api_responses(captured, PREFIX, "ms.products");
        let ids: Vec<&str> = kept.iter().map(|r| r.request_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "6"]);
    }

    #[test]
    fn test_category_listing_decodes_query() {
        let encoded = CapturedResponse::new(
            "1",
            "https://shop.amul.com/api/1/entity/ms.products?filters%5B0%5D%5Bfield%5D=categories&filters%5B0%5D%5Bvalue%5D%5B0%5D=protein",
        );
        assert!(encoded.is_category_listing());

        let plain = CapturedResponse::new(
            "2",
            "https://shop.amul.com/api/1/entity/ms.products?filters[0][field]=categories",
        );
        assert!(plain.is_category_listing());

        let detail = CapturedResponse::new(
            "3",
            "https://shop.amul.com/api/1/entity/ms.products?filters[0][field]=alias",
        );
        assert!(!detail.is_category_listing());
    }

    #[test]
    fn test_mentions_alias() {
        let r = CapturedResponse::new(
            "1",
            "https://shop.amul.com/api/1/entity/ms.products?q=%7B%22alias%22%3A%22whey-protein%22%7D",
        );
        assert!(r.mentions_alias("whey-protein"));
        assert!(!r.mentions_alias("lassi"));
    }
}
