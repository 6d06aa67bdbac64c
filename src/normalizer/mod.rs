use std::collections::{HashMap, HashSet};

use crate::domain::{Enrichment, Item, RawCatalogEntry, RawDetail, StoreContext};

const UNKNOWN_NAME: &str = "Unknown Product";

/// Builds typed [`Item`]s from a raw catalog listing and its detail map.
///
/// Pure: no clock, no I/O. Missing fields fall back to zero or empty values.
#[derive(Clone)]
pub struct Normalizer {
    product_base_url: String,
}

impl Normalizer {
    pub fn new(product_base_url: &str) -> Self {
        Self {
            product_base_url: product_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Aliases worth fetching detail for, in catalog order, without repeats.
    pub fn aliases(&self, raw: &[RawCatalogEntry]) -> Vec<String> {
        let mut seen = HashSet::new();
        raw.iter()
            .filter_map(usable_alias)
            .filter(|alias| seen.insert(*alias))
            .map(str::to_string)
            .collect()
    }

    pub fn build(
        &self,
        raw: &[RawCatalogEntry],
        details: &HashMap<String, Option<RawDetail>>,
        store: &StoreContext,
    ) -> Vec<Item> {
        raw.iter()
            .filter_map(|entry| {
                let alias = usable_alias(entry)?;
                let detail = details.get(alias).and_then(Option::as_ref);
                Some(self.item(alias, entry, detail, store))
            })
            .collect()
    }

    fn item(
        &self,
        alias: &str,
        entry: &RawCatalogEntry,
        detail: Option<&RawDetail>,
        store: &StoreContext,
    ) -> Item {
        Item {
            alias: alias.to_string(),
            name: entry
                .name
                .clone()
                .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            available: entry.available.is_some_and(|a| a > 0.0),
            price: entry.price.unwrap_or(0.0),
            url: format!("{}/{}", self.product_base_url, alias),
            store: store.name.clone(),
            enrichment: detail.map(enrich).unwrap_or_default(),
        }
    }
}

fn usable_alias(entry: &RawCatalogEntry) -> Option<&str> {
    entry.alias.as_deref().map(str::trim).filter(|a| !a.is_empty())
}

fn enrich(detail: &RawDetail) -> Enrichment {
    Enrichment {
        inventory_quantity: detail.inventory_quantity.unwrap_or(0),
        inventory_low_stock_quantity: detail.inventory_low_stock_quantity.unwrap_or(0),
        weight: detail.weight.unwrap_or(0),
        total_order_count: detail.total_order_count.unwrap_or(0),
        compare_price: detail.compare_price.unwrap_or(0.0),
        product_type: detail.metafields.product_type.clone().unwrap_or_default(),
        uom: detail.metafields.uom.clone().unwrap_or_default(),
    }
}
