//! Typed views over the untyped JSON bundles returned by a catalog source.
//!
//! Every field is optional and produced by an explicit coercion rule, so a
//! partially populated or malformed response never fails to convert. Defaults
//! are applied later by the normalizer.

use serde_json::{Map, Value};

/// One entry of the catalog listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCatalogEntry {
    pub alias: Option<String>,
    pub name: Option<String>,
    pub available: Option<f64>,
    pub price: Option<f64>,
}

impl RawCatalogEntry {
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        Self {
            alias: coerce_string(obj.get("alias")).filter(|a| !a.trim().is_empty()),
            name: coerce_string(obj.get("name")),
            available: coerce_availability(obj.get("available")),
            price: coerce_f64(obj.get("price")),
        }
    }

    /// Extract the entries of a listing response.
    ///
    /// Accepts either `{"data": [...]}` or a bare array; anything else is an
    /// empty listing.
    pub fn list_from_response(value: &Value) -> Vec<Self> {
        let entries = match value {
            Value::Array(entries) => entries,
            Value::Object(obj) => match obj.get("data") {
                Some(Value::Array(entries)) => entries,
                _ => return Vec::new(),
            },
            _ => return Vec::new(),
        };

        entries.iter().map(Self::from_value).collect()
    }
}

/// Nested `metafields` bundle of a detail response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metafields {
    pub product_type: Option<String>,
    pub uom: Option<String>,
}

impl Metafields {
    fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_object) {
            Some(obj) => Self {
                product_type: coerce_string(obj.get("product_type")),
                uom: coerce_string(obj.get("uom")),
            },
            None => Self::default(),
        }
    }
}

/// Per-item detail used to enrich a catalog entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDetail {
    pub inventory_quantity: Option<i64>,
    pub inventory_low_stock_quantity: Option<i64>,
    pub weight: Option<i64>,
    pub total_order_count: Option<i64>,
    pub compare_price: Option<f64>,
    pub metafields: Metafields,
}

impl RawDetail {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            inventory_quantity: coerce_i64(obj.get("inventory_quantity")),
            inventory_low_stock_quantity: coerce_i64(obj.get("inventory_low_stock_quantity")),
            weight: coerce_i64(obj.get("weight")),
            total_order_count: coerce_i64(obj.get("total_order_count")),
            compare_price: coerce_f64(obj.get("compare_price")),
            metafields: Metafields::from_value(obj.get("metafields")),
        }
    }

    /// Locate the detail record for `alias` inside a response.
    ///
    /// Responses wrapped as `{"data": [...]}` are unwrapped to the entry whose
    /// alias matches, or the first object entry. Returns `None` when the
    /// response holds no object at all.
    pub fn from_response(alias: &str, value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        match obj.get("data") {
            Some(Value::Array(entries)) => {
                let objects: Vec<&Map<String, Value>> =
                    entries.iter().filter_map(Value::as_object).collect();
                let matching = objects
                    .iter()
                    .find(|entry| coerce_string(entry.get("alias")).as_deref() == Some(alias))
                    .or_else(|| objects.first())?;
                Some(Self::from_object(matching))
            }
            Some(Value::Object(inner)) => Some(Self::from_object(inner)),
            _ => Some(Self::from_object(obj)),
        }
    }

    /// Parse a raw response body. Malformed JSON yields `None`.
    pub fn from_body(alias: &str, body: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::from_response(alias, &value),
            Err(e) => {
                tracing::debug!(alias, error = %e, "detail body is not valid JSON");
                None
            }
        }
    }
}

pub(crate) fn coerce_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| truncate(n.as_f64()?)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| truncate(s.parse::<f64>().ok()?))
        }
        _ => None,
    }
}

/// Availability flag as a number; JSON booleans count as 1 and 0
fn coerce_availability(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        other => coerce_f64(Some(other)),
    }
}

pub(crate) fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

pub(crate) fn coerce_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn truncate(f: f64) -> Option<i64> {
    // `as` saturates at the i64 bounds
    f.is_finite().then(|| f.trunc() as i64)
}
