use serde::{Deserialize, Serialize};

/// Detail data merged into an item after the per-item fetch.
///
/// Every field defaults to zero or empty when the detail was missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub inventory_quantity: i64,
    pub inventory_low_stock_quantity: i64,
    /// Grams.
    pub weight: i64,
    pub total_order_count: i64,
    pub compare_price: f64,
    pub product_type: String,
    pub uom: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub alias: String,
    pub name: String,
    pub available: bool,
    pub price: f64,
    pub url: String,
    pub store: String,
    pub enrichment: Enrichment,
}

impl Item {
    pub fn status_label(&self) -> &'static str {
        if self.available {
            "Available"
        } else {
            "Unavailable"
        }
    }

    /// Available, in stock, and at or below the store's low-stock threshold.
    pub fn is_low_stock(&self) -> bool {
        let e = &self.enrichment;
        self.available
            && e.inventory_quantity > 0
            && e.inventory_low_stock_quantity > 0
            && e.inventory_quantity <= e.inventory_low_stock_quantity
    }

    /// Savings against the compare price as `(amount, percent)`.
    pub fn discount(&self) -> Option<(f64, f64)> {
        let compare = self.enrichment.compare_price;
        if compare > self.price {
            let amount = compare - self.price;
            Some((amount, amount / compare * 100.0))
        } else {
            None
        }
    }

    /// Weight formatted as grams, or kilograms with one decimal from 1000 g.
    pub fn weight_display(&self) -> Option<String> {
        let weight = self.enrichment.weight;
        if weight <= 0 {
            None
        } else if weight >= 1000 {
            Some(format!("{:.1} kg", weight as f64 / 1000.0))
        } else {
            Some(format!("{}g", weight))
        }
    }

    /// Price as shown to users, always with a decimal part (`100.0`, `99.5`)
    pub fn price_display(&self) -> String {
        if self.price.fract() == 0.0 {
            format!("{:.1}", self.price)
        } else {
            self.price.to_string()
        }
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.status_label())?;
        if self.enrichment.inventory_quantity > 0 {
            write!(f, " (Stock: {})", self.enrichment.inventory_quantity)?;
        }
        write!(f, " - {} - ₹{}", self.store, self.price_display())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn item(alias: &str, available: bool) -> Item {
        Item {
            alias: alias.to_string(),
            name: format!("Product {}", alias),
            available,
            price: 100.0,
            url: format!("https://shop.example.com/product/{}", alias),
            store: "delhi".to_string(),
            enrichment: Enrichment::default(),
        }
    }

    #[test]
    fn test_low_stock_requires_threshold() {
        let mut it = item("a", true);
        it.enrichment.inventory_quantity = 3;
        assert!(!it.is_low_stock());

        it.enrichment.inventory_low_stock_quantity = 5;
        assert!(it.is_low_stock());

        it.available = false;
        assert!(!it.is_low_stock());
    }

    #[test]
    fn test_discount() {
        let mut it = item("a", true);
        assert!(it.discount().is_none());

        it.enrichment.compare_price = 125.0;
        let (amount, pct) = it.discount().unwrap();
        assert_eq!(amount, 25.0);
        assert_eq!(pct, 20.0);
    }

    #[test]
    fn test_weight_display() {
        let mut it = item("a", true);
        assert_eq!(it.weight_display(), None);
        it.enrichment.weight = 500;
        assert_eq!(it.weight_display().as_deref(), Some("500g"));
        it.enrichment.weight = 1500;
        assert_eq!(it.weight_display().as_deref(), Some("1.5 kg"));
    }

    #[test]
    fn test_price_display_keeps_decimal() {
        let mut it = item("a", true);
        assert_eq!(it.price_display(), "100.0");
        it.price = 99.5;
        assert_eq!(it.price_display(), "99.5");
        it.price = 0.0;
        assert_eq!(it.price_display(), "0.0");
    }

    #[test]
    fn test_display() {
        let mut it = item("a", true);
        it.enrichment.inventory_quantity = 4;
        assert_eq!(it.to_string(), "Product a (Available) (Stock: 4) - delhi - ₹100.0");
    }
}
