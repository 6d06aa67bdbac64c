//! HTML message rendering for notifications.

use html_escape::encode_text;

use crate::domain::Item;

pub const HEADER_REPORT: &str = "📊 Product Status Report";
pub const HEADER_NEW: &str = "🎉 New Products Available!";
const SEPARATOR_WIDTH: usize = 25;
const POPULAR_THRESHOLD: i64 = 10_000;

/// Items that make it into a message: everything in force mode, otherwise
/// only available ones.
pub fn selected(items: &[Item], force_all: bool) -> Vec<&Item> {
    items
        .iter()
        .filter(|item| force_all || item.available)
        .collect()
}

/// Render one item as an indented block
pub fn render_item(item: &Item) -> String {
    let mut out = format!("• {}\n", encode_text(&item.name));

    let status = if item.available {
        "✅ Available"
    } else {
        "❌ Unavailable"
    };
    out.push_str(&format!("  Status: {}\n", status));
    out.push_str(&format!("  Price: ₹{}\n", item.price_display()));

    if let Some((amount, pct)) = item.discount() {
        out.push_str(&format!("  💰 Save ₹{:.0} ({:.0}% off)\n", amount, pct));
    }

    let e = &item.enrichment;
    if e.inventory_quantity > 0 {
        out.push_str(&format!("  Stock: {} units\n", e.inventory_quantity));
    }
    if item.is_low_stock() {
        out.push_str("  ⚠️ Low Stock!\n");
    }
    if let Some(weight) = item.weight_display() {
        out.push_str(&format!("  Weight: {}\n", weight));
    }

    match e.product_type.to_lowercase().as_str() {
        "bestseller" => out.push_str("  🏆 Bestseller\n"),
        "new" => out.push_str("  🆕 New Product\n"),
        _ => {}
    }

    if e.total_order_count > POPULAR_THRESHOLD {
        out.push_str(&format!(
            "  🔥 Popular ({} orders)\n",
            group_thousands(e.total_order_count)
        ));
    }

    out.push_str(&format!("  Link: {}\n", encode_text(&item.url)));
    out
}

/// Full message body for a batch of items.
///
/// Returns `None` when nothing qualifies for the message.
pub fn render_message(items: &[Item], force_all: bool, footer: Option<&str>) -> Option<String> {
    let selected = selected(items, force_all);
    if selected.is_empty() {
        return None;
    }

    let header = if force_all { HEADER_REPORT } else { HEADER_NEW };
    let mut message = format!("{}\n\n", header);
    for item in selected {
        message.push_str(&render_item(item));
        message.push('\n');
    }

    message.push_str(&"─".repeat(SEPARATOR_WIDTH));
    if let Some(footer) = footer.map(str::trim).filter(|f| !f.is_empty()) {
        message.push('\n');
        message.push_str(&encode_text(footer));
    }

    Some(message)
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
