//! Rendering products as customer-facing text

use serde_json::Value;

use super::store::{ProductRecord, Record};

/// Ready-made discount wording added to rows sent for narration.
pub const DISCOUNT_TEXT_KEY: &str = "discount_text";

/// Reply for a query that matched no rows.
pub const NO_MATCHING_PRODUCTS: &str =
    "Sorry, I couldn't find any products matching your request.";

/// `0.35` → `"35 percent off"`; `None` for no discount.
pub fn discount_phrase(discount: f64) -> Option<String> {
    let percent = (discount * 100.0).round() as i64;
    if percent <= 0 {
        return None;
    }
    Some(format!("{} percent off", percent))
}

/// One numbered line: `1. Title: Rs. 1104 (35 percent off), Rating: 4.4 <link>`.
pub fn product_line(position: usize, product: &ProductRecord) -> String {
    let discount = discount_phrase(product.discount)
        .map(|d| format!(" ({})", d))
        .unwrap_or_default();

    format!(
        "{}. {}: Rs. {}{}, Rating: {} {}",
        position, product.title, product.price, discount, product.avg_rating, product.product_link
    )
}

/// Copy of `rows` where each positive `discount` also gets its wording.
pub fn with_discount_text(rows: &[Record]) -> Vec<Record> {
    rows.iter()
        .cloned()
        .map(|mut row| {
            if let Some(phrase) = row
                .get("discount")
                .and_then(Value::as_f64)
                .and_then(discount_phrase)
            {
                row.insert(DISCOUNT_TEXT_KEY.to_string(), Value::String(phrase));
            }
            row
        })
        .collect()
}

pub fn render_product_list(products: &[ProductRecord]) -> String {
    if products.is_empty() {
        return NO_MATCHING_PRODUCTS.to_string();
    }

    products
        .iter()
        .enumerate()
        .map(|(i, p)| product_line(i + 1, p))
        .collect::<Vec<_>>()
        .join("\n")
}
