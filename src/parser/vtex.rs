//! Parser for the VTEX catalog search shape.
//!
//! VTEX-powered stores (the Carrefour AR catalog among them) return product
//! items whose price is nested under the first listed SKU's first seller:
//! `items[0].sellers[0].commertialOffer.Price`. The misspelled
//! `commertialOffer` key is the platform's own field name.

use serde_json::Value;
use tracing::trace;

use super::{ItemParser, PriceRecord, utc_timestamp};

/// [`ItemParser`] for VTEX `catalog_system` search responses.
#[derive(Debug, Default, Clone)]
pub struct VtexCatalogParser;

impl VtexCatalogParser {
    /// Creates a new VTEX parser.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Walks to the first SKU's first seller's offer price.
    fn offer_price(item: &Value) -> Option<&Value> {
        item.get("items")?
            .get(0)?
            .get("sellers")?
            .get(0)?
            .get("commertialOffer")?
            .get("Price")
    }
}

impl ItemParser for VtexCatalogParser {
    fn name(&self) -> &str {
        "vtex"
    }

    fn parse_item(&self, item: &Value, category: &str) -> Option<PriceRecord> {
        let name = item.get("productName")?.as_str()?.trim();
        if name.is_empty() {
            trace!(category, "rejecting item with empty product name");
            return None;
        }

        let price = coerce_price(Self::offer_price(item)?)?;

        Some(PriceRecord {
            product_name: name.to_string(),
            price,
            source: category.to_string(),
            scraped_at: utc_timestamp(),
        })
    }
}

/// Coerces a JSON value to a finite, non-negative price.
///
/// The upstream sometimes serializes prices as strings; both number and
/// numeric-string forms are accepted.
fn coerce_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    (price.is_finite() && price >= 0.0).then_some(price)
}
