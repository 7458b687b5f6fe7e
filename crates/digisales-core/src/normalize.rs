//! # Record Normalizer
//!
//! Turns one raw row of the `seller-sells/v2` listing into a [`NewSale`].
//!
//! ## Pipeline Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rows: [ {..}, {..}, {..} ]   (JSON from the remote API)               │
//! │           │                                                             │
//! │           ▼  serde, lenient                                             │
//! │  RawSaleRow  (every field optional, numbers or strings accepted)       │
//! │           │                                                             │
//! │           ▼  normalize()  ← THIS MODULE                                 │
//! │  ┌────────┴─────────┐                                                   │
//! │  ▼                  ▼                                                   │
//! │  Ok(NewSale)     Err(RowFailure::Rejected)                              │
//! │  → persister     → collected, written to the sync log                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - Mandatory: `invoice_id`, `product_id`, `product_name`, `product_entry`
//!   and a parseable `date_put`.
//! - `date_pay` is optional, but a non-empty unparseable value rejects the row.
//! - Optional strings default to empty, amounts and `partner_id` to zero.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::types::{NewSale, RowFailure};
use crate::validation::{validate_invoice_id, validate_product_id, validate_required};
use crate::window::parse_remote_timestamp;

// =============================================================================
// Raw Row
// =============================================================================

/// One row exactly as the remote API sent it.
///
/// Field names follow the remote contract. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSaleRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub invoice_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub product_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub product_entry: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date_put: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date_pay: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub amount_in: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub amount_out: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount_currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub method_pay: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub aggregator: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub partner_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub lang: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    })
}

// =============================================================================
// Normalization
// =============================================================================

/// Validates and converts a raw row.
pub fn normalize(raw: &RawSaleRow) -> Result<NewSale, RowFailure> {
    let invoice_hint = raw
        .invoice_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let reject = |err| RowFailure::rejected(invoice_hint.clone(), err);

    let invoice_id = validate_required("invoice_id", raw.invoice_id.as_deref()).map_err(reject)?;
    validate_invoice_id(invoice_id).map_err(reject)?;

    let product_id = validate_required("product_id", raw.product_id.as_deref())
        .and_then(validate_product_id)
        .map_err(reject)?;

    let product_name =
        validate_required("product_name", raw.product_name.as_deref()).map_err(reject)?;

    validate_required("product_entry", raw.product_entry.as_deref()).map_err(reject)?;
    let product_entry = raw.product_entry.clone().unwrap_or_default();

    let date_put = validate_required("date_put", raw.date_put.as_deref())
        .and_then(|s| parse_remote_timestamp("date_put", s))
        .map_err(reject)?;

    let date_pay = match raw.date_pay.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Some(parse_remote_timestamp("date_pay", s).map_err(reject)?),
        _ => None,
    };

    let text = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or_default().to_string();

    Ok(NewSale {
        invoice_id: invoice_id.to_string(),
        product_id,
        product_name: product_name.to_string(),
        product_entry,
        date_put,
        date_pay,
        email: text(&raw.email),
        amount_in: raw.amount_in.unwrap_or(0.0),
        amount_out: raw.amount_out.unwrap_or(0.0),
        currency: text(&raw.amount_currency),
        payment_method: text(&raw.method_pay),
        aggregator: text(&raw.aggregator),
        ip: text(&raw.ip),
        partner_id: raw
            .partner_id
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0),
        lang: text(&raw.lang),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
