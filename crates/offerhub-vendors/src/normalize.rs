use chrono::{DateTime, NaiveDateTime, Utc};
use offerhub_core::{NormalizedOffer, VendorFormat};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::error::VendorError;
use crate::types::{LegacyPayload, RetailPayload, VendorPayload, WarehousePayload};

/// Stock assumed for a retail vendor that reports "in stock" without a count.
const IN_STOCK_DEFAULT_COUNT: u32 = 5;
/// Stock estimates for legacy vendors that report `"LOW"`/`"HIGH"` instead of
/// a number.
const LOW_STOCK_ESTIMATE: u32 = 3;
const HIGH_STOCK_ESTIMATE: u32 = 25;

/// Parse a raw response body into the schema the roster declares for the
/// vendor.
///
/// # Errors
///
/// Returns [`VendorError::Deserialize`] when the body does not match the
/// declared schema. That counts as a failed call; field-level garbage inside
/// a well-formed body is handled by [`normalize`] instead.
pub fn parse_payload(format: VendorFormat, body: &str) -> Result<VendorPayload, VendorError> {
    match format {
        VendorFormat::Retail => serde_json::from_str::<RetailPayload>(body)
            .map(VendorPayload::Retail)
            .map_err(|e| VendorError::deserialize("retail payload", e)),
        VendorFormat::Warehouse => serde_json::from_str::<WarehousePayload>(body)
            .map(VendorPayload::Warehouse)
            .map_err(|e| VendorError::deserialize("warehouse payload", e)),
        VendorFormat::Legacy => serde_json::from_str::<LegacyPayload>(body)
            .map(VendorPayload::Legacy)
            .map_err(|e| VendorError::deserialize("legacy payload", e)),
    }
}

/// Reduce a parsed vendor payload to the normalized offer model.
///
/// Pure and total: the same payload with the same `now` always yields the
/// same offer, and nothing a vendor sends inside a well-formed payload can
/// make it fail. Garbage degrades to zero stock, zero price, or a stale
/// `observed_at`, all of which the selection filters drop.
#[must_use]
pub fn normalize(
    vendor_id: &str,
    payload: &VendorPayload,
    now: DateTime<Utc>,
    freshness_window: chrono::Duration,
) -> NormalizedOffer {
    match payload {
        VendorPayload::Retail(raw) => normalize_retail(vendor_id, raw, now, freshness_window),
        VendorPayload::Warehouse(raw) => normalize_warehouse(vendor_id, raw, now, freshness_window),
        VendorPayload::Legacy(raw) => normalize_legacy(vendor_id, raw, now, freshness_window),
    }
}

fn normalize_retail(
    vendor_id: &str,
    raw: &RetailPayload,
    now: DateTime<Utc>,
    freshness_window: chrono::Duration,
) -> NormalizedOffer {
    let stock = if raw.availability == "OUT_OF_STOCK" {
        0
    } else {
        raw.inventory_count
            .map_or(IN_STOCK_DEFAULT_COUNT, clamp_stock)
    };

    let price = sanitize_price(Decimal::from_f64(raw.unit_price).unwrap_or(Decimal::ZERO));
    let observed_at = parse_iso8601(&raw.last_updated).unwrap_or(DateTime::UNIX_EPOCH);

    build_offer(
        &raw.product_id,
        vendor_id,
        stock,
        price,
        observed_at,
        now,
        freshness_window,
    )
}

fn normalize_warehouse(
    vendor_id: &str,
    raw: &WarehousePayload,
    now: DateTime<Utc>,
    freshness_window: chrono::Duration,
) -> NormalizedOffer {
    let stock = if raw.stock_status == "AVAILABLE" {
        clamp_stock(raw.quantity_on_hand)
    } else {
        0
    };

    let price = parse_currency(&raw.cost_per_unit);
    let observed_at = DateTime::from_timestamp(raw.timestamp, 0).unwrap_or(DateTime::UNIX_EPOCH);

    build_offer(
        &raw.sku,
        vendor_id,
        stock,
        price,
        observed_at,
        now,
        freshness_window,
    )
}

fn normalize_legacy(
    vendor_id: &str,
    raw: &LegacyPayload,
    now: DateTime<Utc>,
    freshness_window: chrono::Duration,
) -> NormalizedOffer {
    let stock = if raw.status == "ACTIVE" {
        raw.stock_level.as_deref().map_or(0, parse_stock_level)
    } else {
        0
    };

    let price = sanitize_price(
        raw.price_amount
            .and_then(Decimal::from_f64)
            .unwrap_or(Decimal::ZERO),
    );
    let observed_at = parse_naive_datetime(&raw.data_timestamp).unwrap_or(DateTime::UNIX_EPOCH);

    build_offer(
        &raw.item_code,
        vendor_id,
        stock,
        price,
        observed_at,
        now,
        freshness_window,
    )
}

fn build_offer(
    sku: &str,
    vendor_id: &str,
    stock: u32,
    price: Decimal,
    observed_at: DateTime<Utc>,
    now: DateTime<Utc>,
    freshness_window: chrono::Duration,
) -> NormalizedOffer {
    let fresh = now.signed_duration_since(observed_at) <= freshness_window;
    NormalizedOffer {
        sku: sku.to_string(),
        vendor_id: vendor_id.to_string(),
        stock,
        price,
        observed_at,
        valid: price > Decimal::ZERO && fresh,
    }
}

/// A legacy `stock_level` string: a plain number, `"LOW"`, `"HIGH"`, or
/// anything else (which reads as none left).
fn parse_stock_level(level: &str) -> u32 {
    if let Ok(count) = level.trim().parse::<u32>() {
        return count;
    }
    match level {
        "LOW" => LOW_STOCK_ESTIMATE,
        "HIGH" => HIGH_STOCK_ESTIMATE,
        _ => 0,
    }
}

/// Price from a `"$19.99"`-style string; unparseable values read as zero,
/// which marks the offer invalid downstream.
fn parse_currency(raw: &str) -> Decimal {
    raw.trim()
        .trim_start_matches('$')
        .trim()
        .parse::<Decimal>()
        .map_or(Decimal::ZERO, sanitize_price)
}

fn sanitize_price(price: Decimal) -> Decimal {
    if price.is_sign_negative() {
        Decimal::ZERO
    } else {
        price
    }
}

fn clamp_stock(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}

/// ISO-8601 with an offset (`2026-08-22T10:30:00Z`) or without
/// (`2026-08-22T10:30:00`); offset-less values are read as UTC.
fn parse_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// `"YYYY-MM-DD HH:MM:SS"`, read as UTC.
fn parse_naive_datetime(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
