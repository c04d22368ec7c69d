use serde::Deserialize;

/// Raw payload from a `retail`-format vendor.
///
/// Shape as observed on the wire:
/// `{"product_id": "ABC123", "availability": "IN_STOCK",
///   "inventory_count": 15, "unit_price": 18.5,
///   "last_updated": "2026-08-22T10:30:00Z"}`
#[derive(Debug, Clone, Deserialize)]
pub struct RetailPayload {
    pub product_id: String,
    /// `"IN_STOCK"` or `"OUT_OF_STOCK"`. Only an exact `"OUT_OF_STOCK"`
    /// zeroes the stock; unknown markers read as in stock.
    pub availability: String,
    /// Absent when the vendor knows it has stock but not the count.
    #[serde(default)]
    pub inventory_count: Option<i64>,
    pub unit_price: f64,
    /// ISO-8601, with or without an explicit offset.
    pub last_updated: String,
}

/// Raw payload from a `warehouse`-format vendor.
///
/// Shape as observed on the wire:
/// `{"sku": "ABC123", "stock_status": "AVAILABLE", "quantity_on_hand": 10,
///   "cost_per_unit": "$19.99", "timestamp": 1755856200}`
#[derive(Debug, Clone, Deserialize)]
pub struct WarehousePayload {
    pub sku: String,
    /// `"AVAILABLE"` or `"UNAVAILABLE"`; anything else reads as unavailable.
    pub stock_status: String,
    pub quantity_on_hand: i64,
    /// Price with a leading currency symbol, e.g. `"$19.99"`.
    pub cost_per_unit: String,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Raw payload from a `legacy`-format vendor.
///
/// Shape as observed on the wire:
/// `{"item_code": "ABC123", "status": "ACTIVE", "stock_level": "LOW",
///   "price_amount": 17.75, "data_timestamp": "2026-08-22 10:30:00"}`
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyPayload {
    pub item_code: String,
    /// `"ACTIVE"` or `"INACTIVE"`; anything else reads as inactive.
    pub status: String,
    /// A numeric string, `"LOW"`, `"HIGH"`, or absent.
    #[serde(default)]
    pub stock_level: Option<String>,
    #[serde(default)]
    pub price_amount: Option<f64>,
    /// `"YYYY-MM-DD HH:MM:SS"`, no offset.
    pub data_timestamp: String,
}

/// A vendor response parsed into its declared schema. Which variant to
/// expect comes from the roster, never from sniffing the body.
#[derive(Debug, Clone)]
pub enum VendorPayload {
    Retail(RetailPayload),
    Warehouse(WarehousePayload),
    Legacy(LegacyPayload),
}

impl VendorPayload {
    /// The SKU the payload itself claims to describe.
    #[must_use]
    pub fn sku(&self) -> &str {
        match self {
            VendorPayload::Retail(raw) => &raw.product_id,
            VendorPayload::Warehouse(raw) => &raw.sku,
            VendorPayload::Legacy(raw) => &raw.item_code,
        }
    }
}
