use offerhub_core::{AvailabilityStatus, NormalizedOffer, SelectionResult};
use rust_decimal::Decimal;

/// Pick the winning offer for `sku` out of one fan-out's offers.
///
/// The baseline is the cheapest sellable offer. A pricier offer displaces it
/// only when it clears the premium threshold AND carries more stock; the
/// first such offer in ascending price order wins. With no sellable offers
/// the result is OUT_OF_STOCK, still reporting how many vendors answered.
#[must_use]
pub fn select(
    sku: &str,
    offers: &[NormalizedOffer],
    premium_threshold: Decimal,
) -> SelectionResult {
    let vendors_checked = offers.len();

    let mut sellable: Vec<&NormalizedOffer> = offers
        .iter()
        .filter(|offer| offer.valid && offer.stock > 0)
        .collect();
    if sellable.is_empty() {
        return SelectionResult::out_of_stock(sku, vendors_checked);
    }

    // Stable sort: equal prices keep their arrival order, which fixes the
    // tie-break policy exactly.
    sellable.sort_by(|a, b| a.price.cmp(&b.price));
    let baseline = sellable[0];

    let winner = sellable[1..]
        .iter()
        .find(|offer| {
            exceeds_premium(baseline.price, offer.price, premium_threshold)
                && offer.stock > baseline.stock
        })
        .copied()
        .unwrap_or(baseline);

    SelectionResult {
        sku: sku.to_string(),
        best_vendor: Some(winner.vendor_id.clone()),
        price: Some(winner.price),
        stock: Some(winner.stock),
        status: AvailabilityStatus::Available,
        vendors_checked,
        cache_hit: false,
    }
}

/// True when `price` sits more than `threshold` (a fraction of the baseline)
/// above `baseline`. Exact decimal arithmetic, strict comparison: a premium
/// of exactly the threshold does not count.
fn exceeds_premium(baseline: Decimal, price: Decimal, threshold: Decimal) -> bool {
    price - baseline > threshold * baseline
}

#[cfg(test)]
#[path = "selection_test.rs"]
mod tests;
