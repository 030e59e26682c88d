//! Transformer: merge, dedup, derive and filter
//!
//! Steps run in a fixed order. Dedup happens before any derived column exists so the
//! surviving row for an order is always the first one seen across region A then B.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

use crate::constants::DISCOUNT_AMOUNT_KEY;
use crate::metrics;
use crate::types::{OrderRow, RowSet, SourceRow};

/// Row counts after each transformation step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransformSummary {
    pub combined_rows: usize,
    pub deduplicated_rows: usize,
    pub retained_rows: usize,
}

impl TransformSummary {
    pub fn duplicates_dropped(&self) -> usize {
        self.combined_rows - self.deduplicated_rows
    }

    pub fn non_positive_dropped(&self) -> usize {
        self.deduplicated_rows - self.retained_rows
    }
}

/// Union of both row-sets, region A rows first.
pub fn concatenate(region_a: RowSet, region_b: RowSet) -> RowSet {
    let mut combined = region_a;
    combined.extend(region_b);
    combined
}

/// Keep the first row for each `order_id`, preserving order.
pub fn dedup_by_order_id(rows: RowSet) -> RowSet {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| seen.insert(row.order_id))
        .collect()
}

/// Amount carried by a promotion discount cell, `0.0` whenever it cannot be read.
///
/// The cell must hold a JSON object with an `Amount` key whose value is a number or
/// a string containing a number. Every other shape resolves to zero.
pub fn parse_discount(raw: Option<&str>) -> f64 {
    raw.and_then(discount_amount).unwrap_or(0.0)
}

fn discount_amount(raw: &str) -> Option<f64> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let amount = match value.get(DISCOUNT_AMOUNT_KEY)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    amount.is_finite().then_some(amount)
}

/// Add `total_sales`, `promotion_discount` and `net_sale` to an extracted row.
pub fn derive_sales(row: SourceRow) -> OrderRow {
    let total_sales = row.quantity_ordered as f64 * row.item_price;
    let promotion_discount = parse_discount(row.promotion_discount_raw.as_deref());

    OrderRow {
        order_id: row.order_id,
        order_item_id: row.order_item_id,
        quantity_ordered: row.quantity_ordered,
        item_price: row.item_price,
        promotion_discount,
        batch_id: row.batch_id,
        region: row.region,
        total_sales,
        net_sale: total_sales - promotion_discount,
    }
}

/// Drop rows whose net sale is zero or negative.
pub fn retain_positive_net_sales(rows: Vec<OrderRow>) -> Vec<OrderRow> {
    rows.into_iter().filter(|row| row.net_sale > 0.0).collect()
}

/// Run every transformation step over the two extracted row-sets.
#[instrument(skip_all, fields(region_a = region_a.len(), region_b = region_b.len()))]
pub fn transform(region_a: RowSet, region_b: RowSet) -> (Vec<OrderRow>, TransformSummary) {
    let _timing = metrics::time_stage("transform");

    let combined = concatenate(region_a, region_b);
    let combined_rows = combined.len();
    println!("The count of combined data: {combined_rows} rows");

    let unique = dedup_by_order_id(combined);
    let deduplicated_rows = unique.len();
    println!("After removing duplicates the count of combined data: {deduplicated_rows} rows");

    let derived: Vec<OrderRow> = unique.into_iter().map(derive_sales).collect();
    let retained = retain_positive_net_sales(derived);

    let summary = TransformSummary {
        combined_rows,
        deduplicated_rows,
        retained_rows: retained.len(),
    };

    debug!(
        "Dropped {} duplicate and {} non-positive rows",
        summary.duplicates_dropped(),
        summary.non_positive_dropped()
    );
    metrics::record_deduplicated(summary.duplicates_dropped());
    metrics::record_filtered(summary.non_positive_dropped());
    info!(
        combined = summary.combined_rows,
        deduplicated = summary.deduplicated_rows,
        retained = summary.retained_rows,
        "Transformed order rows"
    );
    println!("Rows with a positive net sale: {}", summary.retained_rows);

    (retained, summary)
}
