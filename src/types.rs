use serde::{Deserialize, Serialize};
use std::fmt;

/// Region label assigned from which export a row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    A,
    B,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::A => "A",
            Region::B => "B",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "A" => Some(Region::A),
            "B" => Some(Region::B),
            _ => None,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order line as extracted from a regional export, before any derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    pub order_id: i64,
    pub order_item_id: Option<i64>,
    pub quantity_ordered: i64,
    pub item_price: f64,
    /// JSON text of the promotion cell; `None` when the cell was not text
    pub promotion_discount_raw: Option<String>,
    pub batch_id: Option<i64>,
    pub region: Region,
}

/// Order line with derived sales columns, ready for the sales table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRow {
    pub order_id: i64,
    pub order_item_id: Option<i64>,
    pub quantity_ordered: i64,
    pub item_price: f64,
    pub promotion_discount: f64,
    pub batch_id: Option<i64>,
    pub region: Region,
    pub total_sales: f64,
    pub net_sale: f64,
}

/// Ordered collection of extracted rows from one source
pub type RowSet = Vec<SourceRow>;
