/// Default input, output and table names used when no config overrides them

// Regional exports read by the extractor
pub const REGION_A_SOURCE: &str = "order_region_a.xlsx";
pub const REGION_B_SOURCE: &str = "order_region_b.xlsx";

// SQLite file and the table the loader owns
pub const DATABASE_PATH: &str = "sales_database.db";
pub const SALES_TABLE: &str = "sales_data";

pub const CONFIG_PATH: &str = "etl.toml";

// Source headers as they appear in the regional exports
pub const ORDER_ID_HEADER: &str = "OrderId";
pub const ORDER_ITEM_ID_HEADER: &str = "OrderItemId";
pub const QUANTITY_ORDERED_HEADER: &str = "QuantityOrdered";
pub const ITEM_PRICE_HEADER: &str = "ItemPrice";
pub const PROMOTION_DISCOUNT_HEADER: &str = "PromotionDiscount";
pub const BATCH_ID_HEADER: &str = "batch_id";

/// Key inside the promotion discount JSON that carries the amount
pub const DISCOUNT_AMOUNT_KEY: &str = "Amount";

/// Reduce a header to a comparable form: lowercase with `_`, `-` and spaces removed.
///
/// `OrderId`, `order_id` and `Order Id` all normalize to `orderid`.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' ' | '\t'))
        .flat_map(char::to_lowercase)
        .collect()
}
