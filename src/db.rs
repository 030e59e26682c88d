use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, Transaction};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::constants::SALES_TABLE;
use crate::error::Result;
use crate::types::{OrderRow, Region};

fn create_sales_table_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {SALES_TABLE} (
            order_id           INTEGER PRIMARY KEY,
            order_item_id      INTEGER,
            quantity_ordered   INTEGER,
            item_price         REAL,
            promotion_discount REAL,
            batch_id           INTEGER,
            region             CHARACTER(1),
            total_sales        REAL,
            net_sale           REAL
        );"
    )
}

fn insert_sales_row_sql() -> String {
    format!(
        "INSERT INTO {SALES_TABLE} (
            order_id, order_item_id, quantity_ordered, item_price, promotion_discount,
            batch_id, region, total_sales, net_sale
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
    )
}

/// Summed `total_sales` for one region value found in the table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSales {
    pub region: String,
    pub total_sales: f64,
}

/// An `order_id` stored more than once
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateOrder {
    pub order_id: i64,
    pub occurrences: i64,
}

/// Connection to the SQLite file holding the `sales_data` table
pub struct SalesDb {
    conn: Connection,
}

impl SalesDb {
    /// Open (creating if needed) the database file for writing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!("Opened {} for writing", path.display());
        Ok(Self { conn })
    }

    /// Open an existing database file without write access.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    pub fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(&create_sales_table_sql())?;
        Ok(())
    }

    /// Replace the whole table content with `rows` in a single transaction.
    ///
    /// Nothing is changed unless every row is written; on failure the transaction
    /// is rolled back before the error is returned.
    pub fn replace_all(&mut self, rows: &[OrderRow]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        match write_rows(&tx, rows) {
            Ok(written) => {
                tx.commit()?;
                Ok(written)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!("Rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    pub fn row_count(&self) -> Result<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {SALES_TABLE}"),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn sales_by_region(&self) -> Result<Vec<RegionSales>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT region, SUM(total_sales) FROM {SALES_TABLE} GROUP BY region ORDER BY region"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(RegionSales {
                region: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                total_sales: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Mean `total_sales` per row; `None` when the table is empty.
    pub fn average_sale(&self) -> Result<Option<f64>> {
        let avg = self.conn.query_row(
            &format!("SELECT AVG(total_sales) FROM {SALES_TABLE}"),
            [],
            |row| row.get(0),
        )?;
        Ok(avg)
    }

    pub fn duplicate_order_ids(&self) -> Result<Vec<DuplicateOrder>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT order_id, COUNT(*) FROM {SALES_TABLE}
             GROUP BY order_id HAVING COUNT(*) > 1 ORDER BY order_id"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(DuplicateOrder {
                order_id: row.get(0)?,
                occurrences: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Every stored row ordered by `order_id`.
    pub fn fetch_all(&self) -> Result<Vec<OrderRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT order_id, order_item_id, quantity_ordered, item_price, promotion_discount,
                    batch_id, region, total_sales, net_sale
             FROM {SALES_TABLE} ORDER BY order_id"
        ))?;
        let rows = stmt.query_map([], |row| {
            let region: String = row.get(6)?;
            let region = Region::parse(&region).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    6,
                    Type::Text,
                    format!("unknown region '{region}'").into(),
                )
            })?;
            Ok(OrderRow {
                order_id: row.get(0)?,
                order_item_id: row.get(1)?,
                quantity_ordered: row.get(2)?,
                item_price: row.get(3)?,
                promotion_discount: row.get(4)?,
                batch_id: row.get(5)?,
                region,
                total_sales: row.get(7)?,
                net_sale: row.get(8)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Close the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e)?;
        Ok(())
    }
}

fn write_rows(tx: &Transaction<'_>, rows: &[OrderRow]) -> Result<usize> {
    tx.execute(&format!("DELETE FROM {SALES_TABLE}"), [])?;

    let mut stmt = tx.prepare(&insert_sales_row_sql())?;
    for row in rows {
        stmt.execute(params![
            row.order_id,
            row.order_item_id,
            row.quantity_ordered,
            row.item_price,
            row.promotion_discount,
            row.batch_id,
            row.region.as_str(),
            row.total_sales,
            row.net_sale,
        ])?;
    }
    Ok(rows.len())
}
