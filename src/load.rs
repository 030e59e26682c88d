//! Loader: full-refresh write of the transformed rows into `sales_data`

use serde::Serialize;
use std::path::Path;
use tracing::{error, info, instrument, warn};

use crate::constants::SALES_TABLE;
use crate::db::SalesDb;
use crate::error::{EtlError, Result};
use crate::metrics;
use crate::types::OrderRow;

/// What happened to the load; failures are reported here instead of propagated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LoadOutcome {
    Loaded {
        rows_written: usize,
        /// Post-commit `COUNT(*)`, `None` if that query failed
        table_rows: Option<i64>,
    },
    Failed {
        database_error: bool,
        message: String,
    },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }
}

/// Replace the contents of the sales table at `database` with `rows`.
///
/// Any error is rolled back, reported and turned into [`LoadOutcome::Failed`]. The
/// connection is closed before returning in every case.
#[instrument(skip_all, fields(rows = rows.len(), database = %database.display()))]
pub fn load_sales(database: &Path, rows: &[OrderRow]) -> LoadOutcome {
    let _timing = metrics::time_stage("load");

    let mut db = match SalesDb::open(database) {
        Ok(db) => db,
        Err(e) => return failed(e),
    };
    info!("Connected to {}", database.display());
    println!("Connected to the database successfully.");

    let outcome = match write_sales(&mut db, rows) {
        Ok((rows_written, table_rows)) => {
            metrics::record_loaded(rows_written);
            LoadOutcome::Loaded {
                rows_written,
                table_rows,
            }
        }
        Err(e) => failed(e),
    };

    if let Err(e) = db.close() {
        warn!("Closing the connection reported: {}", e);
    }
    println!("Connection closed.");

    outcome
}

fn write_sales(db: &mut SalesDb, rows: &[OrderRow]) -> Result<(usize, Option<i64>)> {
    db.ensure_schema()?;
    println!("Table '{SALES_TABLE}' is ready or already exists.");

    let written = db.replace_all(rows)?;
    info!("Replaced {} contents with {} rows", SALES_TABLE, written);
    println!("Data successfully inserted into the {SALES_TABLE} table.");
    println!("Transaction committed successfully.");

    Ok((written, report_table_rows(db)))
}

/// Count the table after commit. The load already succeeded, so a failure here is
/// only reported.
fn report_table_rows(db: &SalesDb) -> Option<i64> {
    match db.row_count() {
        Ok(count) => {
            println!("Total number of rows in the '{SALES_TABLE}' table: {count}");
            Some(count)
        }
        Err(e) => {
            warn!("Row count after load failed: {}", e);
            println!("Could not count rows in the '{SALES_TABLE}' table: {e}");
            None
        }
    }
}

fn failed(e: EtlError) -> LoadOutcome {
    metrics::record_load_failure();
    let database_error = e.is_database();
    let message = if database_error {
        format!("Database error occurred: {e}")
    } else {
        format!("An unexpected error occurred: {e}")
    };
    error!("{}", message);
    println!("{message}");
    LoadOutcome::Failed {
        database_error,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Region;
    use tempfile::tempdir;

    fn order(order_id: i64) -> OrderRow {
        OrderRow {
            order_id,
            order_item_id: Some(1),
            quantity_ordered: 2,
            item_price: 3.0,
            promotion_discount: 1.0,
            batch_id: Some(9),
            region: Region::A,
            total_sales: 6.0,
            net_sale: 5.0,
        }
    }

    #[test]
    fn test_load_reports_row_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sales.db");

        let outcome = load_sales(&path, &[order(1), order(2)]);
        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                rows_written: 2,
                table_rows: Some(2)
            }
        );
    }

    #[test]
    fn test_database_error_is_reported_not_raised() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sales.db");
        assert!(load_sales(&path, &[order(1)]).is_loaded());

        let outcome = load_sales(&path, &[order(5), order(5)]);
        match outcome {
            LoadOutcome::Failed {
                database_error,
                message,
            } => {
                assert!(database_error);
                assert!(message.starts_with("Database error occurred"));
            }
            other => panic!("expected failure, got {other:?}"),
        }

        // Rolled back: the previous load is still there
        let db = SalesDb::open(&path).unwrap();
        assert_eq!(db.fetch_all().unwrap(), vec![order(1)]);
    }

    #[test]
    fn test_unexpected_error_is_distinguished() {
        let dir = tempdir().unwrap();
        // A plain file where the parent directory should be
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"not a directory").unwrap();

        let outcome = load_sales(&blocked.join("sales.db"), &[order(1)]);
        match outcome {
            LoadOutcome::Failed {
                database_error,
                message,
            } => {
                assert!(!database_error);
                assert!(message.starts_with("An unexpected error occurred"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_row_count_failure_is_reported_as_none() {
        let dir = tempdir().unwrap();
        // Schema never created, so COUNT(*) has no table to read
        let db = SalesDb::open(dir.path().join("sales.db")).unwrap();
        assert_eq!(report_table_rows(&db), None);

        db.ensure_schema().unwrap();
        assert_eq!(report_table_rows(&db), Some(0));
    }
}
