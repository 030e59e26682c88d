//! Validator: read-only reporting queries over the loaded sales table

use serde::Serialize;
use std::path::Path;
use tracing::{error, info, instrument, warn};

use crate::db::{DuplicateOrder, RegionSales, SalesDb};
use crate::error::Result;
use crate::metrics;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub total_records: i64,
    pub sales_by_region: Vec<RegionSales>,
    /// `None` when the table holds no rows
    pub average_sale: Option<f64>,
    pub duplicate_orders: Vec<DuplicateOrder>,
}

/// Run the four validation queries against the table in `database`.
///
/// Each result is printed as soon as its query completes, so a failure part way
/// through still leaves the earlier results on the console.
#[instrument(skip_all, fields(database = %database.display()))]
pub fn validate_sales(database: &Path) -> Result<ValidationReport> {
    let _timing = metrics::time_stage("validate");
    let db = SalesDb::open_read_only(database)?;
    let report = run_queries(&db);
    if let Err(e) = db.close() {
        warn!("Closing the validation connection reported: {}", e);
    }
    report
}

/// Like [`validate_sales`], but failures are reported and swallowed.
pub fn run_validation(database: &Path) -> Option<ValidationReport> {
    match validate_sales(database) {
        Ok(report) => {
            info!(
                total_records = report.total_records,
                duplicates = report.duplicate_orders.len(),
                "Validation finished"
            );
            Some(report)
        }
        Err(e) => {
            metrics::record_validation_failure();
            let message = if e.is_database() {
                format!("SQLite error occurred: {e}")
            } else {
                format!("An error occurred: {e}")
            };
            error!("{}", message);
            println!("{message}");
            None
        }
    }
}

fn run_queries(db: &SalesDb) -> Result<ValidationReport> {
    let total_records = db.row_count()?;
    println!("Total number of records: {total_records}");

    let sales_by_region = db.sales_by_region()?;
    println!("Total Sales Amount by Region:");
    for entry in &sales_by_region {
        println!("Region: {}, Total Sales: {}", entry.region, entry.total_sales);
    }

    let average_sale = db.average_sale()?;
    match average_sale {
        Some(avg) => println!("Average Sales Amount per Transaction: {avg}"),
        None => println!("Average Sales Amount per Transaction: none"),
    }

    let duplicate_orders = db.duplicate_order_ids()?;
    if duplicate_orders.is_empty() {
        println!("No duplicate OrderIds found.");
    } else {
        println!("Duplicate OrderIds found:");
        for dup in &duplicate_orders {
            println!("OrderId: {}, Occurrences: {}", dup.order_id, dup.occurrences);
        }
    }

    Ok(ValidationReport {
        total_records,
        sales_by_region,
        average_sale,
        duplicate_orders,
    })
}
