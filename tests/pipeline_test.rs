use anyhow::Result;
use rust_xlsxwriter::Workbook;
use sales_etl::config::{DatabaseConfig, EtlConfig, SourcesConfig};
use sales_etl::db::SalesDb;
use sales_etl::error::EtlError;
use sales_etl::load::LoadOutcome;
use sales_etl::pipeline::Pipeline;
use sales_etl::types::Region;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// (OrderId, OrderItemId, QuantityOrdered, ItemPrice, PromotionDiscount, batch_id)
type Line<'a> = (i64, i64, i64, f64, Option<&'a str>, i64);

fn write_export(path: &Path, lines: &[Line<'_>]) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let headers = [
        "OrderId",
        "OrderItemId",
        "QuantityOrdered",
        "ItemPrice",
        "PromotionDiscount",
        "batch_id",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }
    for (i, (order_id, item_id, quantity, price, discount, batch)) in lines.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_number(row, 0, *order_id as f64)?;
        sheet.write_number(row, 1, *item_id as f64)?;
        sheet.write_number(row, 2, *quantity as f64)?;
        sheet.write_number(row, 3, *price)?;
        if let Some(discount) = discount {
            sheet.write_string(row, 4, *discount)?;
        }
        sheet.write_number(row, 5, *batch as f64)?;
    }
    workbook.save(path)?;
    Ok(())
}

fn pipeline(dir: &Path) -> (Pipeline, PathBuf) {
    let database = dir.join("sales_database.db");
    let config = EtlConfig {
        sources: SourcesConfig {
            region_a: dir.join("order_region_a.xlsx"),
            region_b: dir.join("order_region_b.xlsx"),
        },
        database: DatabaseConfig {
            path: database.clone(),
        },
    };
    (Pipeline::new(config), database)
}

#[test]
fn test_full_run_over_spreadsheets() -> Result<()> {
    let dir = tempdir()?;
    write_export(
        &dir.path().join("order_region_a.xlsx"),
        &[
            (1, 11, 2, 10.0, Some(r#"{"Amount":"3"}"#), 100),
            (2, 21, 1, 5.0, Some("{}"), 100),
            (3, 31, 5, 0.0, Some("{}"), 100),
        ],
    )?;
    write_export(
        &dir.path().join("order_region_b.xlsx"),
        &[
            (1, 12, 5, 1.0, None, 200),
            (4, 41, 3, 2.5, Some("not json"), 200),
        ],
    )?;

    let (pipeline, database) = pipeline(dir.path());
    let result = pipeline.run()?;

    assert_eq!(result.region_a_rows, 3);
    assert_eq!(result.region_b_rows, 2);
    assert_eq!(result.transform.duplicates_dropped(), 1);
    assert_eq!(result.transform.non_positive_dropped(), 1);
    assert_eq!(
        result.load,
        LoadOutcome::Loaded {
            rows_written: 3,
            table_rows: Some(3)
        }
    );

    let rows = SalesDb::open_read_only(&database)?.fetch_all()?;
    let ids: Vec<i64> = rows.iter().map(|r| r.order_id).collect();
    assert_eq!(ids, vec![1, 2, 4]);

    let first = &rows[0];
    assert_eq!(first.region, Region::A);
    assert_eq!(first.order_item_id, Some(11));
    assert_eq!(first.batch_id, Some(100));
    assert_eq!(first.total_sales, 20.0);
    assert_eq!(first.promotion_discount, 3.0);
    assert_eq!(first.net_sale, 17.0);
    assert!(rows.iter().all(|r| r.net_sale > 0.0));

    let report = result.validation.expect("validation should run");
    assert_eq!(report.total_records, 3);
    let totals: Vec<(String, f64)> = report
        .sales_by_region
        .iter()
        .map(|r| (r.region.clone(), r.total_sales))
        .collect();
    assert_eq!(totals, vec![("A".to_string(), 25.0), ("B".to_string(), 7.5)]);
    let avg = report.average_sale.expect("table is not empty");
    assert!((avg - 32.5 / 3.0).abs() < 1e-9);
    assert!(report.duplicate_orders.is_empty());
    Ok(())
}

#[test]
fn test_rerun_replaces_previous_contents() -> Result<()> {
    let dir = tempdir()?;
    let a = dir.path().join("order_region_a.xlsx");
    let b = dir.path().join("order_region_b.xlsx");
    let (pipeline, database) = pipeline(dir.path());

    write_export(&a, &[(1, 1, 1, 1.0, None, 1), (2, 1, 1, 1.0, None, 1)])?;
    write_export(&b, &[(3, 1, 1, 1.0, None, 1)])?;
    pipeline.run()?;

    write_export(&a, &[(10, 1, 2, 2.0, None, 2)])?;
    write_export(&b, &[])?;
    let result = pipeline.run()?;
    assert!(result.load.is_loaded());

    let rows = SalesDb::open_read_only(&database)?.fetch_all()?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].order_id, 10);
    assert_eq!(rows[0].total_sales, 4.0);
    Ok(())
}

#[test]
fn test_extraction_failure_leaves_table_untouched() -> Result<()> {
    let dir = tempdir()?;
    let a = dir.path().join("order_region_a.xlsx");
    let b = dir.path().join("order_region_b.xlsx");
    let (pipeline, database) = pipeline(dir.path());

    write_export(&a, &[(1, 1, 3, 1.0, None, 1)])?;
    write_export(&b, &[(2, 1, 3, 1.0, None, 1)])?;
    pipeline.run()?;

    std::fs::remove_file(&b)?;
    let err = pipeline.run().unwrap_err();
    assert!(matches!(err, EtlError::Spreadsheet(_)));

    let rows = SalesDb::open_read_only(&database)?.fetch_all()?;
    let ids: Vec<i64> = rows.iter().map(|r| r.order_id).collect();
    assert_eq!(ids, vec![1, 2]);
    Ok(())
}

#[test]
fn test_mixed_formats_with_csv_source() -> Result<()> {
    let dir = tempdir()?;
    let a = dir.path().join("order_region_a.xlsx");
    let b = dir.path().join("order_region_b.csv");
    write_export(&a, &[(1, 1, 1, 4.0, Some(r#"{"Amount": 1.5}"#), 1)])?;
    std::fs::write(
        &b,
        "OrderId,OrderItemId,QuantityOrdered,ItemPrice,PromotionDiscount,batch_id\n2,1,2,3,,5\n",
    )?;

    let database = dir.path().join("sales.db");
    let config = EtlConfig {
        sources: SourcesConfig {
            region_a: a,
            region_b: b,
        },
        database: DatabaseConfig {
            path: database.clone(),
        },
    };
    let result = Pipeline::new(config).run()?;
    assert_eq!(result.transform.retained_rows, 2);

    let rows = SalesDb::open_read_only(&database)?.fetch_all()?;
    assert_eq!(rows[0].net_sale, 2.5);
    assert_eq!(rows[1].region, Region::B);
    assert_eq!(rows[1].net_sale, 6.0);
    Ok(())
}
