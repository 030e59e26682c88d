//! Extractor: reads the regional exports into tagged row-sets
//!
//! Spreadsheets (`.xlsx`, `.xlsm`, `.xls`, `.xlsb`, `.ods`) are read with calamine
//! from their first worksheet; `.csv` exports go through the csv crate. Both are
//! reduced to a header row plus loosely typed cells before typed rows are built.

use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::constants::{
    normalize_header, BATCH_ID_HEADER, ITEM_PRICE_HEADER, ORDER_ID_HEADER, ORDER_ITEM_ID_HEADER,
    PROMOTION_DISCOUNT_HEADER, QUANTITY_ORDERED_HEADER,
};
use crate::error::{EtlError, Result};
use crate::metrics;
use crate::types::{Region, RowSet, SourceRow};

/// Loosely typed cell shared by the spreadsheet and CSV readers
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Other(String),
}

impl Cell {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Float(*f),
            Data::String(s) => Cell::Text(s.clone()),
            Data::Bool(b) => Cell::Bool(*b),
            other => Cell::Other(format!("{other:?}")),
        }
    }

    fn from_text(field: &str) -> Self {
        if field.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(field.to_string())
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn display(&self) -> String {
        match self {
            Cell::Empty => "<blank>".to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Text(s) => format!("{s:?}"),
            Cell::Bool(b) => b.to_string(),
            Cell::Other(s) => s.clone(),
        }
    }

    /// `Ok(None)` for blank cells, `Err(())` for values that are not integers.
    fn as_int(&self) -> std::result::Result<Option<i64>, ()> {
        match self {
            Cell::Int(i) => Ok(Some(*i)),
            Cell::Float(f) => integral_i64(*f).map(Some).ok_or(()),
            Cell::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                if let Ok(i) = s.parse::<i64>() {
                    return Ok(Some(i));
                }
                s.parse::<f64>()
                    .ok()
                    .and_then(integral_i64)
                    .map(Some)
                    .ok_or(())
            }
            Cell::Empty => Ok(None),
            _ => Err(()),
        }
    }

    fn as_float(&self) -> std::result::Result<Option<f64>, ()> {
        match self {
            Cell::Int(i) => Ok(Some(*i as f64)),
            Cell::Float(f) if f.is_finite() => Ok(Some(*f)),
            Cell::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                match s.parse::<f64>() {
                    Ok(f) if f.is_finite() => Ok(Some(f)),
                    _ => Err(()),
                }
            }
            Cell::Empty => Ok(None),
            _ => Err(()),
        }
    }

    /// Only text cells carry promotion JSON; anything else is treated as absent.
    fn as_raw_text(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

/// Whole floats inside the `i64` range; `as` would saturate larger values into
/// one another.
fn integral_i64(f: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    (f.is_finite() && f.fract() == 0.0 && f >= -LIMIT && f < LIMIT).then_some(f as i64)
}

/// Header row plus data rows of one source
struct Table {
    /// 1-based sheet row number of the header row
    header_row: usize,
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// Positions of the required columns within a source's header row
struct ColumnIndex {
    order_id: usize,
    order_item_id: usize,
    quantity_ordered: usize,
    item_price: usize,
    promotion_discount: usize,
    batch_id: usize,
}

impl ColumnIndex {
    fn resolve(headers: &[String], source_name: &str) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let find = |column: &str| -> Result<usize> {
            let wanted = normalize_header(column);
            normalized
                .iter()
                .position(|h| *h == wanted)
                .ok_or_else(|| EtlError::MissingColumn {
                    source_name: source_name.to_string(),
                    column: column.to_string(),
                })
        };

        Ok(Self {
            order_id: find(ORDER_ID_HEADER)?,
            order_item_id: find(ORDER_ITEM_ID_HEADER)?,
            quantity_ordered: find(QUANTITY_ORDERED_HEADER)?,
            item_price: find(ITEM_PRICE_HEADER)?,
            promotion_discount: find(PROMOTION_DISCOUNT_HEADER)?,
            batch_id: find(BATCH_ID_HEADER)?,
        })
    }
}

/// Read one regional export and tag every row with `region`.
#[instrument(skip(path, region), fields(source = %path.as_ref().display(), region = %region))]
pub fn extract_source<P: AsRef<Path>>(path: P, region: Region) -> Result<RowSet> {
    let path = path.as_ref();
    let source_name = path.display().to_string();

    let table = read_table(path)?;
    debug!("Read {} data rows with headers {:?}", table.rows.len(), table.headers);

    let columns = ColumnIndex::resolve(&table.headers, &source_name)?;
    let rows = build_rows(&table, &columns, region, &source_name)?;

    info!("Extracted {} rows", rows.len());
    metrics::record_extracted(region.as_str(), rows.len());
    Ok(rows)
}

/// Read both exports; region A comes from the first path, region B from the second.
pub fn extract_regions<A: AsRef<Path>, B: AsRef<Path>>(
    region_a: A,
    region_b: B,
) -> Result<(RowSet, RowSet)> {
    let _timing = metrics::time_stage("extract");
    let rows_a = extract_source(region_a, Region::A)?;
    println!("Count of data from region A: {} rows", rows_a.len());
    let rows_b = extract_source(region_b, Region::B)?;
    println!("Count of data from region B: {} rows", rows_b.len());
    Ok((rows_a, rows_b))
}

fn read_table(path: &Path) -> Result<Table> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_spreadsheet(path),
        "csv" => read_csv(path),
        _ => Err(EtlError::UnsupportedFormat(path.display().to_string())),
    }
}

fn read_spreadsheet(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| EtlError::EmptySource {
            source_name: path.display().to_string(),
        })??;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| EtlError::EmptySource {
            source_name: path.display().to_string(),
        })?
        .iter()
        .map(|cell| match cell {
            Data::String(s) => s.clone(),
            other => Cell::from_data(other).display(),
        })
        .collect();

    let rows: Vec<Vec<Cell>> = rows
        .map(|row| row.iter().map(Cell::from_data).collect())
        .collect();

    // The used range can begin below row 1 when the sheet has leading blank rows
    let header_row = range.start().map_or(1, |(row, _)| row as usize + 1);

    Ok(Table {
        header_row,
        headers,
        rows,
    })
}

fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(EtlError::EmptySource {
            source_name: path.display().to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::from_text).collect());
    }

    Ok(Table {
        header_row: 1,
        headers,
        rows,
    })
}

fn cell_at(row: &[Cell], idx: usize) -> &Cell {
    static EMPTY: Cell = Cell::Empty;
    row.get(idx).unwrap_or(&EMPTY)
}

fn build_rows(
    table: &Table,
    columns: &ColumnIndex,
    region: Region,
    source_name: &str,
) -> Result<RowSet> {
    let mut out = Vec::with_capacity(table.rows.len());

    for (i, row) in table.rows.iter().enumerate() {
        if row.iter().all(Cell::is_blank) {
            continue;
        }
        let row_number = table.header_row + 1 + i;
        let cell = |idx: usize| cell_at(row, idx);
        let invalid = |column: &str, cell: &Cell| EtlError::InvalidCell {
            source_name: source_name.to_string(),
            row: row_number,
            column: column.to_string(),
            value: cell.display(),
        };

        let int_cell = |idx: usize, column: &str| -> Result<Option<i64>> {
            let c = cell(idx);
            c.as_int().map_err(|_| invalid(column, c))
        };
        let required_int = |idx: usize, column: &str| -> Result<i64> {
            int_cell(idx, column)?.ok_or_else(|| invalid(column, cell(idx)))
        };

        let price_cell = cell(columns.item_price);
        let item_price = price_cell
            .as_float()
            .map_err(|_| invalid(ITEM_PRICE_HEADER, price_cell))?
            .ok_or_else(|| invalid(ITEM_PRICE_HEADER, price_cell))?;

        out.push(SourceRow {
            order_id: required_int(columns.order_id, ORDER_ID_HEADER)?,
            order_item_id: int_cell(columns.order_item_id, ORDER_ITEM_ID_HEADER)?,
            quantity_ordered: required_int(columns.quantity_ordered, QUANTITY_ORDERED_HEADER)?,
            item_price,
            promotion_discount_raw: cell(columns.promotion_discount).as_raw_text(),
            batch_id: int_cell(columns.batch_id, BATCH_ID_HEADER)?,
            region,
        });
    }

    Ok(out)
}
