use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use arrow::array::Array;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Cell, LineItem, LineItemTable};
use super::schema::{Column, ColumnKind};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("reading data source: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("parsing JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reading parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("decoding arrow data: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),
    #[error("expected a top-level JSON array of records")]
    NotAnArray,
    #[error("JSON record {0} is not an object")]
    NotAnObject(usize),
    #[error("missing required columns: {}", column_list(.0))]
    MissingColumns(Vec<Column>),
    #[error("row {row}: '{value}' in column '{column}' is not a number")]
    InvalidNumber {
        row: usize,
        column: Column,
        value: String,
    },
}

fn column_list(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load line items from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with the source column names
/// * `.json`    – `[{ "header_id": "...", "created_at": "...", ... }, ...]`
/// * `.parquet` – any Arrow column types; cells are parsed from their text form
///
/// Every source column must be present; extra columns are ignored.
pub fn load_file(path: &Path) -> Result<LineItemTable, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => read_csv(std::fs::File::open(path)?),
        "json" => read_json(std::fs::File::open(path)?),
        "parquet" | "pq" => load_parquet(path),
        other => Err(LoadError::UnsupportedExtension(other.to_string())),
    }?;

    log::info!("Loaded {} line items from {}", table.len(), path.display());
    Ok(table)
}

// ---------------------------------------------------------------------------
// Row assembly shared by all formats
// ---------------------------------------------------------------------------

/// Maps source columns to their position in the input and turns raw text
/// fields into typed rows.
struct RowAssembler {
    /// Input position of each source column, in `Column::source()` order.
    positions: Vec<usize>,
    /// Timestamps that failed to parse, per column.
    coerced: BTreeMap<Column, usize>,
    rows: Vec<LineItem>,
}

impl RowAssembler {
    fn new<S: AsRef<str>>(headers: &[S]) -> Result<Self, LoadError> {
        let mut positions = Vec::with_capacity(Column::source().len());
        let mut missing = Vec::new();
        for &col in Column::source() {
            match headers.iter().position(|h| h.as_ref() == col.name()) {
                Some(pos) => positions.push(pos),
                None => missing.push(col),
            }
        }
        if !missing.is_empty() {
            return Err(LoadError::MissingColumns(missing));
        }
        Ok(Self {
            positions,
            coerced: BTreeMap::new(),
            rows: Vec::new(),
        })
    }

    /// Add one input row. `field` returns the raw text at an input position,
    /// `None` for an absent or null value.
    fn push<'a, F>(&mut self, row_no: usize, field: F) -> Result<(), LoadError>
    where
        F: Fn(usize) -> Option<&'a str>,
    {
        let mut item = LineItem::default();
        for (&col, &pos) in Column::source().iter().zip(&self.positions) {
            let raw = field(pos).unwrap_or("");
            let cell = parse_cell(col, raw, row_no)?;
            if cell.is_missing() && col.kind() == ColumnKind::Timestamp && !is_na(raw) {
                *self.coerced.entry(col).or_default() += 1;
            }
            item.set(col, cell);
        }
        self.rows.push(item);
        Ok(())
    }

    fn finish(self) -> LineItemTable {
        for (col, n) in &self.coerced {
            log::warn!("{n} unparsable timestamps in '{col}' treated as missing");
        }
        LineItemTable::from_rows(self.rows)
    }
}

/// Tokens read as a missing value in any column, as dataframe tools do.
const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_na(raw: &str) -> bool {
    let s = raw.trim();
    s.is_empty() || NA_TOKENS.contains(&s)
}

/// Parse a raw field according to its column's declared kind.
fn parse_cell(column: Column, raw: &str, row: usize) -> Result<Cell, LoadError> {
    if is_na(raw) {
        return Ok(Cell::Missing);
    }
    let cell = match column.kind() {
        ColumnKind::Numeric => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => {
                return Err(LoadError::InvalidNumber {
                    row,
                    column,
                    value: raw.to_string(),
                })
            }
        },
        ColumnKind::Timestamp => match parse_timestamp(raw) {
            // Range filtering works on whole days.
            Some(t) if column == Column::CreatedAt => Cell::Date(t.date_naive()),
            Some(t) => Cell::Timestamp(t),
            None => Cell::Missing,
        },
        ColumnKind::Derived => Cell::Missing,
        _ => Cell::Text(raw.to_string()),
    };
    Ok(cell)
}

/// Lenient UTC timestamp parsing. Offset-less values are taken as UTC;
/// anything unrecognised yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(t) = DateTime::parse_from_str(s, fmt) {
            return Some(t.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Read line items from CSV with a header row.
pub fn read_csv<R: Read>(input: R) -> Result<LineItemTable, LoadError> {
    let mut reader = csv::Reader::from_reader(input);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut assembler = RowAssembler::new(&headers)?;

    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        assembler.push(row_no, |pos| record.get(pos))?;
    }

    Ok(assembler.finish())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Read line items from a records-oriented JSON array. The first record's
/// keys are checked against the schema; an empty array is an empty table.
pub fn read_json<R: Read>(input: R) -> Result<LineItemTable, LoadError> {
    let root: JsonValue = serde_json::from_reader(input)?;
    let records = root.as_array().ok_or(LoadError::NotAnArray)?;

    let Some(first) = records.first() else {
        return Ok(LineItemTable::default());
    };
    let headers: Vec<String> = first
        .as_object()
        .ok_or(LoadError::NotAnObject(0))?
        .keys()
        .cloned()
        .collect();
    let mut assembler = RowAssembler::new(&headers)?;

    for (row_no, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or(LoadError::NotAnObject(row_no))?;
        let fields: Vec<Option<String>> = headers
            .iter()
            .map(|h| obj.get(h).and_then(json_to_text))
            .collect();
        assembler.push(row_no, |pos| fields[pos].as_deref())?;
    }

    Ok(assembler.finish())
}

fn json_to_text(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file. Works with files written by Pandas, Polars or a
/// warehouse export; each cell is rendered to text and parsed like CSV.
fn load_parquet(path: &Path) -> Result<LineItemTable, LoadError> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let mut assembler = RowAssembler::new(&headers)?;
    let reader = builder.build()?;

    let options = FormatOptions::default();
    let mut row_base = 0;
    for batch_result in reader {
        let batch = batch_result?;
        let formatters = batch
            .columns()
            .iter()
            .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
            .collect::<Result<Vec<_>, _>>()?;

        for row in 0..batch.num_rows() {
            let fields: Vec<Option<String>> = batch
                .columns()
                .iter()
                .zip(&formatters)
                .map(|(col, fmt)| (!col.is_null(row)).then(|| fmt.value(row).to_string()))
                .collect();
            assembler.push(row_base + row, |pos| fields[pos].as_deref())?;
        }
        row_base += batch.num_rows();
    }

    Ok(assembler.finish())
}
