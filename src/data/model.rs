use std::cmp::Ordering;
use std::fmt;
use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};

use super::schema::Column;

// ---------------------------------------------------------------------------
// Cell – a single typed value in a line-item row
// ---------------------------------------------------------------------------

/// A typed cell. Which variant a column holds is decided by its
/// [`ColumnKind`](super::schema::ColumnKind); `Missing` is valid everywhere.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Number(f64),
    /// Calendar date without time of day.
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Missing,
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        use Cell::*;
        fn rank(c: &Cell) -> u8 {
            match c {
                Missing => 0,
                Integer(_) => 1,
                Number(_) => 2,
                Date(_) => 3,
                Timestamp(_) => 4,
                Text(_) => 5,
            }
        }
        match (self, other) {
            (Missing, Missing) => Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Number(a), Number(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Timestamp(a), Timestamp(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Cell::Text(s) => s.hash(state),
            Cell::Integer(i) => i.hash(state),
            Cell::Number(v) => v.to_bits().hash(state),
            Cell::Date(d) => d.hash(state),
            Cell::Timestamp(t) => t.hash(state),
            Cell::Missing => {}
        }
    }
}

/// Text rendering used for option lists and CSV export. Missing renders
/// as the empty string.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Integer(i) => write!(f, "{i}"),
            // Debug keeps the trailing ".0" on whole numbers.
            Cell::Number(v) => write!(f, "{v:?}"),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Cell::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S%:z")),
            Cell::Missing => Ok(()),
        }
    }
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// LineItem – one row of the table
// ---------------------------------------------------------------------------

/// One billing line item. Holds a cell for every [`Column`], derived
/// columns included (missing until segment derivation runs).
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    cells: Vec<Cell>,
}

impl Default for LineItem {
    fn default() -> Self {
        Self {
            cells: vec![Cell::Missing; Column::ALL.len()],
        }
    }
}

impl LineItem {
    pub fn get(&self, column: Column) -> &Cell {
        &self.cells[column.index()]
    }

    pub fn set(&mut self, column: Column, cell: Cell) {
        self.cells[column.index()] = cell;
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, column: Column, cell: Cell) -> Self {
        self.set(column, cell);
        self
    }

    /// Stringified value of a column, `None` when missing.
    pub fn text(&self, column: Column) -> Option<String> {
        let cell = self.get(column);
        (!cell.is_missing()).then(|| cell.to_string())
    }

    /// Calendar date the line item was created on.
    pub fn created_at(&self) -> Option<NaiveDate> {
        match self.get(Column::CreatedAt) {
            Cell::Date(d) => Some(*d),
            Cell::Timestamp(t) => Some(t.date_naive()),
            _ => None,
        }
    }

    pub fn customer_created_at(&self) -> Option<DateTime<Utc>> {
        match self.get(Column::CustomerCreatedAt) {
            Cell::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn customer_company(&self) -> Option<&str> {
        self.get(Column::CustomerCompany).as_str()
    }

    /// Line total; a missing amount counts as zero.
    pub fn total_amount(&self) -> f64 {
        self.get(Column::TotalAmount)
            .as_f64()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

// ---------------------------------------------------------------------------
// LineItemTable – the in-memory dataset
// ---------------------------------------------------------------------------

/// A fully materialised set of line items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItemTable {
    pub rows: Vec<LineItem>,
}

impl LineItemTable {
    pub fn from_rows(rows: Vec<LineItem>) -> Self {
        Self { rows }
    }

    /// Number of line items.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineItem> {
        self.rows.iter()
    }

    /// New table holding clones of the rows that satisfy `keep`.
    pub fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&LineItem) -> bool,
    {
        Self {
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Sum of `total_amount` over all rows.
    pub fn total_revenue(&self) -> f64 {
        self.rows.iter().map(LineItem::total_amount).sum()
    }

    /// Write every column, header row first.
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(Column::ALL.iter().map(|c| c.name()))?;
        for row in &self.rows {
            out.write_record(row.cells().iter().map(|c| c.to_string()))?;
        }
        out.flush()?;
        Ok(())
    }
}
