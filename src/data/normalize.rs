use std::collections::BTreeSet;

use super::model::{LineItem, LineItemTable};
use super::schema::{Column, ColumnKind};

/// Display/comparison form of a raw value from `column`.
///
/// * compound columns (`"<prefix> - <suffix>"`) keep the suffix: split on
///   the first `" - "`, else on the first `" -"`, else unchanged
/// * `billing_type` is lowercased
/// * everything else is returned as is
pub fn canonicalize(column: Column, raw: &str) -> String {
    match column.kind() {
        ColumnKind::CompoundCategorical => compound_suffix(raw).to_string(),
        ColumnKind::LowercaseCategorical => raw.to_lowercase(),
        _ => raw.to_string(),
    }
}

fn compound_suffix(raw: &str) -> &str {
    raw.split_once(" - ")
        .or_else(|| raw.split_once(" -"))
        .map(|(_, suffix)| suffix)
        .unwrap_or(raw)
}

/// Canonical value of `column` in `row`, `None` when the cell is missing.
pub fn canonical_value(row: &LineItem, column: Column) -> Option<String> {
    row.text(column).map(|raw| canonicalize(column, &raw))
}

/// Sorted, de-duplicated canonical values of `column`, missing cells dropped.
/// This is the option list offered for a facet on that column.
pub fn distinct_options(table: &LineItemTable, column: Column) -> Vec<String> {
    table
        .iter()
        .filter_map(|row| canonical_value(row, column))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
