use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::model::{LineItem, LineItemTable};
use super::normalize::{canonical_value, distinct_options};
use super::schema::{Column, UnknownColumn};

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// Earliest and latest `created_at` in a table; the picker's limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl DateBounds {
    /// `None` when no row has a `created_at`.
    pub fn of(table: &LineItemTable) -> Option<Self> {
        let mut dates = table.iter().filter_map(LineItem::created_at);
        let first = dates.next()?;
        let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(Self { min, max })
    }

    /// Initial selection: the last `lookback_days` up to `max`, never
    /// starting before `min`.
    pub fn default_range(&self, lookback_days: u32) -> (NaiveDate, NaiveDate) {
        let start = self
            .max
            .checked_sub_signed(Duration::days(i64::from(lookback_days)))
            .map_or(self.min, |d| d.max(self.min));
        (start, self.max)
    }
}

/// Why a date selection cannot be used. `Display` is the message shown to
/// the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("Please select a start date.")]
    MissingStart,
    #[error("Please select an end date.")]
    MissingEnd,
    #[error("The start date cannot be after the end date. Please select a valid date range.")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },
    /// No row has a usable `created_at`, so there is nothing to pick from.
    #[error("No line items with a creation date are available.")]
    NoDatedRows,
}

/// A validated, inclusive `created_at` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, RangeError> {
        let start = start.ok_or(RangeError::MissingStart)?;
        let end = end.ok_or(RangeError::MissingEnd)?;
        if start > end {
            return Err(RangeError::StartAfterEnd { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Rows whose `created_at` falls inside `range`, bounds included. Rows
/// without a `created_at` are dropped.
pub fn apply_date_range(table: &LineItemTable, range: &DateRange) -> LineItemTable {
    table.filtered(|row| row.created_at().is_some_and(|d| range.contains(d)))
}

// ---------------------------------------------------------------------------
// Facets
// ---------------------------------------------------------------------------

/// A named multi-select filter bound to one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facet {
    pub label: String,
    pub column: Column,
}

impl Facet {
    pub fn new(label: impl Into<String>, column: Column) -> Self {
        Self {
            label: label.into(),
            column,
        }
    }

    /// Facet on a column given by name. An unknown name is a definition bug
    /// and is reported immediately.
    pub fn parse(label: impl Into<String>, column: &str) -> Result<Self, UnknownColumn> {
        Ok(Self::new(label, column.parse()?))
    }
}

/// The dashboard's facets, in evaluation order.
pub fn default_facets() -> Vec<Facet> {
    vec![
        Facet::new("Subscription Plan", Column::SubscriptionPlan),
        Facet::new("Customer Segment", Column::RevenueSegment),
        Facet::new("Purchase Location", Column::CustomerCity),
        Facet::new("Payment Method", Column::PaymentMethod),
        Facet::new("Billing Source", Column::BillingType),
        Facet::new("Customer Tenure", Column::CustomerTenureRange),
        Facet::new("Product Name", Column::ProductName),
        Facet::new("Subscription Status", Column::SubscriptionStatus),
    ]
}

/// Selected canonical values per facet column. An absent or empty set
/// means "no constraint".
pub type FacetSelections = BTreeMap<Column, BTreeSet<String>>;

/// Whether `row`'s canonical value in `column` is among `selected`.
/// An empty selection accepts every row; a missing cell never matches a
/// non-empty selection.
fn row_matches(row: &LineItem, column: Column, selected: &BTreeSet<String>) -> bool {
    selected.is_empty() || canonical_value(row, column).is_some_and(|v| selected.contains(&v))
}

/// Independent facet filtering: keep rows that satisfy every facet,
/// where a facet is satisfied when its selection is empty or contains the
/// row's canonical value. Selections for columns not in `facets` are ignored.
pub fn apply_facets(
    table: &LineItemTable,
    facets: &[Facet],
    selections: &FacetSelections,
) -> LineItemTable {
    let active: Vec<(Column, &BTreeSet<String>)> = facets
        .iter()
        .filter_map(|f| selections.get(&f.column).map(|sel| (f.column, sel)))
        .filter(|(_, sel)| !sel.is_empty())
        .collect();

    table.filtered(|row| active.iter().all(|(col, sel)| row_matches(row, *col, sel)))
}

/// A facet as evaluated during a progressive pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetView {
    pub label: String,
    pub column: Column,
    /// Options offered, computed after the preceding facets were applied.
    pub options: Vec<String>,
    /// Selection actually applied: the remembered one minus stale values.
    pub selected: BTreeSet<String>,
}

/// Result of [`refine_facets`].
#[derive(Debug, Clone, PartialEq)]
pub struct FacetFold {
    pub table: LineItemTable,
    pub views: Vec<FacetView>,
}

/// Progressive facet filtering.
///
/// Facets are applied in order to a working table. Each facet's options are
/// the distinct canonical values left after the earlier facets narrowed the
/// table; its remembered selection is pruned to those options, written back
/// to `selections`, and then applied.
pub fn refine_facets(
    table: LineItemTable,
    facets: &[Facet],
    selections: &mut FacetSelections,
) -> FacetFold {
    let (table, views) = facets.iter().fold(
        (table, Vec::with_capacity(facets.len())),
        |(working, mut views), facet| {
            let options = distinct_options(&working, facet.column);
            let selected: BTreeSet<String> = selections
                .get(&facet.column)
                .map(|sel| {
                    sel.iter()
                        .filter(|v| options.binary_search(*v).is_ok())
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();

            if let Some(previous) = selections.get(&facet.column) {
                if previous.len() != selected.len() {
                    log::debug!(
                        "Dropped {} stale selections from '{}'",
                        previous.len() - selected.len(),
                        facet.label
                    );
                }
            }
            selections.insert(facet.column, selected.clone());

            let narrowed = if selected.is_empty() {
                working
            } else {
                working.filtered(|row| row_matches(row, facet.column, &selected))
            };
            log::debug!(
                "Facet '{}': {} options, {} selected, {} rows left",
                facet.label,
                options.len(),
                selected.len(),
                narrowed.len()
            );

            views.push(FacetView {
                label: facet.label.clone(),
                column: facet.column,
                options,
                selected,
            });
            (narrowed, views)
        },
    );

    FacetFold { table, views }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Cell;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(city: &str, plan: &str, billing: &str) -> LineItem {
        LineItem::default()
            .with(Column::CustomerCity, Cell::Text(city.into()))
            .with(Column::SubscriptionPlan, Cell::Text(plan.into()))
            .with(Column::BillingType, Cell::Text(billing.into()))
    }

    fn sample() -> LineItemTable {
        LineItemTable::from_rows(vec![
            item("Oslo", "Acme - Pro", "CARD"),
            item("Oslo", "Acme - Basic", "INVOICE"),
            item("Lima", "Acme -Pro", "card"),
            item("Lima", "Acme - Basic", "CARD"),
            LineItem::default(),
        ])
    }

    fn select(pairs: Vec<(Column, Vec<&str>)>) -> FacetSelections {
        pairs
            .into_iter()
            .map(|(c, vals)| (c, vals.into_iter().map(String::from).collect()))
            .collect()
    }

    #[test]
    fn date_range_validation_messages() {
        assert_eq!(
            DateRange::new(None, Some(date(2023, 1, 1))).unwrap_err().to_string(),
            "Please select a start date."
        );
        assert_eq!(
            DateRange::new(Some(date(2023, 1, 1)), None).unwrap_err().to_string(),
            "Please select an end date."
        );
        assert!(matches!(
            DateRange::new(Some(date(2023, 2, 1)), Some(date(2023, 1, 1))),
            Err(RangeError::StartAfterEnd { .. })
        ));
        assert!(DateRange::new(Some(date(2023, 1, 1)), Some(date(2023, 1, 1))).is_ok());
    }

    #[test]
    fn date_range_is_inclusive() {
        let rows = [
            Some(date(2022, 12, 31)),
            Some(date(2023, 1, 1)),
            Some(date(2023, 1, 15)),
            Some(date(2023, 1, 31)),
            Some(date(2023, 2, 1)),
            None,
        ]
        .into_iter()
        .map(|d| {
            LineItem::default().with(Column::CreatedAt, d.map(Cell::Date).unwrap_or(Cell::Missing))
        })
        .collect();
        let table = LineItemTable::from_rows(rows);
        let range = DateRange::new(Some(date(2023, 1, 1)), Some(date(2023, 1, 31))).unwrap();
        let kept: Vec<_> = apply_date_range(&table, &range)
            .iter()
            .filter_map(LineItem::created_at)
            .collect();
        assert_eq!(kept, vec![date(2023, 1, 1), date(2023, 1, 15), date(2023, 1, 31)]);
    }

    #[test]
    fn bounds_and_default_range() {
        let table = LineItemTable::from_rows(
            [date(2021, 5, 1), date(2023, 6, 30), date(2022, 1, 1)]
                .into_iter()
                .map(|d| LineItem::default().with(Column::CreatedAt, Cell::Date(d)))
                .collect(),
        );
        let bounds = DateBounds::of(&table).unwrap();
        assert_eq!(bounds.min, date(2021, 5, 1));
        assert_eq!(bounds.max, date(2023, 6, 30));
        assert_eq!(
            bounds.default_range(365),
            (date(2022, 6, 30), date(2023, 6, 30))
        );
        assert_eq!(
            bounds.default_range(5000),
            (date(2021, 5, 1), date(2023, 6, 30))
        );
        assert_eq!(DateBounds::of(&LineItemTable::default()), None);
    }

    #[test]
    fn empty_selection_is_a_no_op() {
        let table = sample();
        let sel = select(vec![(Column::CustomerCity, vec![])]);
        assert_eq!(apply_facets(&table, &default_facets(), &sel), table);
        assert_eq!(apply_facets(&table, &default_facets(), &FacetSelections::new()), table);
    }

    #[test]
    fn facets_combine_conjunctively() {
        let table = sample();
        let facets = default_facets();
        let both = apply_facets(
            &table,
            &facets,
            &select(vec![
                (Column::CustomerCity, vec!["Lima"]),
                (Column::SubscriptionPlan, vec!["Pro"]),
            ]),
        );
        let city = apply_facets(
            &table,
            &facets,
            &select(vec![(Column::CustomerCity, vec!["Lima"])]),
        );
        let plan = apply_facets(
            &table,
            &facets,
            &select(vec![(Column::SubscriptionPlan, vec!["Pro"])]),
        );
        let intersection: Vec<_> = city
            .rows
            .iter()
            .filter(|r| plan.rows.contains(r))
            .cloned()
            .collect();
        assert_eq!(both.rows, intersection);
        assert_eq!(both.len(), 1);
    }

    #[test]
    fn selection_within_facet_is_disjunctive_on_canonical_values() {
        let table = sample();
        let out = apply_facets(
            &table,
            &default_facets(),
            &select(vec![(Column::BillingType, vec!["card", "invoice"])]),
        );
        // Missing billing type never matches.
        assert_eq!(out.len(), 4);
        let out = apply_facets(
            &table,
            &default_facets(),
            &select(vec![(Column::BillingType, vec!["CARD"])]),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn selections_outside_facet_list_are_ignored() {
        let table = sample();
        let facets = vec![Facet::new("Purchase Location", Column::CustomerCity)];
        let sel = select(vec![(Column::SubscriptionPlan, vec!["Basic"])]);
        assert_eq!(apply_facets(&table, &facets, &sel), table);
    }

    #[test]
    fn progressive_options_follow_earlier_facets() {
        let facets = vec![
            Facet::new("Purchase Location", Column::CustomerCity),
            Facet::new("Billing Source", Column::BillingType),
        ];
        let mut sel = select(vec![(Column::CustomerCity, vec!["Oslo"])]);
        let fold = refine_facets(sample(), &facets, &mut sel);

        assert_eq!(fold.views[0].options, vec!["Lima", "Oslo"]);
        assert_eq!(fold.views[1].options, vec!["card", "invoice"]);
        assert_eq!(fold.table.len(), 2);

        let mut sel = select(vec![(Column::CustomerCity, vec!["Lima"])]);
        let fold = refine_facets(sample(), &facets, &mut sel);
        assert_eq!(fold.views[1].options, vec!["card"]);
    }

    #[test]
    fn stale_selections_are_pruned_and_written_back() {
        let facets = vec![
            Facet::new("Purchase Location", Column::CustomerCity),
            Facet::new("Billing Source", Column::BillingType),
        ];
        let mut sel = select(vec![
            (Column::CustomerCity, vec!["Lima"]),
            (Column::BillingType, vec!["invoice"]),
        ]);
        let fold = refine_facets(sample(), &facets, &mut sel);

        // "invoice" is not offered once Lima is selected, so billing passes through.
        assert!(fold.views[1].selected.is_empty());
        assert!(sel[&Column::BillingType].is_empty());
        assert_eq!(fold.table.len(), 2);
    }

    #[test]
    fn progressive_matches_independent_when_selections_are_valid() {
        let facets = default_facets();
        let mut sel = select(vec![
            (Column::CustomerCity, vec!["Oslo", "Lima"]),
            (Column::SubscriptionPlan, vec!["Basic"]),
        ]);
        let independent = apply_facets(&sample(), &facets, &sel);
        let fold = refine_facets(sample(), &facets, &mut sel);
        assert_eq!(fold.table, independent);
        assert_eq!(fold.views.len(), facets.len());
    }

    #[test]
    fn unknown_facet_column_fails_fast() {
        assert!(Facet::parse("Region", "customer_region").is_err());
        let f = Facet::parse("Purchase Location", "customer_city").unwrap();
        assert_eq!(f.column, Column::CustomerCity);
    }
}
