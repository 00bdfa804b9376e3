use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::filter::{DateBounds, DateRange, FacetSelections, RangeError};
use crate::data::schema::Column;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// What one user has picked so far, independent of rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Date range picker, inclusive. `None` means the field is cleared.
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,

    /// Per-facet selections (canonical values).
    #[serde(default)]
    pub selections: FacetSelections,

    /// Validation message from the last refresh, if it stopped early.
    #[serde(skip)]
    pub status_message: Option<String>,
}

impl SessionState {
    /// On first use (no dates picked at all) start from the default range.
    pub fn seed_dates(&mut self, bounds: &DateBounds, lookback_days: u32) {
        if self.start.is_none() && self.end.is_none() {
            let (start, end) = bounds.default_range(lookback_days);
            self.start = Some(start);
            self.end = Some(end);
        }
    }

    pub fn set_date_range(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.start = start;
        self.end = end;
    }

    /// Validated range, or the message to show instead of results.
    pub fn date_range(&self) -> Result<DateRange, RangeError> {
        DateRange::new(self.start, self.end)
    }

    /// Replace a facet's selection.
    pub fn select<I, S>(&mut self, column: Column, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .insert(column, values.into_iter().map(Into::into).collect());
    }

    /// Toggle a single value in a facet's selection.
    pub fn toggle(&mut self, column: Column, value: &str) {
        let selected = self.selections.entry(column).or_default();
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
    }

    /// Deselect everything in one facet (no constraint).
    pub fn clear_facet(&mut self, column: Column) {
        self.selections.remove(&column);
    }

    /// Deselect everything in every facet.
    pub fn clear_all(&mut self) {
        self.selections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn seeds_only_an_untouched_range() {
        let bounds = DateBounds {
            min: date(2020, 1, 1),
            max: date(2024, 1, 1),
        };
        let mut state = SessionState::default();
        state.seed_dates(&bounds, 365);
        assert_eq!(state.start, Some(date(2023, 1, 1)));
        assert_eq!(state.end, Some(date(2024, 1, 1)));

        state.set_date_range(None, Some(date(2024, 1, 1)));
        state.seed_dates(&bounds, 365);
        assert_eq!(state.date_range(), Err(RangeError::MissingStart));
    }

    #[test]
    fn toggle_select_and_clear() {
        let mut state = SessionState::default();
        state.toggle(Column::CustomerCity, "Oslo");
        state.toggle(Column::CustomerCity, "Lima");
        state.toggle(Column::CustomerCity, "Oslo");
        assert_eq!(
            state.selections[&Column::CustomerCity].iter().collect::<Vec<_>>(),
            vec!["Lima"]
        );

        state.select(Column::BillingType, ["card", "invoice"]);
        assert_eq!(state.selections[&Column::BillingType].len(), 2);

        state.clear_facet(Column::CustomerCity);
        assert!(!state.selections.contains_key(&Column::CustomerCity));
        state.clear_all();
        assert!(state.selections.is_empty());
    }

    #[test]
    fn reads_session_json() {
        let json = r#"{
            "start": "2023-01-01",
            "end": "2023-03-31",
            "selections": { "customer_city": ["Oslo"], "billing_type": [] }
        }"#;
        let state: SessionState = serde_json::from_str(json).unwrap();
        assert_eq!(
            state.date_range().map(|r| (r.start(), r.end())),
            Ok((date(2023, 1, 1), date(2023, 3, 31)))
        );
        assert!(state.selections[&Column::CustomerCity].contains("Oslo"));
        assert!(state.selections[&Column::BillingType].is_empty());
    }
}
