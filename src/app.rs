use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::DashboardConfig;
use crate::data::cache::LoadCache;
use crate::data::filter::{
    apply_date_range, default_facets, refine_facets, DateBounds, Facet, FacetView, RangeError,
};
use crate::data::loader::{load_file, LoadError};
use crate::data::model::LineItemTable;
use crate::data::segment::derive_segments;
use crate::state::SessionState;

// ---------------------------------------------------------------------------
// Refresh results
// ---------------------------------------------------------------------------

/// Everything the UI needs after a successful pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView {
    /// Rows passing the date range and every facet, derived columns filled.
    pub table: LineItemTable,
    /// Facets in evaluation order with their options and applied selection.
    pub facets: Vec<FacetView>,
    /// Limits for the date picker, over the full dataset.
    pub bounds: DateBounds,
}

/// Outcome of one pipeline pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Refresh {
    Ready(FilteredView),
    /// The date selection is unusable; nothing was filtered.
    Invalid {
        message: String,
        bounds: Option<DateBounds>,
    },
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// One dashboard session: configuration, the shared load cache and the
/// user's selections.
pub struct Dashboard {
    pub config: DashboardConfig,
    pub state: SessionState,
    facets: Vec<Facet>,
    cache: Arc<LoadCache>,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Self {
        let cache = Arc::new(LoadCache::new(config.cache_ttl()));
        Self::with_cache(config, cache)
    }

    /// Session sharing an existing cache with other sessions.
    pub fn with_cache(config: DashboardConfig, cache: Arc<LoadCache>) -> Self {
        Self {
            config,
            state: SessionState::default(),
            facets: default_facets(),
            cache,
        }
    }

    /// Replace the facet list (evaluation order is list order).
    pub fn with_facets(mut self, facets: Vec<Facet>) -> Self {
        self.facets = facets;
        self
    }

    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    /// Full dataset, from the cache when fresh.
    pub fn table(&self) -> Result<Arc<LineItemTable>, LoadError> {
        let path = &self.config.data_path;
        self.cache.get_or_load(|| load_file(path))
    }

    /// Run one pass: date range, segment derivation, then facets in order.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> Result<Refresh, LoadError> {
        let table = self.table()?;
        let Some(bounds) = DateBounds::of(&table) else {
            return Ok(self.stop(RangeError::NoDatedRows, None));
        };
        self.state.seed_dates(&bounds, self.config.lookback_days);

        let range = match self.state.date_range() {
            Ok(range) => range,
            Err(err) => return Ok(self.stop(err, Some(bounds))),
        };
        self.state.status_message = None;

        let dated = apply_date_range(&table, &range);
        log::info!(
            "{} of {} line items between {} and {}",
            dated.len(),
            table.len(),
            range.start(),
            range.end()
        );

        let segmented = derive_segments(dated, now);
        let fold = refine_facets(segmented, &self.facets, &mut self.state.selections);
        log::info!("{} line items after facet filters", fold.table.len());

        Ok(Refresh::Ready(FilteredView {
            table: fold.table,
            facets: fold.views,
            bounds,
        }))
    }

    fn stop(&mut self, err: RangeError, bounds: Option<DateBounds>) -> Refresh {
        let message = err.to_string();
        log::warn!("Refresh stopped: {message}");
        self.state.status_message = Some(message.clone());
        Refresh::Invalid { message, bounds }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Cell, LineItem};
    use crate::data::schema::Column;
    use chrono::{NaiveDate, TimeZone};
    use std::path::PathBuf;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(company: &str, total: f64, created: NaiveDate, city: &str) -> LineItem {
        LineItem::default()
            .with(Column::CustomerCompany, Cell::Text(company.into()))
            .with(Column::TotalAmount, Cell::Number(total))
            .with(Column::CreatedAt, Cell::Date(created))
            .with(Column::CustomerCity, Cell::Text(city.into()))
    }

    /// Dashboard whose cache is pre-filled, so no file is read.
    fn dashboard(rows: Vec<LineItem>) -> Dashboard {
        let cache = Arc::new(LoadCache::new(std::time::Duration::from_secs(600)));
        cache
            .get_or_load(|| Ok::<_, LoadError>(LineItemTable::from_rows(rows)))
            .unwrap();
        let config = DashboardConfig {
            data_path: PathBuf::from("/nonexistent/items.csv"),
            ..DashboardConfig::default()
        };
        Dashboard::with_cache(config, cache)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn default_range_covers_last_year() {
        let mut dash = dashboard(vec![
            row("A", 1.0, date(2021, 1, 1), "Oslo"),
            row("A", 1.0, date(2023, 6, 1), "Oslo"),
        ]);
        let Refresh::Ready(view) = dash.refresh(now()).unwrap() else {
            panic!("expected a filtered view");
        };
        assert_eq!(view.table.len(), 1);
        assert_eq!(dash.state.start, Some(date(2022, 6, 1)));
        assert_eq!(
            view.bounds,
            DateBounds {
                min: date(2021, 1, 1),
                max: date(2023, 6, 1)
            }
        );
    }

    #[test]
    fn invalid_range_stops_the_pass() {
        let mut dash = dashboard(vec![row("A", 1.0, date(2023, 1, 1), "Oslo")]);
        dash.state
            .set_date_range(Some(date(2023, 2, 1)), Some(date(2023, 1, 1)));
        match dash.refresh(now()).unwrap() {
            Refresh::Invalid { message, .. } => {
                assert!(message.starts_with("The start date cannot be after the end date"));
            }
            other => panic!("expected validation stop, got {other:?}"),
        }
        assert!(dash.state.status_message.is_some());
    }

    #[test]
    fn facets_see_segments_of_the_date_filtered_rows() {
        let mut dash = dashboard(vec![
            row("A", 10.0, date(2023, 1, 1), "Oslo"),
            row("A", 90.0, date(2023, 2, 1), "Oslo"),
            row("B", 50.0, date(2023, 3, 1), "Lima"),
        ]);
        dash.state
            .set_date_range(Some(date(2023, 1, 1)), Some(date(2023, 2, 28)));
        let Refresh::Ready(view) = dash.refresh(now()).unwrap() else {
            panic!("expected a filtered view");
        };
        assert_eq!(view.table.len(), 2);
        let segment = view
            .facets
            .iter()
            .find(|f| f.column == Column::RevenueSegment)
            .unwrap();
        assert_eq!(segment.options, vec!["Very High Revenue"]);
        let city = view
            .facets
            .iter()
            .find(|f| f.column == Column::CustomerCity)
            .unwrap();
        assert_eq!(city.options, vec!["Oslo"]);
    }

    #[test]
    fn no_dated_rows_is_reported_without_touching_selections() {
        let undated = LineItem::default().with(Column::CustomerCity, Cell::Text("Oslo".into()));
        let mut dash = dashboard(vec![undated]);
        dash.state.select(Column::CustomerCity, ["Oslo"]);
        match dash.refresh(now()).unwrap() {
            Refresh::Invalid { message, bounds } => {
                assert_eq!(message, "No line items with a creation date are available.");
                assert_eq!(bounds, None);
            }
            other => panic!("expected a no-data stop, got {other:?}"),
        }
        assert_eq!(dash.state.start, None);
        assert_eq!(dash.state.selections[&Column::CustomerCity].len(), 1);

        let mut empty = dashboard(Vec::new());
        assert!(matches!(
            empty.refresh(now()).unwrap(),
            Refresh::Invalid { bounds: None, .. }
        ));
    }

    #[test]
    fn custom_facet_order_is_used() {
        let facets = vec![
            Facet::new("City", Column::CustomerCity),
            Facet::new("Company", Column::CustomerCompany),
        ];
        let mut dash = dashboard(vec![
            row("A", 1.0, date(2023, 1, 1), "Oslo"),
            row("B", 1.0, date(2023, 1, 2), "Lima"),
        ])
        .with_facets(facets.clone());
        assert_eq!(dash.facets(), facets.as_slice());
        assert_eq!(dash.cache.ttl(), std::time::Duration::from_secs(600));

        dash.state.select(Column::CustomerCity, ["Lima"]);
        let Refresh::Ready(view) = dash.refresh(now()).unwrap() else {
            panic!("expected a filtered view");
        };
        let labels: Vec<_> = view.facets.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["City", "Company"]);
        assert_eq!(view.facets[1].options, vec!["B"]);
        assert_eq!(view.table.len(), 1);
    }

    #[test]
    fn dashboard_cache_follows_configured_ttl() {
        let config = DashboardConfig {
            cache_ttl_secs: 42,
            ..DashboardConfig::default()
        };
        let dash = Dashboard::new(config);
        assert_eq!(dash.cache.ttl(), std::time::Duration::from_secs(42));
    }

    #[test]
    fn load_failure_is_an_error() {
        let config = DashboardConfig {
            data_path: PathBuf::from("/nonexistent/items.csv"),
            ..DashboardConfig::default()
        };
        let mut dash = Dashboard::new(config);
        assert!(matches!(dash.refresh(now()), Err(LoadError::Io(_))));
    }
}
