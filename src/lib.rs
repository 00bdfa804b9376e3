//! billing-lens: date-range and facet filtering over subscription billing
//! line items, with derived customer tenure and revenue segments.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod state;

pub use app::{Dashboard, FilteredView, Refresh};
pub use cli::Args;
pub use config::DashboardConfig;
pub use data::filter::{
    apply_date_range, apply_facets, default_facets, refine_facets, DateBounds, DateRange, Facet,
    FacetSelections, RangeError,
};
pub use data::loader::{load_file, LoadError};
pub use data::model::{Cell, LineItem, LineItemTable};
pub use data::normalize::{canonicalize, distinct_options};
pub use data::schema::{Column, ColumnKind};
pub use data::segment::{derive_segments, RevenueSegment, TenureBucket};
pub use state::SessionState;
