//! Command-line arguments for the headless dashboard pass

use std::path::PathBuf;

use clap::Parser;

/// Run one dashboard pass over billing line items and print a summary.
///
/// The data source, cache TTL and default lookback come from the
/// BILLING_LENS_DATA, BILLING_LENS_CACHE_TTL_SECS and
/// BILLING_LENS_LOOKBACK_DAYS environment variables.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Session JSON with `start`, `end` and `selections` (column -> values).
    /// Without it the default date range and no facet selections are used.
    pub session: Option<PathBuf>,

    /// Write the filtered rows, derived columns included, to this CSV file
    pub export: Option<PathBuf>,
}
