//! Derived customer segments: tenure bucket and revenue segment.
//!
//! Both are recomputed for every working set. Revenue thresholds in
//! particular are quartiles of the rows currently in scope, so the same
//! company can land in a different segment under a different date range.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use super::model::{Cell, LineItemTable};
use super::schema::Column;

const SECONDS_PER_TENURE_MONTH: i64 = 30 * 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Tenure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TenureBucket {
    UpToSixMonths,
    SevenToTwelveMonths,
    OneToTwoYears,
    TwoToThreeYears,
    ThreeToFourYears,
    FourToFiveYears,
    OverFiveYears,
}

/// Inclusive month ranges, checked in order. Anything past the last range
/// is [`TenureBucket::OverFiveYears`].
const TENURE_RANGES: [(u32, u32, TenureBucket); 6] = [
    (0, 6, TenureBucket::UpToSixMonths),
    (7, 12, TenureBucket::SevenToTwelveMonths),
    (13, 24, TenureBucket::OneToTwoYears),
    (25, 36, TenureBucket::TwoToThreeYears),
    (37, 48, TenureBucket::ThreeToFourYears),
    (49, 60, TenureBucket::FourToFiveYears),
];

impl TenureBucket {
    pub const ALL: [TenureBucket; 7] = [
        TenureBucket::UpToSixMonths,
        TenureBucket::SevenToTwelveMonths,
        TenureBucket::OneToTwoYears,
        TenureBucket::TwoToThreeYears,
        TenureBucket::ThreeToFourYears,
        TenureBucket::FourToFiveYears,
        TenureBucket::OverFiveYears,
    ];

    pub fn from_months(months: u32) -> Self {
        TENURE_RANGES
            .iter()
            .find(|(lo, hi, _)| (*lo..=*hi).contains(&months))
            .map(|(_, _, bucket)| *bucket)
            .unwrap_or(TenureBucket::OverFiveYears)
    }

    pub fn label(self) -> &'static str {
        match self {
            TenureBucket::UpToSixMonths => "0-6 months",
            TenureBucket::SevenToTwelveMonths => "7-12 months",
            TenureBucket::OneToTwoYears => "1-2 years",
            TenureBucket::TwoToThreeYears => "2-3 years",
            TenureBucket::ThreeToFourYears => "3-4 years",
            TenureBucket::FourToFiveYears => "4-5 years",
            TenureBucket::OverFiveYears => "5+ years",
        }
    }
}

impl fmt::Display for TenureBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whole 30-day periods between `created` and `now`. A creation time in the
/// future counts as zero.
pub fn tenure_months(created: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let secs = (now - created).num_seconds().max(0);
    u32::try_from(secs / SECONDS_PER_TENURE_MONTH).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// Revenue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RevenueSegment {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RevenueSegment {
    pub const ALL: [RevenueSegment; 4] = [
        RevenueSegment::Low,
        RevenueSegment::Medium,
        RevenueSegment::High,
        RevenueSegment::VeryHigh,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RevenueSegment::Low => "Low Revenue",
            RevenueSegment::Medium => "Medium Revenue",
            RevenueSegment::High => "High Revenue",
            RevenueSegment::VeryHigh => "Very High Revenue",
        }
    }
}

impl fmt::Display for RevenueSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Quartile cut points over per-company revenue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevenueThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl RevenueThresholds {
    /// 25th/50th/75th percentiles of `sums`; `None` when `sums` is empty.
    pub fn from_sums(sums: &[f64]) -> Option<Self> {
        let mut sorted = sums.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            low: quantile(&sorted, 0.25)?,
            medium: quantile(&sorted, 0.50)?,
            high: quantile(&sorted, 0.75)?,
        })
    }

    pub fn classify(&self, revenue: f64) -> RevenueSegment {
        if revenue < self.low {
            RevenueSegment::Low
        } else if revenue < self.medium {
            RevenueSegment::Medium
        } else if revenue < self.high {
            RevenueSegment::High
        } else {
            RevenueSegment::VeryHigh
        }
    }
}

/// Quantile of ascending `sorted` values, interpolating linearly between
/// the two closest ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Summed `total_amount` per company. Rows without a company are skipped.
pub fn revenue_by_company(table: &LineItemTable) -> HashMap<String, f64> {
    let mut sums: HashMap<String, f64> = HashMap::new();
    for row in table.iter() {
        if let Some(company) = row.customer_company() {
            *sums.entry(company.to_string()).or_default() += row.total_amount();
        }
    }
    sums
}

// ---------------------------------------------------------------------------
// Derivation pass
// ---------------------------------------------------------------------------

/// Fill the derived columns of every row.
///
/// * `customer_created_date` – copy of `customer_created_at`
/// * `customer_tenure_months` – [`tenure_months`], 0 when the creation time is missing
/// * `customer_tenure_range` – [`TenureBucket`] label
/// * `revenue_segment` – [`RevenueSegment`] label of the row's company,
///   missing when the row has no company
pub fn derive_segments(mut table: LineItemTable, now: DateTime<Utc>) -> LineItemTable {
    let sums = revenue_by_company(&table);
    let company_sums: Vec<f64> = sums.values().copied().collect();
    let thresholds = RevenueThresholds::from_sums(&company_sums);
    if let Some(t) = &thresholds {
        log::debug!(
            "Revenue thresholds over {} companies: {:.2} / {:.2} / {:.2}",
            sums.len(),
            t.low,
            t.medium,
            t.high
        );
    }

    let segments: HashMap<&str, RevenueSegment> = match &thresholds {
        Some(t) => sums
            .iter()
            .map(|(company, revenue)| (company.as_str(), t.classify(*revenue)))
            .collect(),
        None => HashMap::new(),
    };

    for row in &mut table.rows {
        let created = row.customer_created_at();
        let months = created.map(|c| tenure_months(c, now)).unwrap_or(0);
        let segment = row
            .customer_company()
            .and_then(|c| segments.get(c))
            .map(|s| Cell::Text(s.label().to_string()))
            .unwrap_or(Cell::Missing);

        row.set(
            Column::CustomerCreatedDate,
            created.map(Cell::Timestamp).unwrap_or(Cell::Missing),
        );
        row.set(Column::CustomerTenureMonths, Cell::Integer(i64::from(months)));
        row.set(
            Column::CustomerTenureRange,
            Cell::Text(TenureBucket::from_months(months).label().to_string()),
        );
        row.set(Column::RevenueSegment, segment);
    }

    table
}
