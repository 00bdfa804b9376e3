//! Data layer: schema, loading, segment derivation, and filtering.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse + type cells → LineItemTable   (memoised by cache)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  created_at ∈ [start, end]
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ segment   │  tenure bucket, revenue quartile segment
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  ordered facets; options via normalize
//!   └──────────┘
//! ```

pub mod cache;
pub mod filter;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod schema;
pub mod segment;
