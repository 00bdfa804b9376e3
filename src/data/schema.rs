use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ColumnKind – how a column is parsed and normalised
// ---------------------------------------------------------------------------

/// Declared kind of a column. Drives cell parsing at load time and the
/// value-cleaning rule applied before a value is offered as a filter option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Opaque id, kept as text.
    Identifier,
    /// UTC-aware timestamp; unparsable input becomes missing.
    Timestamp,
    /// Decimal amount or quantity.
    Numeric,
    /// Free categorical text compared verbatim.
    SimpleCategorical,
    /// `"<prefix> - <suffix>"` text whose display value is the suffix.
    CompoundCategorical,
    /// Categorical text compared case-insensitively (lowercased).
    LowercaseCategorical,
    /// Computed by segment derivation, never read from the source.
    Derived,
}

// ---------------------------------------------------------------------------
// Column – the fixed line-item schema
// ---------------------------------------------------------------------------

macro_rules! columns {
    ($($variant:ident => $name:literal, $kind:ident;)*) => {
        /// Every column of a line-item table, in table order: the source
        /// columns first, then the derived segment columns.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum Column {
            $(
                #[serde(rename = $name)]
                $variant,
            )*
        }

        impl Column {
            /// All columns in table order.
            pub const ALL: &'static [Column] = &[$(Column::$variant,)*];

            /// Column header as it appears in the source data.
            pub fn name(self) -> &'static str {
                match self {
                    $(Column::$variant => $name,)*
                }
            }

            pub fn kind(self) -> ColumnKind {
                match self {
                    $(Column::$variant => ColumnKind::$kind,)*
                }
            }
        }
    };
}

columns! {
    HeaderId => "header_id", Identifier;
    LineItemId => "line_item_id", Identifier;
    LineItemIndex => "line_item_index", Identifier;
    RecordType => "record_type", SimpleCategorical;
    CreatedAt => "created_at", Timestamp;
    Currency => "currency", SimpleCategorical;
    HeaderStatus => "header_status", SimpleCategorical;
    ProductId => "product_id", Identifier;
    ProductName => "product_name", CompoundCategorical;
    TransactionType => "transaction_type", SimpleCategorical;
    BillingType => "billing_type", LowercaseCategorical;
    ProductType => "product_type", SimpleCategorical;
    Quantity => "quantity", Numeric;
    UnitAmount => "unit_amount", Numeric;
    DiscountAmount => "discount_amount", Numeric;
    TaxAmount => "tax_amount", Numeric;
    TotalAmount => "total_amount", Numeric;
    PaymentId => "payment_id", Identifier;
    PaymentMethodId => "payment_method_id", Identifier;
    PaymentMethod => "payment_method", SimpleCategorical;
    PaymentAt => "payment_at", Timestamp;
    FeeAmount => "fee_amount", Numeric;
    RefundAmount => "refund_amount", Numeric;
    SubscriptionId => "subscription_id", Identifier;
    SubscriptionPlan => "subscription_plan", CompoundCategorical;
    SubscriptionPeriodStartedAt => "subscription_period_started_at", Timestamp;
    SubscriptionPeriodEndedAt => "subscription_period_ended_at", Timestamp;
    SubscriptionStatus => "subscription_status", SimpleCategorical;
    CustomerId => "customer_id", Identifier;
    CustomerCreatedAt => "customer_created_at", Timestamp;
    CustomerLevel => "customer_level", SimpleCategorical;
    CustomerName => "customer_name", SimpleCategorical;
    CustomerCompany => "customer_company", SimpleCategorical;
    CustomerEmail => "customer_email", SimpleCategorical;
    CustomerCity => "customer_city", SimpleCategorical;
    CustomerCountry => "customer_country", SimpleCategorical;
    CustomerCreatedDate => "customer_created_date", Derived;
    CustomerTenureMonths => "customer_tenure_months", Derived;
    CustomerTenureRange => "customer_tenure_range", Derived;
    RevenueSegment => "revenue_segment", Derived;
}

/// Number of columns read from the data source.
pub const SOURCE_COLUMN_COUNT: usize = 36;

impl Column {
    /// Columns that must be present in every data source.
    pub fn source() -> &'static [Column] {
        &Column::ALL[..SOURCE_COLUMN_COUNT]
    }

    /// Columns computed by segment derivation.
    pub fn derived() -> &'static [Column] {
        &Column::ALL[SOURCE_COLUMN_COUNT..]
    }

    /// Position of this column's cell within a row.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_derived(self) -> bool {
        self.kind() == ColumnKind::Derived
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown column '{0}'")]
pub struct UnknownColumn(pub String);

impl FromStr for Column {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_table_order() {
        for (i, col) in Column::ALL.iter().enumerate() {
            assert_eq!(col.index(), i, "{col}");
        }
        assert_eq!(Column::ALL.len(), SOURCE_COLUMN_COUNT + 4);
    }

    #[test]
    fn source_and_derived_split() {
        assert!(Column::source().iter().all(|c| !c.is_derived()));
        assert!(Column::derived().iter().all(|c| c.is_derived()));
        assert_eq!(Column::source().last(), Some(&Column::CustomerCountry));
        assert_eq!(Column::derived().first(), Some(&Column::CustomerCreatedDate));
    }

    #[test]
    fn parse_by_name() {
        assert_eq!("billing_type".parse::<Column>(), Ok(Column::BillingType));
        assert_eq!(
            "revenue_segment".parse::<Column>(),
            Ok(Column::RevenueSegment)
        );
        assert_eq!(
            "no_such".parse::<Column>(),
            Err(UnknownColumn("no_such".into()))
        );
    }

    #[test]
    fn serde_uses_source_names() {
        let json = serde_json::to_string(&Column::SubscriptionPeriodEndedAt).unwrap();
        assert_eq!(json, "\"subscription_period_ended_at\"");
        let back: Column = serde_json::from_str("\"customer_city\"").unwrap();
        assert_eq!(back, Column::CustomerCity);
    }

    #[test]
    fn declared_kinds() {
        assert_eq!(Column::ProductName.kind(), ColumnKind::CompoundCategorical);
        assert_eq!(Column::SubscriptionPlan.kind(), ColumnKind::CompoundCategorical);
        assert_eq!(Column::BillingType.kind(), ColumnKind::LowercaseCategorical);
        assert_eq!(Column::CreatedAt.kind(), ColumnKind::Timestamp);
        assert_eq!(Column::TotalAmount.kind(), ColumnKind::Numeric);
        assert_eq!(Column::CustomerCity.kind(), ColumnKind::SimpleCategorical);
    }
}
