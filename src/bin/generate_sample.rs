use std::path::Path;

use anyhow::{Context, Result};
use billing_lens::Column;
use chrono::{Duration, TimeZone, Utc};

/// Minimal deterministic PRNG (splitmix64)
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        SimpleRng { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len() as u64) as usize]
    }
}

struct Customer {
    id: String,
    name: String,
    company: &'static str,
    city: &'static str,
    country: &'static str,
    level: &'static str,
    created_at: String,
}

const COMPANIES: [&str; 8] = [
    "Acme Corp",
    "Globex",
    "Initech",
    "Umbrella",
    "Hooli",
    "Stark Industries",
    "Wayne Enterprises",
    "Soylent",
];
const CITIES: [(&str, &str); 5] = [
    ("Oslo", "NO"),
    ("Lima", "PE"),
    ("Austin", "US"),
    ("Berlin", "DE"),
    ("Osaka", "JP"),
];
const PRODUCTS: [(&str, f64); 4] = [
    ("Acme - Starter", 19.0),
    ("Acme - Pro Plan", 49.0),
    ("Acme -Team Plan", 99.0),
    ("Enterprise", 499.0),
];
const PLANS: [&str; 3] = ["Monthly - Standard", "Annual - Standard", "Annual -Premium"];
const BILLING_TYPES: [&str; 3] = ["CREDIT_CARD", "Invoice", "ACH"];
const PAYMENT_METHODS: [(&str, &str); 3] = [
    ("pm_1", "Visa"),
    ("pm_2", "Mastercard"),
    ("pm_3", "Bank Transfer"),
];
const STATUSES: [&str; 3] = ["active", "canceled", "past_due"];

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let today = Utc
        .with_ymd_and_hms(2024, 6, 30, 12, 0, 0)
        .single()
        .context("building reference date")?;

    let customers: Vec<Customer> = (0..24)
        .map(|i| {
            let (city, country) = CITIES[rng.below(CITIES.len() as u64) as usize];
            let age_days = 30 + rng.below(2400) as i64;
            Customer {
                id: format!("cus_{i:04}"),
                name: format!("Customer {i}"),
                company: COMPANIES[i % COMPANIES.len()],
                city,
                country,
                level: rng.pick(&["bronze", "silver", "gold"]),
                // A few customers have no known creation date.
                created_at: if i % 11 == 10 {
                    String::new()
                } else {
                    (today - Duration::days(age_days)).to_rfc3339()
                },
            }
        })
        .collect();

    let output_path = Path::new("data/example__line_item_enhanced.csv");
    if let Some(dir) = output_path.parent() {
        std::fs::create_dir_all(dir).context("creating output directory")?;
    }
    let mut writer = csv::Writer::from_path(output_path).context("creating output file")?;
    writer.write_record(Column::source().iter().map(|c| c.name()))?;

    let mut line_items = 0;
    for header in 0..400u64 {
        let customer = &customers[rng.below(customers.len() as u64) as usize];
        let created = today
            - Duration::days(rng.below(900) as i64)
            - Duration::minutes(rng.below(1440) as i64);
        let (pm_id, pm_name) = PAYMENT_METHODS[rng.below(PAYMENT_METHODS.len() as u64) as usize];
        let billing = rng.pick(&BILLING_TYPES);
        let plan = rng.pick(&PLANS);
        let status = rng.pick(&STATUSES);
        let period_start = created - Duration::days(rng.below(28) as i64);
        let period_end = period_start + Duration::days(30);

        let lines = 1 + rng.below(3);
        for index in 0..lines {
            let (product, price) = PRODUCTS[rng.below(PRODUCTS.len() as u64) as usize];
            let quantity = 1 + rng.below(5);
            let discount = if rng.below(5) == 0 { price * 0.1 } else { 0.0 };
            let tax = (price * quantity as f64 - discount) * 0.08;
            let total = price * quantity as f64 - discount + tax;
            let refunded = if status == "canceled" { total } else { 0.0 };

            let values: Vec<String> = Column::source()
                .iter()
                .map(|col| match col {
                    Column::HeaderId => format!("in_{header:05}"),
                    Column::LineItemId => format!("li_{header:05}_{index}"),
                    Column::LineItemIndex => index.to_string(),
                    Column::RecordType => "invoice".to_string(),
                    Column::CreatedAt => created.format("%Y-%m-%d %H:%M:%S%:z").to_string(),
                    Column::Currency => "usd".to_string(),
                    Column::HeaderStatus => "paid".to_string(),
                    Column::ProductId => format!("prod_{}", product.len()),
                    Column::ProductName => product.to_string(),
                    Column::TransactionType => "charge".to_string(),
                    Column::BillingType => billing.to_string(),
                    Column::ProductType => "service".to_string(),
                    Column::Quantity => quantity.to_string(),
                    Column::UnitAmount => format!("{price:.2}"),
                    Column::DiscountAmount => format!("{discount:.2}"),
                    Column::TaxAmount => format!("{tax:.2}"),
                    Column::TotalAmount => format!("{total:.2}"),
                    Column::PaymentId => format!("py_{header:05}"),
                    Column::PaymentMethodId => pm_id.to_string(),
                    Column::PaymentMethod => pm_name.to_string(),
                    Column::PaymentAt => (created + Duration::minutes(5)).to_rfc3339(),
                    Column::FeeAmount => format!("{:.2}", total * 0.029),
                    Column::RefundAmount => format!("{refunded:.2}"),
                    Column::SubscriptionId => format!("sub_{}", customer.id),
                    Column::SubscriptionPlan => plan.to_string(),
                    Column::SubscriptionPeriodStartedAt => period_start.to_rfc3339(),
                    Column::SubscriptionPeriodEndedAt => period_end.to_rfc3339(),
                    Column::SubscriptionStatus => status.to_string(),
                    Column::CustomerId => customer.id.clone(),
                    Column::CustomerCreatedAt => customer.created_at.clone(),
                    Column::CustomerLevel => customer.level.to_string(),
                    Column::CustomerName => customer.name.clone(),
                    Column::CustomerCompany => customer.company.to_string(),
                    Column::CustomerEmail => format!("{}@example.com", customer.id),
                    Column::CustomerCity => customer.city.to_string(),
                    Column::CustomerCountry => customer.country.to_string(),
                    _ => String::new(),
                })
                .collect();
            writer.write_record(&values)?;
            line_items += 1;
        }
    }
    writer.flush()?;

    println!(
        "Wrote {line_items} line items for {} customers to {}",
        customers.len(),
        output_path.display()
    );
    Ok(())
}
