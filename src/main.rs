use std::fs::File;

use anyhow::{Context, Result};
use billing_lens::{Args, Dashboard, DashboardConfig, Refresh, SessionState};
use chrono::Utc;
use clap::Parser;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = DashboardConfig::from_env().context("reading configuration")?;
    log::info!("Using data source {}", config.data_path.display());
    let mut dashboard = Dashboard::new(config);

    if let Some(path) = &args.session {
        let file = File::open(path)
            .with_context(|| format!("opening session file {}", path.display()))?;
        dashboard.state = serde_json::from_reader::<_, SessionState>(file)
            .with_context(|| format!("parsing session file {}", path.display()))?;
    }

    let view = match dashboard.refresh(Utc::now()).context("loading line items")? {
        Refresh::Ready(view) => view,
        Refresh::Invalid { message, bounds } => {
            if let Some(b) = bounds {
                eprintln!("Available dates: {} to {}", b.min, b.max);
            }
            anyhow::bail!("{message}");
        }
    };

    println!(
        "{} line items, total revenue {:.2}",
        view.table.len(),
        view.table.total_revenue()
    );
    for facet in &view.facets {
        let selected = if facet.selected.is_empty() {
            "all".to_string()
        } else {
            facet.selected.iter().cloned().collect::<Vec<_>>().join(", ")
        };
        println!(
            "  {:<20} {:>3} options  selected: {selected}",
            facet.label,
            facet.options.len()
        );
    }

    if let Some(path) = &args.export {
        let file = File::create(path)
            .with_context(|| format!("creating export file {}", path.display()))?;
        view.table
            .write_csv(file)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Exported {} rows to {}", view.table.len(), path.display());
    }

    Ok(())
}
