use std::path::PathBuf;

use backend::store::CrimeStore;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Validate a Safe Stride crime dataset JSON file"
)]
struct Args {
    /// Path to the dataset JSON ({"cities": [...], "incidents": [...]})
    #[arg(long)]
    dataset: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let store = CrimeStore::from_file(&args.dataset)?;
    tracing::info!(
        "dataset ok: {} cities, {} incidents",
        store.cities().len(),
        store.incidents().len()
    );

    for city in store.cities() {
        let count = store
            .incidents()
            .iter()
            .filter(|incident| {
                incident
                    .city
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(&city.name))
            })
            .count();
        if count == 0 {
            tracing::warn!(city = %city.name, "city has no incidents; proximity fallback will be empty there");
        } else {
            tracing::info!(city = %city.name, incidents = count);
        }
    }

    Ok(())
}
