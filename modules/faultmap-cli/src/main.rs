use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use faultmap_common::Config;
use faultmap_geo::{BoundarySet, ParishResolver};
use faultmap_store::{migrate::migrate, PgOutageFeed, PgReportStore};
use faultmap_triage::{classifier_from_config, AreaFilter, ReportService};

#[derive(Parser)]
#[command(name = "faultmap", about = "Disaster infrastructure report triage")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply database migrations
    Migrate,
    /// Resolve parishes for reports stored without one
    Backfill {
        /// Reports fetched per page
        #[arg(long, default_value_t = 500)]
        batch_size: usize,
    },
    /// Active reports, per-type counts and hotspots
    Situation {
        #[arg(long)]
        concelho: Option<String>,
        #[arg(long)]
        parish: Option<String>,
    },
    /// Per-parish report rollup for one concelho
    Status {
        #[arg(long)]
        concelho: String,
    },
    /// Per-parish power-source inference for one concelho
    Power {
        #[arg(long)]
        concelho: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("faultmap=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::from_env();
    config.log_redacted();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config.require_database_url())
        .await
        .context("Failed to connect to Postgres")?;

    if let Command::Migrate = cli.command {
        return migrate(&pool).await;
    }

    let boundaries = BoundarySet::load(&config.boundaries_path)
        .with_context(|| format!("Failed to load boundaries from {}", config.boundaries_path))?;
    let resolver = ParishResolver::new(boundaries);
    info!(
        concelhos = resolver.concelhos().len(),
        path = config.boundaries_path.as_str(),
        "Boundaries loaded"
    );

    let service = ReportService::builder()
        .store(Arc::new(PgReportStore::new(pool.clone())))
        .outages(Arc::new(PgOutageFeed::new(pool)))
        .resolver(Arc::new(resolver))
        .classifier(classifier_from_config(&config))
        .district(config.district_bounds)
        .build();

    let now = Utc::now();
    match cli.command {
        Command::Migrate => Ok(()),
        Command::Backfill { batch_size } => {
            print_json(&service.backfill_parishes(batch_size).await?)
        }
        Command::Situation { concelho, parish } => {
            let filter = AreaFilter { concelho, parish };
            print_json(&service.situation(&filter, now).await?)
        }
        Command::Status { concelho } => print_json(&service.area_status(&concelho, now).await?),
        Command::Power { concelho } => print_json(&service.power_sources(&concelho, now).await?),
    }
}
