#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for fetching UK police incident data.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use crime_hotspots_cache::CacheStore;
use crime_hotspots_cli_utils::IndicatifProgress;
use crime_hotspots_geography::normalize::{DEFAULT_NAME_PROPERTY, area_names, load_areas};
use crime_hotspots_incident_models::{MonthToken, UsageKind};
use crime_hotspots_ingest::{Session, Settings, parse_area_list, select_category};
use crime_hotspots_source::abort::AbortSignal;
use crime_hotspots_source::aggregate::AggregateRequest;
use crime_hotspots_source::api::PoliceApiClient;
use crime_hotspots_source::window;

#[derive(Parser)]
#[command(name = "crime_hotspots_ingest", about = "UK police incident fetcher")]
struct Cli {
    /// Settings file layered over the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the crime categories published by the API
    Categories {
        /// Month the categories apply to (yyyy-mm); latest if omitted
        #[arg(long)]
        date: Option<MonthToken>,
    },
    /// List the area names in a boundary file
    Areas {
        /// `GeoJSON` `FeatureCollection` of area boundaries
        #[arg(long)]
        boundaries: PathBuf,
        /// Feature property holding each area's name
        #[arg(long, default_value = DEFAULT_NAME_PROPERTY)]
        name_property: String,
    },
    /// Fetch, resolve, and cache incidents for a set of areas
    Fetch {
        /// `GeoJSON` `FeatureCollection` of area boundaries
        #[arg(long)]
        boundaries: PathBuf,
        /// Comma-separated area names (e.g., "Leeds Central,Leeds North West")
        #[arg(long)]
        areas: String,
        /// Feature property holding each area's name
        #[arg(long, default_value = DEFAULT_NAME_PROPERTY)]
        name_property: String,
        /// "crime" or "search"
        #[arg(long, default_value = "crime")]
        usage: UsageKind,
        /// Crime category name or slug; all crime if omitted
        #[arg(long)]
        category: Option<String>,
        /// Boundary kind, used as the top-level cache directory
        #[arg(long, default_value = "constituencies")]
        location_type: String,
        /// Plan the window as if today were this date (yyyy-mm-dd)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Fetch everything from the API, ignoring cached months
        #[arg(long)]
        no_cache: bool,
        /// Do not write fetched months back to the cache
        #[arg(long)]
        no_write_cache: bool,
        /// Export the resolved incidents to this CSV file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Delete cached data for a boundary kind
    ClearCache {
        #[arg(long, default_value = "constituencies")]
        location_type: String,
    },
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crime_hotspots_cli_utils::init_logger();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let abort = AbortSignal::new();
    {
        let abort = abort.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, cancelling outstanding requests...");
                abort.abort();
            }
        });
    }

    let limiter = Arc::new(settings.rate_limiter());

    match cli.command {
        Commands::Categories { date } => {
            let client = PoliceApiClient::new(
                settings.client_config(UsageKind::Crime),
                limiter,
                abort,
            )?;
            let categories = client.categories(date).await?;
            println!("{:<40} SLUG", "NAME");
            println!("{}", "-".repeat(70));
            for category in &categories {
                println!("{:<40} {}", category.name, category.slug);
            }
        }
        Commands::Areas {
            boundaries,
            name_property,
        } => {
            let geojson = std::fs::read_to_string(&boundaries)?;
            for name in area_names(&geojson, &name_property)? {
                println!("{name}");
            }
        }
        Commands::Fetch {
            boundaries,
            areas,
            name_property,
            usage,
            category,
            location_type,
            today,
            no_cache,
            no_write_cache,
            output,
        } => {
            let start = Instant::now();

            let names = parse_area_list(&areas);
            if names.is_empty() {
                return Err("No area names given".into());
            }
            let geojson = std::fs::read_to_string(&boundaries)?;
            let areas = load_areas(
                &geojson,
                &name_property,
                &names,
                usage,
                settings.simplify_tolerance,
            )?;

            let client =
                PoliceApiClient::new(settings.client_config(usage), limiter, abort.clone())?;

            let categories = if usage.uses_category() {
                client.categories(None).await?
            } else {
                Vec::new()
            };
            let category = select_category(usage, &categories, category.as_deref())?;

            let today = today.unwrap_or_else(|| chrono::Utc::now().date_naive());
            let months = window::plan_with_len(today, settings.window_months);
            if let (Some(first), Some(last)) = (months.first(), months.last()) {
                log::info!("Window: {first} to {last}");
            }

            let store = settings.cache_store();
            let request = AggregateRequest {
                areas,
                months,
                location_type,
                category,
                max_concurrency: settings.max_concurrency,
                failure_policy: settings.failure_policy,
            };
            let mut session = Session::new(request, usage);

            let progress = IndicatifProgress::units_bar(&multi, "Fetching incidents...");
            let read_from = (!no_cache).then_some(&store as &dyn CacheStore);
            session
                .aggregate(&client, read_from, progress.as_ref(), &abort)
                .await?;

            let has_records = session
                .report()
                .is_some_and(|report| !report.records.is_empty());

            if has_records {
                let resolved = session.resolve(&settings.resolver())?;
                log::info!(
                    "Resolved {} generic locations",
                    resolved.mappings().len()
                );

                if no_write_cache {
                    log::info!("Skipping cache write");
                } else {
                    session.write_cache(&store)?;
                }

                if let Some(output) = output {
                    session.export_csv(&output)?;
                }
            } else {
                log::warn!("No incidents found for the requested areas and months");
            }

            println!(
                "{:<40} {:>8} {:>9} {:>6} {:>8}",
                "AREA", "RECORDS", "RESOLVED", "404s", "FAILURES"
            );
            println!("{}", "-".repeat(75));
            for area in session.summary() {
                println!(
                    "{:<40} {:>8} {:>9} {:>6} {:>8}",
                    area.area_name, area.records, area.resolved, area.not_found, area.failures
                );
            }

            log::info!("Done in {:.1}s", start.elapsed().as_secs_f64());
        }
        Commands::ClearCache { location_type } => {
            let store = settings.cache_store();
            store.clear(&location_type)?;
            log::info!(
                "Cleared {location_type} cache under {}",
                store.root().display()
            );
        }
    }

    Ok(())
}
