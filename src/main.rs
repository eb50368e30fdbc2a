//! # Catalog Scraper
//!
//! Pages through a store catalog search API for every combination of store
//! and category, then flattens the products and their per-location stock into
//! a CSV file.
//!
//! ## Usage
//!
//! ```sh
//! catalog_scraper --store 589,6177 --category 5yc1vZc3poZ21j,5yc1vZc3poZgt7
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Sources** (optional): resolve store names and explore categories via the site maps
//! 2. **Discovery**: fetch page 0 of every (store, category) pair to learn its total
//! 3. **Fan-out**: fetch every remaining page concurrently
//! 4. **Output**: flatten to rows, append to CSV, optionally dump raw JSON

use chrono::Local;
use clap::Parser;
use itertools::Itertools;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod models;
mod orchestrator;
mod outputs;
mod pagination;
mod sources;
#[cfg(test)]
mod test_support;
mod utils;

use api::HttpTransport;
use cli::Cli;
use config::{FileConfig, RunConfig};
use models::RunSummary;
use outputs::{json, rows, table};
use sources::SourceError;
use utils::{ensure_parent_writable, ensure_writable_dir};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("catalog_scraper starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let file_config = match args.config.as_deref() {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let mut config = RunConfig::resolve(&args, file_config)?;

    if args.is_listing() {
        return list_sources(&args).await;
    }
    config.require_targets()?;

    // ---- Resolve store names ----
    if !config.store_names.is_empty() {
        let client = sources::client()?;
        let stores = sources::stores::fetch_stores(&client).await?;
        let ids = sources::stores::resolve_store_ids(&stores, &config.store_names)?;
        info!(names = ?config.store_names, ids = ?ids, "Resolved store names");
        config.stores = std::mem::take(&mut config.stores)
            .into_iter()
            .chain(ids)
            .unique()
            .collect();
    }

    // Early check: output locations must be writable before spending requests
    if let Err(e) = ensure_parent_writable(&config.output).await {
        error!(path = %config.output, error = %e, "Output location is not writable");
        return Err(e);
    }
    if let Some(dir) = config.raw_json_dir.as_deref() {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "Raw JSON directory is not writable");
            return Err(e);
        }
    }

    // ---- Discovery + fan-out ----
    let pairs = config.pairs();
    info!(
        stores = config.stores.len(),
        categories = config.categories.len(),
        pairs = pairs.len(),
        page_size = config.fetch.page_size,
        offset_ceiling = config.fetch.offset_ceiling,
        max_in_flight = ?config.fetch.max_in_flight,
        timeout = ?config.fetch.timeout,
        "Starting run"
    );

    let transport = HttpTransport::new(config.endpoint.clone())?;
    let result = orchestrator::run(&transport, &pairs, &config.fetch).await;
    let fetched_at = Local::now();

    let summary = RunSummary::from_result(&result);
    info!(
        outcomes = result.len(),
        pairs = summary.pairs,
        pairs_with_items = summary.pairs_with_items,
        empty_pairs = summary.empty_pairs,
        api_error_pairs = summary.api_error_pairs,
        failed_pairs = summary.failed_pairs,
        fan_out_requests = summary.fan_out_requests,
        fan_out_failures = summary.fan_out_failures,
        warnings = summary.warnings,
        "Fetch complete"
    );
    for warning in &result.warnings {
        warn!(%warning, "Upstream pagination limit");
    }
    for failure in result.failures() {
        debug!(item = %failure.item, error = ?failure.error(), "Failed work item");
    }
    info!(extract_ms = start_time.elapsed().as_millis() as u64, "Extract time");

    // ---- Output ----
    if result.is_empty() {
        warn!("Run produced no outcomes; nothing to write");
        return Ok(());
    }
    if let Some(dir) = config.raw_json_dir.as_deref() {
        if let Err(e) = json::write_run_result(&result, dir, fetched_at).await {
            error!(error = %e, "Failed to write raw JSON");
        }
    }

    let rows = rows::flatten(&result, fetched_at);
    info!(rows = rows.len(), "Flattened results");
    let written = table::append_rows(&config.output, &rows)?;
    info!(path = %config.output, rows = written, "Wrote CSV");

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Print stores, categories or brands as JSON on stdout.
#[instrument(level = "info", skip_all)]
async fn list_sources(args: &Cli) -> Result<(), Box<dyn Error>> {
    let client = sources::client()?;

    if args.list_stores {
        let stores = sources::stores::fetch_stores(&client).await?;
        println!("{}", serde_json::to_string_pretty(&stores)?);
    }

    if args.list_categories {
        let categories = sources::categories::fetch_categories(&client).await?;
        println!("{}", serde_json::to_string_pretty(&categories)?);
    }

    if let Some(spec) = args.list_brands.as_deref() {
        let Some((department, subcategory)) = spec.split_once('/') else {
            return Err(format!("expected CATEGORY/SUBCATEGORY, got {spec:?}").into());
        };
        let categories = sources::categories::fetch_categories(&client).await?;
        let listing = categories
            .iter()
            .find(|c| c.name == department)
            .and_then(|c| c.subcategory(subcategory))
            .ok_or_else(|| SourceError::NotFound {
                kind: "subcategory",
                name: spec.to_string(),
            })?;
        let brands = sources::brands::fetch_brands(&client, department, &listing.url).await?;
        println!("{}", serde_json::to_string_pretty(&brands)?);
    }

    Ok(())
}
