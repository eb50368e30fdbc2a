//! Two-phase fetch orchestration.
//!
//! A run has two phases separated by a barrier:
//!
//! 1. **Discovery**: request page 0 of every (store, category) pair and plan
//!    the remaining page offsets from the reported total
//! 2. **Fan-out**: request every planned page
//!
//! The fan-out work list only exists once every discovery response is in, so
//! the phases never overlap. Inside a phase all requests are independent and
//! run concurrently, optionally capped by `max_in_flight`.
//!
//! Failures are data. A pair whose discovery call fails contributes no fan-out
//! requests and shows up in the [`RunResult`] with its error; every other pair
//! proceeds as normal.

use crate::api::{Transport, fetch};
use crate::models::{
    DiscoveryResult, FetchOutcome, Outcome, Pair, RunResult, UpstreamLimitWarning, WorkItem,
};
use crate::pagination::{DEFAULT_OFFSET_CEILING, DEFAULT_PAGE_SIZE, page_offsets};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Knobs shared by both phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    /// Products requested per page
    pub page_size: u32,
    /// Totals above this are clamped before planning offsets
    pub offset_ceiling: u32,
    /// Maximum concurrent requests per phase. `None` puts every request of a
    /// phase in flight at once, which is fine for small runs but opens one
    /// connection per page for large store x category grids.
    pub max_in_flight: Option<usize>,
    /// Per-call timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            offset_ceiling: DEFAULT_OFFSET_CEILING,
            max_in_flight: None,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

/// Run every item through the request unit concurrently.
///
/// Returns outcomes in the order of `items`, whatever order they completed in.
async fn fetch_all<T: Transport>(
    transport: &T,
    items: Vec<WorkItem>,
    settings: &FetchSettings,
) -> Vec<FetchOutcome> {
    if items.is_empty() {
        return Vec::new();
    }
    let limit = settings.max_in_flight.unwrap_or(items.len()).max(1);
    let page_size = settings.page_size;
    let timeout = settings.timeout;

    let mut outcomes: Vec<(usize, FetchOutcome)> = stream::iter(items.into_iter().enumerate())
        .map(|(i, item)| async move { (i, fetch(transport, item, page_size, timeout).await) })
        .buffer_unordered(limit)
        .collect()
        .await;

    outcomes.sort_unstable_by_key(|(i, _)| *i);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

/// Plan the fan-out for one pair from its discovery outcome.
fn plan(outcome: FetchOutcome, settings: &FetchSettings) -> DiscoveryResult {
    let item = &outcome.item;
    let page = match &outcome.outcome {
        Outcome::Success(page) if page.item_count > 0 => page,
        Outcome::Success(_) => {
            info!(store = %item.store, nav_param = %item.category, "No products for pair");
            return DiscoveryResult {
                outcome,
                page_offsets: Vec::new(),
                limit: None,
            };
        }
        Outcome::ApiError(_) | Outcome::Failed(_) => {
            warn!(
                store = %item.store,
                nav_param = %item.category,
                error = ?outcome.error(),
                "Discovery failed; pair contributes no further pages"
            );
            return DiscoveryResult {
                outcome,
                page_offsets: Vec::new(),
                limit: None,
            };
        }
    };

    let planned = page_offsets(page.total_products, settings.page_size, settings.offset_ceiling);
    let limit = planned.clamped_from.map(|reported| {
        let warning = UpstreamLimitWarning {
            store: item.store.clone(),
            category: item.category.clone(),
            reported,
            ceiling: settings.offset_ceiling,
        };
        warn!(
            store = %warning.store,
            nav_param = %warning.category,
            reported,
            ceiling = settings.offset_ceiling,
            "Too many products; only the first {} will be pulled",
            settings.offset_ceiling
        );
        warning
    });

    debug!(
        store = %item.store,
        nav_param = %item.category,
        total = page.total_products,
        pages = planned.offsets.len(),
        "Planned remaining pages"
    );

    DiscoveryResult {
        outcome,
        page_offsets: planned.offsets,
        limit,
    }
}

/// Request page 0 of every pair and plan its remaining pages.
///
/// Duplicate pairs are collapsed, so each pair's page 0 is requested exactly
/// once. Results come back in the (deduplicated) input order.
#[instrument(level = "info", skip_all, fields(pairs = pairs.len()))]
pub async fn discover<T: Transport>(
    transport: &T,
    pairs: &[Pair],
    settings: &FetchSettings,
) -> Vec<(Pair, DiscoveryResult)> {
    let unique: Vec<Pair> = pairs.iter().unique().cloned().collect();
    if unique.len() < pairs.len() {
        warn!(
            duplicates = pairs.len() - unique.len(),
            "Ignoring duplicate store/category pairs"
        );
    }

    let items = unique.iter().map(|pair| pair.at(0)).collect();
    let outcomes = fetch_all(transport, items, settings).await;

    let results: Vec<(Pair, DiscoveryResult)> = unique
        .into_iter()
        .zip(outcomes)
        .map(|(pair, outcome)| (pair, plan(outcome, settings)))
        .collect();

    info!(
        pairs = results.len(),
        ok = results.iter().filter(|(_, r)| r.outcome.is_success()).count(),
        further_pages = results.iter().map(|(_, r)| r.page_offsets.len()).sum::<usize>(),
        "Discovery complete"
    );
    results
}

/// The fan-out work list: each pair paired with its own planned offsets only.
///
/// Offset 0 and any triple seen before are skipped, so no item is ever
/// issued twice in a run.
pub fn fan_out_items(discoveries: &[(Pair, DiscoveryResult)]) -> Vec<WorkItem> {
    let mut issued: HashSet<WorkItem> = discoveries
        .iter()
        .map(|(_, result)| result.outcome.item.clone())
        .collect();

    discoveries
        .iter()
        .flat_map(|(pair, result)| result.page_offsets.iter().map(move |&offset| pair.at(offset)))
        .filter(|item| item.page_offset != 0 && issued.insert(item.clone()))
        .collect()
}

/// Request every planned page and wait for all of them.
///
/// A failing page never cancels its siblings; every outcome is returned, in
/// submission order.
#[instrument(level = "info", skip_all)]
pub async fn fan_out<T: Transport>(
    transport: &T,
    discoveries: &[(Pair, DiscoveryResult)],
    settings: &FetchSettings,
) -> Vec<FetchOutcome> {
    let items = fan_out_items(discoveries);
    let requested = items.len();
    info!(requests = requested, max_in_flight = ?settings.max_in_flight, "Starting fan-out");

    let outcomes = fetch_all(transport, items, settings).await;

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    info!(requests = requested, failed, "Fan-out complete");
    outcomes
}

/// Concatenate discovery and fan-out outcomes into a [`RunResult`].
pub fn combine(discoveries: Vec<(Pair, DiscoveryResult)>, fan_out: Vec<FetchOutcome>) -> RunResult {
    let mut result = RunResult {
        outcomes: Vec::with_capacity(discoveries.len() + fan_out.len()),
        warnings: Vec::new(),
    };
    for (_, discovery) in discoveries {
        result.outcomes.push(discovery.outcome);
        result.warnings.extend(discovery.limit);
    }
    result.outcomes.extend(fan_out);
    result
}

/// Discover, wait for every pair, fan out, and combine.
#[instrument(level = "info", skip_all, fields(pairs = pairs.len()))]
pub async fn run<T: Transport>(transport: &T, pairs: &[Pair], settings: &FetchSettings) -> RunResult {
    let discoveries = discover(transport, pairs, settings).await;
    let pages = fan_out(transport, &discoveries, settings).await;
    combine(discoveries, pages)
}
