//! Data models for work items, fetch outcomes and run results.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Pair`]: One (store, category) combination driving one catalog query
//! - [`WorkItem`]: One concrete page request (pair + page offset)
//! - [`FetchOutcome`]: The tagged result of executing a single [`WorkItem`]
//! - [`RunResult`]: Every outcome of a run, discovery first, then fan-out
//!
//! Outcomes are resolved once at the request boundary into the closed
//! [`Outcome`] type, so downstream code matches over three variants instead of
//! probing the response body again.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A single (store, category) combination.
///
/// Both identifiers are opaque strings: stores are numeric IDs from the store
/// sitemap (e.g. `"589"`), categories are navigation parameters
/// (e.g. `"5yc1vZc3poZ21j"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pair {
    /// Store ID passed as `storeId`
    pub store: String,
    /// Category navigation parameter passed as `navParam`
    pub category: String,
}

impl Pair {
    pub fn new(store: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            category: category.into(),
        }
    }

    /// The work item for one page of this pair.
    pub fn at(&self, page_offset: u32) -> WorkItem {
        WorkItem {
            store: self.store.clone(),
            category: self.category.clone(),
            page_offset,
        }
    }
}

/// One page of one (store, category) pair.
///
/// Identity is the whole triple. Serialized with the upstream names
/// (`navParam`, `startIndex`) so raw dumps line up with the CSV columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkItem {
    /// Store ID passed as `storeId`
    pub store: String,
    /// Category navigation parameter
    #[serde(rename = "navParam")]
    pub category: String,
    /// Index of the first product on the page; 0 for discovery
    #[serde(rename = "startIndex")]
    pub page_offset: u32,
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.store, self.category, self.page_offset)
    }
}

/// Why a request produced no usable payload.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchError {
    /// Connection or network failure before a response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The per-call timeout elapsed.
    #[error("request timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// The server answered with a non-2xx status.
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Body was not JSON, or lacked the fields read for pagination.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// A successful search response.
///
/// `body` is the response exactly as received. `total_products` and
/// `item_count` are the only two fields the orchestrator reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// `searchReport.totalProducts` as reported, before clamping
    pub total_products: u64,
    /// Number of products on this page
    pub item_count: usize,
    /// Parsed response body
    pub body: Value,
}

/// The tagged result of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "snake_case")]
pub enum Outcome {
    Success(SearchPage),
    /// The GraphQL layer answered with an `errors` field.
    ApiError(String),
    Failed(FetchError),
}

/// A [`WorkItem`] together with what happened when it was requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchOutcome {
    /// The request this outcome belongs to
    #[serde(flatten)]
    pub item: WorkItem,
    /// What the request produced
    pub outcome: Outcome,
}

impl FetchOutcome {
    pub fn new(item: WorkItem, outcome: Outcome) -> Self {
        Self { item, outcome }
    }

    pub fn page(&self) -> Option<&SearchPage> {
        match &self.outcome {
            Outcome::Success(page) => Some(page),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// Human-readable error description, if this outcome carries one.
    pub fn error(&self) -> Option<String> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::ApiError(message) => Some(format!("API error: {message}")),
            Outcome::Failed(e) => Some(e.to_string()),
        }
    }
}

/// A reported total above the pagination ceiling.
///
/// The upstream service returns inconsistent or empty pages past the ceiling,
/// so the total is clamped. This is non-fatal and recorded on the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamLimitWarning {
    /// Store ID of the affected pair
    pub store: String,
    /// Category of the affected pair
    #[serde(rename = "navParam")]
    pub category: String,
    /// Total the service reported
    pub reported: u64,
    /// Ceiling the total was clamped to
    pub ceiling: u32,
}

impl fmt::Display for UpstreamLimitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} reports {} products; only the first {} can be paged",
            self.store, self.category, self.reported, self.ceiling
        )
    }
}

/// What discovery learned about a single pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryResult {
    /// Outcome of the page-0 request
    pub outcome: FetchOutcome,
    /// Further page offsets to request, ascending, never containing 0.
    pub page_offsets: Vec<u32>,
    /// Set when the reported total was clamped
    pub limit: Option<UpstreamLimitWarning>,
}

/// Every outcome of a run.
///
/// `outcomes` holds one discovery outcome per pair (in pair order) followed by
/// every fan-out outcome (in submission order).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Discovery outcomes, then fan-out outcomes
    pub outcomes: Vec<FetchOutcome>,
    /// One entry per clamped pair, in pair order
    pub warnings: Vec<UpstreamLimitWarning>,
}

impl RunResult {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Counts derived from a [`RunResult`] for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Pairs that went through discovery
    pub pairs: usize,
    /// Pairs whose first page carried items.
    pub pairs_with_items: usize,
    /// Pairs that answered successfully with zero items.
    pub empty_pairs: usize,
    /// Pairs whose first page returned GraphQL `errors`
    pub api_error_pairs: usize,
    /// Pairs whose first page failed outright
    pub failed_pairs: usize,
    /// Requests made after discovery
    pub fan_out_requests: usize,
    /// Fan-out requests that did not succeed
    pub fan_out_failures: usize,
    /// Clamped pairs
    pub warnings: usize,
}

impl RunSummary {
    /// Summarize a run. Discovery outcomes are the ones at offset 0.
    pub fn from_result(result: &RunResult) -> Self {
        let mut summary = Self {
            warnings: result.warnings.len(),
            ..Self::default()
        };
        for outcome in &result.outcomes {
            if outcome.item.page_offset == 0 {
                summary.pairs += 1;
                match &outcome.outcome {
                    Outcome::Success(page) if page.item_count == 0 => summary.empty_pairs += 1,
                    Outcome::Success(_) => summary.pairs_with_items += 1,
                    Outcome::ApiError(_) => summary.api_error_pairs += 1,
                    Outcome::Failed(_) => summary.failed_pairs += 1,
                }
            } else {
                summary.fan_out_requests += 1;
                if !outcome.is_success() {
                    summary.fan_out_failures += 1;
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn success(item: WorkItem, total: u64, items: usize) -> FetchOutcome {
        FetchOutcome::new(
            item,
            Outcome::Success(SearchPage {
                total_products: total,
                item_count: items,
                body: json!({}),
            }),
        )
    }

    #[test]
    fn test_pair_at_builds_work_item() {
        let pair = Pair::new("589", "5yc1vZc3poZ21j");
        let item = pair.at(96);
        assert_eq!(item.store, "589");
        assert_eq!(item.category, "5yc1vZc3poZ21j");
        assert_eq!(item.page_offset, 96);
        assert_eq!(item.to_string(), "589/5yc1vZc3poZ21j@96");
    }

    #[test]
    fn test_work_item_serializes_upstream_names() {
        let item = Pair::new("589", "A").at(48);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, json!({"store": "589", "navParam": "A", "startIndex": 48}));
    }

    #[test]
    fn test_fetch_outcome_error_text() {
        let item = Pair::new("589", "A").at(0);
        let failed = FetchOutcome::new(item.clone(), Outcome::Failed(FetchError::HttpStatus(503)));
        assert_eq!(failed.error().as_deref(), Some("HTTP status 503"));
        assert!(failed.page().is_none());

        let api = FetchOutcome::new(item.clone(), Outcome::ApiError("bad navParam".into()));
        assert_eq!(api.error().as_deref(), Some("API error: bad navParam"));

        let ok = success(item, 10, 10);
        assert!(ok.error().is_none());
        assert_eq!(ok.page().map(|p| p.total_products), Some(10));
    }

    #[test]
    fn test_fetch_outcome_serialization_is_flat() {
        let outcome = FetchOutcome::new(
            Pair::new("6177", "B").at(0),
            Outcome::Failed(FetchError::Timeout { millis: 250 }),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["store"], "6177");
        assert_eq!(json["startIndex"], 0);
        assert_eq!(json["outcome"]["status"], "failed");
        assert_eq!(json["outcome"]["payload"]["kind"], "timeout");

        let back: FetchOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);
    }

    #[test]
    fn test_run_summary_counts() {
        let a = Pair::new("589", "A");
        let b = Pair::new("6177", "B");
        let c = Pair::new("6177", "C");
        let d = Pair::new("589", "D");
        let result = RunResult {
            outcomes: vec![
                success(a.at(0), 100, 48),
                success(b.at(0), 0, 0),
                FetchOutcome::new(c.at(0), Outcome::ApiError("nope".into())),
                FetchOutcome::new(d.at(0), Outcome::Failed(FetchError::HttpStatus(500))),
                success(a.at(48), 100, 48),
                FetchOutcome::new(a.at(96), Outcome::Failed(FetchError::Transport("reset".into()))),
            ],
            warnings: vec![],
        };

        let summary = RunSummary::from_result(&result);
        assert_eq!(summary.pairs, 4);
        assert_eq!(summary.pairs_with_items, 1);
        assert_eq!(summary.empty_pairs, 1);
        assert_eq!(summary.api_error_pairs, 1);
        assert_eq!(summary.failed_pairs, 1);
        assert_eq!(summary.fan_out_requests, 2);
        assert_eq!(summary.fan_out_failures, 1);
        assert_eq!(result.successes().count(), 3);
        assert_eq!(result.failures().count(), 3);
    }

    #[test]
    fn test_run_result_len_and_is_empty() {
        let empty = RunResult::default();
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);

        let result = RunResult {
            outcomes: vec![success(Pair::new("589", "A").at(0), 0, 0)],
            warnings: vec![],
        };
        assert!(!result.is_empty());
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_upstream_limit_warning_display() {
        let warning = UpstreamLimitWarning {
            store: "589".into(),
            category: "A".into(),
            reported: 1000,
            ceiling: 720,
        };
        assert_eq!(
            warning.to_string(),
            "589/A reports 1000 products; only the first 720 can be paged"
        );
    }
}
