//! In-memory [`Transport`] for tests.
//!
//! Replies are keyed by work item. Unknown items answer with a 404. Every call
//! is recorded, and the highest number of simultaneously pending calls is
//! tracked so concurrency bounds can be asserted.

use crate::api::{RawResponse, SearchRequest, Transport};
use crate::models::WorkItem;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::error::Error;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A canned answer for one work item.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    Unreachable,
    Hang,
}

impl Reply {
    /// A 200 search page reporting `total` products with `items` on the page.
    pub fn page(total: u64, items: usize) -> Self {
        Reply::Status(200, search_body(total, items).to_string())
    }

    pub fn json(body: Value) -> Self {
        Reply::Status(200, body.to_string())
    }
}

/// A search response body with `items` minimal product records.
pub fn search_body(total: u64, items: usize) -> Value {
    let products: Vec<Value> = (0..items)
        .map(|i| {
            json!({
                "itemId": format!("{}", 100_000 + i),
                "identifiers": { "brandName": "Acme", "productLabel": format!("Widget {i}") },
                "pricing": { "value": 10.0 + i as f64, "original": null },
                "fulfillment": null,
            })
        })
        .collect();
    json!({
        "data": {
            "searchModel": {
                "id": "search",
                "searchReport": { "totalProducts": total },
                "products": products,
            }
        }
    })
}

#[derive(Debug, Default)]
pub struct FakeTransport {
    replies: HashMap<WorkItem, Reply>,
    calls: Mutex<Vec<WorkItem>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, item: WorkItem, reply: Reply) -> Self {
        self.replies.insert(item, reply);
        self
    }

    /// Hold every call for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<WorkItem> {
        self.calls.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Transport for FakeTransport {
    async fn send(&self, request: &SearchRequest) -> Result<RawResponse, Box<dyn Error + Send + Sync>> {
        let item = WorkItem {
            store: request.variables.store_id.clone(),
            category: request.variables.nav_param.clone(),
            page_offset: request.variables.start_index,
        };
        self.calls.lock().unwrap().push(item.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self
            .replies
            .get(&item)
            .cloned()
            .unwrap_or_else(|| Reply::Status(404, "not found".into()));
        if matches!(reply, Reply::Hang) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match reply {
            Reply::Status(status, body) => Ok(RawResponse { status, body }),
            Reply::Unreachable => Err("connection refused".into()),
            Reply::Hang => Err("hung request completed".into()),
        }
    }
}
