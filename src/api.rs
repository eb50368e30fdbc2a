//! Search API access: the transport seam and the single-request unit.
//!
//! # Architecture
//!
//! - [`Transport`]: Core trait that sends one GraphQL request and returns the
//!   raw status and body
//! - [`HttpTransport`]: The production transport over a shared `reqwest::Client`
//! - [`fetch`]: Executes one [`WorkItem`] through a transport, applies the
//!   per-call timeout, and classifies the response into an [`Outcome`]
//!
//! # Classification
//!
//! Every response is resolved once, here, into one of:
//!
//! | Response | Outcome |
//! |----------|---------|
//! | connection failure | `Failed(Transport)` |
//! | timeout elapsed | `Failed(Timeout)` |
//! | non-2xx status | `Failed(HttpStatus)` |
//! | body not JSON, or missing products/total | `Failed(MalformedResponse)` |
//! | non-null `errors` field | `ApiError` |
//! | anything else | `Success` |
//!
//! There is no retry logic. A failed call is a failed outcome.

use crate::models::{FetchError, FetchOutcome, Outcome, SearchPage, WorkItem};
use crate::utils::{looks_truncated, truncate_for_log};
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::{Value, json};
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Federation gateway endpoint serving the `searchModel` operation.
pub const DEFAULT_ENDPOINT: &str = "https://www.homedepot.com/federation-gateway/graphql";

const OPERATION_NAME: &str = "searchModel";

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:105.0) Gecko/20100101 Firefox/105.0";

/// The GraphQL document sent with every search request.
///
/// Only `searchReport.totalProducts` and `products` are read for pagination;
/// the rest feeds the flattening step.
pub const SEARCH_QUERY: &str = r#"query searchModel($keyword: String, $navParam: String, $storefilter: StoreFilter = ALL, $storeId: String, $itemIds: [String], $channel: Channel = DESKTOP, $additionalSearchParams: AdditionalParams, $loyaltyMembershipInput: LoyaltyMembershipInput, $startIndex: Int, $pageSize: Int, $orderBy: ProductSort, $filter: ProductFilter, $zipCode: String, $skipInstallServices: Boolean = true, $skipKPF: Boolean = false, $skipSpecificationGroup: Boolean = false, $skipSubscribeAndSave: Boolean = false) {
  searchModel(keyword: $keyword, navParam: $navParam, storefilter: $storefilter, storeId: $storeId, itemIds: $itemIds, channel: $channel, additionalSearchParams: $additionalSearchParams, loyaltyMembershipInput: $loyaltyMembershipInput) {
    metadata {
      productCount {
        inStore
      }
    }
    id
    searchReport {
      totalProducts
    }
    products(startIndex: $startIndex, pageSize: $pageSize, orderBy: $orderBy, filter: $filter) {
      itemId
      dataSources
      identifiers {
        brandName
        itemId
        productLabel
        modelNumber
        productType
        storeSkuNumber
        parentId
      }
      pricing(storeId: $storeId) {
        value
        original
      }
      availabilityType {
        discontinued
        type
      }
      badges(storeId: $storeId) {
        name
        __typename
      }
      fulfillment(storeId: $storeId, zipCode: $zipCode) {
        backordered
        fulfillmentOptions {
          type
          services {
            locations {
              inventory {
                quantity
              }
            }
          }
        }
      }
      info {
        categoryHierarchy
        quantityLimit
      }
      installServices(storeId: $storeId, zipCode: $zipCode) @skip(if: $skipInstallServices) {
        scheduleAMeasure
        gccCarpetDesignAndOrderEligible
        __typename
      }
      keyProductFeatures @skip(if: $skipKPF) {
        keyProductFeaturesItems {
          features {
            name
            refinementId
            refinementUrl
            value
            __typename
          }
          __typename
        }
        __typename
      }
      specificationGroup @skip(if: $skipSpecificationGroup) {
        specifications {
          specName
          specValue
          __typename
        }
        specTitle
        __typename
      }
      subscription @skip(if: $skipSubscribeAndSave) {
        defaultfrequency
        discountPercentage
        subscriptionEnabled
        __typename
      }
    }
  }
}"#;

/// Variables of a `searchModel` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchVariables {
    pub storefilter: &'static str,
    pub channel: &'static str,
    pub skip_install_services: bool,
    #[serde(rename = "skipKPF")]
    pub skip_kpf: bool,
    pub skip_specification_group: bool,
    pub skip_subscribe_and_save: bool,
    pub filter: Value,
    pub nav_param: String,
    /// Price ascending. The default "top sellers" order shifts between pages.
    pub order_by: Value,
    pub page_size: u32,
    pub start_index: u32,
    pub store_id: String,
}

/// A complete GraphQL request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub operation_name: &'static str,
    pub variables: SearchVariables,
    pub query: &'static str,
}

impl SearchRequest {
    /// Build the request for one page of one pair.
    pub fn for_item(item: &WorkItem, page_size: u32) -> Self {
        Self {
            operation_name: OPERATION_NAME,
            variables: SearchVariables {
                storefilter: "ALL",
                channel: "DESKTOP",
                skip_install_services: true,
                skip_kpf: true,
                skip_specification_group: true,
                skip_subscribe_and_save: true,
                filter: json!({}),
                nav_param: item.category.clone(),
                order_by: json!({"field": "PRICE", "order": "ASC"}),
                page_size,
                start_index: item.page_offset,
                store_id: item.store.clone(),
            },
            query: SEARCH_QUERY,
        }
    }
}

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one search request and returns the raw response.
///
/// Implementors only move bytes. Status and body interpretation happens in
/// [`fetch`]. An `Err` means no response was received at all.
pub trait Transport {
    async fn send(&self, request: &SearchRequest) -> Result<RawResponse, Box<dyn Error + Send + Sync>>;
}

/// Production [`Transport`] posting to the federation gateway.
///
/// Holds one `reqwest::Client`, so every concurrent request shares the same
/// connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-experience-name", HeaderValue::from_static("hd-home"));

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl Transport for HttpTransport {
    #[instrument(level = "debug", skip_all, fields(store = %request.variables.store_id, nav_param = %request.variables.nav_param, start_index = request.variables.start_index))]
    async fn send(&self, request: &SearchRequest) -> Result<RawResponse, Box<dyn Error + Send + Sync>> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("opname", OPERATION_NAME)])
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        read_body(status, response.text().await)
    }
}

/// Pair a status with its body. A non-2xx status survives an unreadable body,
/// so it still classifies as `HttpStatus`.
fn read_body<E>(status: u16, body: Result<String, E>) -> Result<RawResponse, Box<dyn Error + Send + Sync>>
where
    E: Into<Box<dyn Error + Send + Sync>>,
{
    match body {
        Ok(body) => Ok(RawResponse { status, body }),
        Err(e) if !(200..300).contains(&status) => {
            let e: Box<dyn Error + Send + Sync> = e.into();
            debug!(status, error = %e, "Body of error response unreadable");
            Ok(RawResponse {
                status,
                body: String::new(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Execute one work item.
///
/// Exactly one call is made to `transport`. The returned outcome always
/// carries `item`; nothing is raised past this function.
#[instrument(level = "debug", skip_all, fields(%item))]
pub async fn fetch<T: Transport>(
    transport: &T,
    item: WorkItem,
    page_size: u32,
    timeout: Option<Duration>,
) -> FetchOutcome {
    let request = SearchRequest::for_item(&item, page_size);
    let t0 = Instant::now();

    let sent = match timeout {
        Some(limit) => match tokio::time::timeout(limit, transport.send(&request)).await {
            Ok(sent) => sent,
            Err(_) => {
                warn!(%item, timeout_ms = limit.as_millis() as u64, "Request timed out");
                return FetchOutcome::new(
                    item,
                    Outcome::Failed(FetchError::Timeout {
                        millis: limit.as_millis() as u64,
                    }),
                );
            }
        },
        None => transport.send(&request).await,
    };
    let elapsed_ms = t0.elapsed().as_millis() as u64;

    let outcome = match sent {
        Ok(raw) => classify(raw),
        Err(e) => Outcome::Failed(FetchError::Transport(e.to_string())),
    };

    match &outcome {
        Outcome::Success(page) => debug!(
            %item,
            elapsed_ms,
            total = page.total_products,
            items = page.item_count,
            "Fetched page"
        ),
        Outcome::ApiError(message) => warn!(%item, elapsed_ms, %message, "API returned errors"),
        Outcome::Failed(e) => warn!(%item, elapsed_ms, error = %e, "Request failed"),
    }

    FetchOutcome::new(item, outcome)
}

/// Resolve a raw response into an [`Outcome`].
pub fn classify(raw: RawResponse) -> Outcome {
    if !(200..300).contains(&raw.status) {
        return Outcome::Failed(FetchError::HttpStatus(raw.status));
    }

    let body: Value = match serde_json::from_str(&raw.body) {
        Ok(body) => body,
        Err(e) => {
            let detail = if looks_truncated(&e) {
                format!("truncated body: {e}")
            } else {
                format!("body is not JSON: {e}")
            };
            debug!(preview = %truncate_for_log(&raw.body, 200), "Unparseable body");
            return Outcome::Failed(FetchError::MalformedResponse(detail));
        }
    };

    if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
        return Outcome::ApiError(api_error_message(errors));
    }

    let model = body.pointer("/data/searchModel");
    let Some(products) = model
        .and_then(|m| m.get("products"))
        .and_then(Value::as_array)
    else {
        return Outcome::Failed(FetchError::MalformedResponse(
            "missing data.searchModel.products".into(),
        ));
    };
    let Some(total) = model
        .and_then(|m| m.pointer("/searchReport/totalProducts"))
        .and_then(as_count)
    else {
        return Outcome::Failed(FetchError::MalformedResponse(
            "missing data.searchModel.searchReport.totalProducts".into(),
        ));
    };

    Outcome::Success(SearchPage {
        total_products: total,
        item_count: products.len(),
        body,
    })
}

/// First `message` in a GraphQL `errors` value, or the value itself.
fn api_error_message(errors: &Value) -> String {
    let first = match errors {
        Value::Array(list) => list.first(),
        other => Some(other),
    };
    match first.and_then(|e| e.get("message")) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => truncate_for_log(&errors.to_string(), 200),
    }
}

/// Totals arrive as integers, occasionally as numeric strings.
fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
