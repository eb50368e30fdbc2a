//! Flattening of search responses into tabular rows.
//!
//! Each product on a successful page becomes one or more [`CatalogRow`]s:
//!
//! 1. A product record with identifiers, pricing, availability and category
//!    info, tagged with the originating store, navParam and startIndex
//! 2. One availability record per fulfillment location
//!    (`fulfillment.fulfillmentOptions[].services[].locations[]`)
//! 3. A left merge of the two on (store, navParam, startIndex, itemId): one
//!    row per availability record, or a single row with empty availability
//!    columns when the product has none
//!
//! Failed and API-error outcomes produce no rows. Column names follow the
//! dotted paths of the response so the CSV lines up with the raw JSON.

use crate::models::{FetchOutcome, RunResult};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;

/// One row of the output table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogRow {
    pub store: String,
    #[serde(rename = "navParam")]
    pub nav_param: String,
    #[serde(rename = "startIndex")]
    pub start_index: u32,
    #[serde(rename = "itemId")]
    pub item_id: Option<String>,
    #[serde(rename = "identifiers.brandName")]
    pub brand_name: Option<String>,
    #[serde(rename = "identifiers.productLabel")]
    pub product_label: Option<String>,
    #[serde(rename = "identifiers.modelNumber")]
    pub model_number: Option<String>,
    #[serde(rename = "identifiers.productType")]
    pub product_type: Option<String>,
    #[serde(rename = "identifiers.storeSkuNumber")]
    pub store_sku_number: Option<String>,
    #[serde(rename = "identifiers.parentId")]
    pub parent_id: Option<String>,
    #[serde(rename = "pricing.value")]
    pub price: Option<f64>,
    #[serde(rename = "pricing.original")]
    pub original_price: Option<f64>,
    #[serde(rename = "availabilityType.discontinued")]
    pub discontinued: Option<bool>,
    #[serde(rename = "availabilityType.type")]
    pub availability_type: Option<String>,
    #[serde(rename = "fulfillment.backordered")]
    pub backordered: Option<bool>,
    #[serde(rename = "info.categoryHierarchy")]
    pub category_hierarchy: Option<String>,
    #[serde(rename = "info.quantityLimit")]
    pub quantity_limit: Option<i64>,
    #[serde(rename = "fulfillmentType")]
    pub fulfillment_type: Option<String>,
    #[serde(rename = "inventory.quantity")]
    pub quantity: Option<i64>,
    #[serde(rename = "updatedDate")]
    pub updated_date: String,
}

/// Stock at one fulfillment location of one product.
#[derive(Debug, Clone, PartialEq)]
pub struct Availability {
    pub fulfillment_type: Option<String>,
    pub quantity: Option<i64>,
}

/// Flatten every successful outcome of a run.
///
/// All rows share the same `updatedDate`.
pub fn flatten(result: &RunResult, updated: DateTime<Local>) -> Vec<CatalogRow> {
    let stamp = updated.format("%Y-%m-%d %H:%M:%S%.6f").to_string();
    result
        .successes()
        .flat_map(|outcome| outcome_rows(outcome, &stamp))
        .collect()
}

fn outcome_rows(outcome: &FetchOutcome, stamp: &str) -> Vec<CatalogRow> {
    let Some(page) = outcome.page() else {
        return Vec::new();
    };
    let products = page
        .body
        .pointer("/data/searchModel/products")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut rows = Vec::with_capacity(products.len());
    for product in products {
        let base = product_row(outcome, product, stamp);
        let availability = availability(product);
        if availability.is_empty() {
            rows.push(base);
            continue;
        }
        for record in availability {
            rows.push(CatalogRow {
                fulfillment_type: record.fulfillment_type,
                quantity: record.quantity,
                ..base.clone()
            });
        }
    }
    rows
}

fn product_row(outcome: &FetchOutcome, product: &Value, stamp: &str) -> CatalogRow {
    CatalogRow {
        store: outcome.item.store.clone(),
        nav_param: outcome.item.category.clone(),
        start_index: outcome.item.page_offset,
        item_id: text_at(product, "/itemId"),
        brand_name: text_at(product, "/identifiers/brandName"),
        product_label: text_at(product, "/identifiers/productLabel"),
        model_number: text_at(product, "/identifiers/modelNumber"),
        product_type: text_at(product, "/identifiers/productType"),
        store_sku_number: text_at(product, "/identifiers/storeSkuNumber"),
        parent_id: text_at(product, "/identifiers/parentId"),
        price: product.pointer("/pricing/value").and_then(Value::as_f64),
        original_price: product.pointer("/pricing/original").and_then(Value::as_f64),
        discontinued: product
            .pointer("/availabilityType/discontinued")
            .and_then(Value::as_bool),
        availability_type: text_at(product, "/availabilityType/type"),
        backordered: product
            .pointer("/fulfillment/backordered")
            .and_then(Value::as_bool),
        category_hierarchy: category_hierarchy(product),
        quantity_limit: product.pointer("/info/quantityLimit").and_then(Value::as_i64),
        fulfillment_type: None,
        quantity: None,
        updated_date: stamp.to_string(),
    }
}

/// Every fulfillment location of a product, in response order.
pub fn availability(product: &Value) -> Vec<Availability> {
    let mut records = Vec::new();
    for option in array_at(product, "/fulfillment/fulfillmentOptions") {
        let fulfillment_type = text_at(option, "/type");
        for service in array_at(option, "/services") {
            for location in array_at(service, "/locations") {
                records.push(Availability {
                    fulfillment_type: fulfillment_type.clone(),
                    quantity: location
                        .pointer("/inventory/quantity")
                        .and_then(Value::as_i64),
                });
            }
        }
    }
    records
}

fn category_hierarchy(product: &Value) -> Option<String> {
    let levels: Vec<&str> = array_at(product, "/info/categoryHierarchy")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    (!levels.is_empty()).then(|| levels.join("/"))
}

fn array_at<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Strings as-is, numbers and booleans rendered, everything else absent.
fn text_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
