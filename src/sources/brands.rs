//! Brand navigation parameters from the product listing sitemaps.
//!
//! Each department has up to ten numbered sitemaps at
//! `/sitemap/d/plp/<Department>-<n>.xml`. Brand-filtered listings of a
//! subcategory look like `.../b/<Listing>/<Brand>/N-<navParam>`, and their
//! navParam extends the subcategory's own. Any `<loc>` with exactly seven
//! `/`-separated segments that mentions the subcategory counts as a listing.

use super::{BASE_URL, SourceError, nav_param_from_url, sitemap_locs};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

const MAX_SITEMAPS: usize = 10;

/// `scheme://host/b/<Listing>/<Brand>/<navParam>`, seven segments when split on `/`.
static BRAND_LISTING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^/]*/[^/]*/[^/]*/[^/]*/[^/]*/(?P<brand>[^/]*)/(?P<nav>[^/]*)$").expect("valid regex")
});

/// Fetch brand → navParam for one subcategory of `department`.
///
/// Stops at the first sitemap answering 403 or 404.
#[instrument(level = "info", skip(client))]
pub async fn fetch_brands(
    client: &Client,
    department: &str,
    subcategory_url: &str,
) -> Result<BTreeMap<String, String>, SourceError> {
    let Some(subcategory_nav) = nav_param_from_url(subcategory_url) else {
        return Err(SourceError::NotFound {
            kind: "subcategory navParam",
            name: subcategory_url.to_string(),
        });
    };
    let token = format!("N-{subcategory_nav}");

    let mut brands = BTreeMap::new();
    for n in 0..MAX_SITEMAPS {
        let url = format!("{BASE_URL}/sitemap/d/plp/{department}-{n}.xml");
        let response = client.get(&url).send().await?;
        match response.status() {
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                debug!(%url, status = %response.status(), "No more sitemaps");
                break;
            }
            StatusCode::OK => {
                let xml = response.text().await?;
                brands.extend(parse_brands(&xml, &token)?);
            }
            other => warn!(%url, status = %other, "Skipping sitemap"),
        }
    }

    info!(count = brands.len(), %department, "Indexed brands");
    Ok(brands)
}

/// Brand → navParam for every brand listing in `xml` that belongs to the
/// subcategory identified by `subcategory_token` (e.g. `N-5yc1vZc3po`).
///
/// The brand segment `5` is the site's "best rated" filter.
pub fn parse_brands(xml: &str, subcategory_token: &str) -> Result<BTreeMap<String, String>, SourceError> {
    let mut brands = BTreeMap::new();
    for loc in sitemap_locs(xml)? {
        if !loc.contains(subcategory_token) {
            continue;
        }
        let Some(caps) = BRAND_LISTING.captures(&loc) else {
            continue;
        };
        let nav = &caps["nav"];
        let nav = nav.strip_prefix("N-").unwrap_or(nav);
        if nav.is_empty() {
            continue;
        }
        let brand = match &caps["brand"] {
            "5" => "BestRated".to_string(),
            other => other.to_string(),
        };
        brands.insert(brand, nav.to_string());
    }
    Ok(brands)
}
