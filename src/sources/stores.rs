//! Store locations from the store sitemap.
//!
//! # URL Pattern
//!
//! Store pages look like
//! `https://www.homedepot.com/l/<Name>/<State>/<City>/<Zip>/<StoreId>`; any
//! `<loc>` with a different shape is ignored.

use super::{BASE_URL, SourceError, sitemap_locs};
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// One physical store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreLocation {
    pub state: String,
    pub city: String,
    pub zip: String,
    pub store_id: String,
}

/// Fetch and parse the store sitemap, keyed by store name.
#[instrument(level = "info", skip_all)]
pub async fn fetch_stores(client: &Client) -> Result<BTreeMap<String, StoreLocation>, SourceError> {
    let url = format!("{BASE_URL}/sitemap/HomeServices/store.xml");
    let xml = client.get(&url).send().await?.error_for_status()?.text().await?;
    let stores = parse_stores(&xml)?;
    info!(count = stores.len(), source = %url, "Indexed stores");
    Ok(stores)
}

/// Parse a store sitemap document.
pub fn parse_stores(xml: &str) -> Result<BTreeMap<String, StoreLocation>, SourceError> {
    let mut stores = BTreeMap::new();
    for loc in sitemap_locs(xml)? {
        let parts: Vec<&str> = loc.split('/').collect();
        if parts.len() != 9 {
            debug!(%loc, "Skipping non-store URL");
            continue;
        }
        stores.insert(
            parts[4].to_string(),
            StoreLocation {
                state: parts[5].to_string(),
                city: parts[6].to_string(),
                zip: parts[7].to_string(),
                store_id: parts[8].to_string(),
            },
        );
    }
    Ok(stores)
}

/// Map store names to store IDs.
pub fn resolve_store_ids(
    stores: &BTreeMap<String, StoreLocation>,
    names: &[String],
) -> Result<Vec<String>, SourceError> {
    names
        .iter()
        .map(|name| {
            stores
                .get(name)
                .map(|store| store.store_id.clone())
                .ok_or_else(|| SourceError::NotFound {
                    kind: "store",
                    name: name.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://www.homedepot.com/l/Manhattan-59th-Street/NY/New-York/10022/6177</loc></url>
  <url><loc>https://www.homedepot.com/l/Cumberland/GA/Atlanta/30339/589</loc></url>
  <url><loc>https://www.homedepot.com/l/storeDirectory</loc></url>
</urlset>"#;

    #[test]
    fn test_parse_stores() {
        let stores = parse_stores(SITEMAP).unwrap();
        assert_eq!(stores.len(), 2);

        let manhattan = &stores["Manhattan-59th-Street"];
        assert_eq!(manhattan.state, "NY");
        assert_eq!(manhattan.city, "New-York");
        assert_eq!(manhattan.zip, "10022");
        assert_eq!(manhattan.store_id, "6177");
        assert_eq!(stores["Cumberland"].store_id, "589");
    }

    #[test]
    fn test_resolve_store_ids() {
        let stores = parse_stores(SITEMAP).unwrap();
        let ids = resolve_store_ids(
            &stores,
            &["Cumberland".to_string(), "Manhattan-59th-Street".to_string()],
        )
        .unwrap();
        assert_eq!(ids, vec!["589", "6177"]);

        assert!(matches!(
            resolve_store_ids(&stores, &["Nowhere".to_string()]),
            Err(SourceError::NotFound { kind: "store", .. })
        ));
    }
}
