//! Category tree from the HTML site map.
//!
//! The site map page lists every department inside a
//! `div.grid[name="etch-widget"]` block. Department headings are links that
//! wrap a `<strong>`; the plain links that follow are its subcategories.
//! Only links into the `/b/` listing section are considered.

use super::{BASE_URL, SourceError, nav_param_from_url};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, info, instrument};
use url::Url;

static SITE_MAP_GRID: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div.grid[name="etch-widget"]"#).expect("valid selector"));
static LISTING_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/b/"]"#).expect("valid selector"));
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("strong").expect("valid selector"));

/// A listing page under a department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subcategory {
    pub name: String,
    pub url: String,
    pub nav_param: Option<String>,
}

/// A top-level department with its listing pages.
///
/// The department's own listing page is the first entry of `subcategories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: String,
    pub subcategories: Vec<Subcategory>,
}

impl Category {
    pub fn subcategory(&self, name: &str) -> Option<&Subcategory> {
        self.subcategories.iter().find(|s| s.name == name)
    }
}

/// Fetch and parse the category site map.
#[instrument(level = "info", skip_all)]
pub async fn fetch_categories(client: &Client) -> Result<Vec<Category>, SourceError> {
    let url = format!("{BASE_URL}/c/site_map");
    let html = client.get(&url).send().await?.error_for_status()?.text().await?;
    let categories = parse_categories(&html, BASE_URL)?;
    info!(
        count = categories.len(),
        subcategories = categories.iter().map(|c| c.subcategories.len()).sum::<usize>(),
        source = %url,
        "Indexed categories"
    );
    Ok(categories)
}

/// Parse the site map HTML. Relative links are resolved against `base_url`.
pub fn parse_categories(html: &str, base_url: &str) -> Result<Vec<Category>, SourceError> {
    let base = Url::parse(base_url).map_err(|e| SourceError::Html(e.to_string()))?;
    let document = Html::parse_document(html);
    let grid = document
        .select(&SITE_MAP_GRID)
        .next()
        .ok_or_else(|| SourceError::Html("site map grid not found".into()))?;

    let mut categories: Vec<Category> = Vec::new();
    for link in grid.select(&LISTING_LINK) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            debug!(%href, "Skipping unresolvable link");
            continue;
        };
        let url = resolved.to_string();
        let name = link.text().collect::<String>().trim().to_string();
        let subcategory = Subcategory {
            nav_param: nav_param_from_url(&url).map(str::to_string),
            name: name.clone(),
            url: url.clone(),
        };

        if link.select(&HEADING).next().is_some() {
            categories.push(Category {
                name,
                subcategories: vec![subcategory],
            });
        } else if url.split('/').count() == 6 {
            match categories.last_mut() {
                Some(current) => current.subcategories.push(subcategory),
                None => debug!(%url, "Subcategory before any department; skipping"),
            }
        }
    }
    Ok(categories)
}
