//! Discovery of stores, categories and brands from the public site maps.
//!
//! These modules produce the identifiers a run is driven by:
//!
//! | Source | Module | Method | Yields |
//! |--------|--------|--------|--------|
//! | Store sitemap | [`stores`] | XML `<loc>` parsing | store name → ID, state, city, zip |
//! | Category site map | [`categories`] | HTML scraping | category → subcategory → URL |
//! | Product listing sitemaps | [`brands`] | XML `<loc>` parsing | brand → navParam |
//!
//! Each module exports an async `fetch_*` function doing the network call and
//! a pure `parse_*` function that the tests exercise directly.

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use thiserror::Error;

pub mod brands;
pub mod categories;
pub mod stores;

pub const BASE_URL: &str = "https://www.homedepot.com";

const SITEMAP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_10_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/39.0.2171.95 Safari/537.36";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("HTML error: {0}")]
    Html(String),

    #[error("unknown {kind}: {name}")]
    NotFound { kind: &'static str, name: String },
}

/// A client carrying the browser user agent the site maps expect.
pub fn client() -> Result<Client, SourceError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(SITEMAP_USER_AGENT));
    Ok(Client::builder().default_headers(headers).build()?)
}

/// The navigation parameter of a listing URL: its last path segment without
/// the leading `N-`.
pub fn nav_param_from_url(url: &str) -> Option<&str> {
    let last = url.trim_end_matches('/').rsplit('/').next()?;
    let param = last.strip_prefix("N-").unwrap_or(last);
    (!param.is_empty()).then_some(param)
}

/// Text content of every `<loc>` element in a sitemap document.
pub fn sitemap_locs(xml: &str) -> Result<Vec<String>, SourceError> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locs = Vec::new();
    let mut current: Option<String> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"loc" => {
                current = Some(String::new());
            }
            Ok(Event::Text(t)) => {
                if let Some(buf) = current.as_mut() {
                    let text = t.decode().map_err(|e| SourceError::Xml(e.to_string()))?;
                    buf.push_str(&text);
                }
            }
            Ok(Event::GeneralRef(r)) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&resolve_reference(&r)?);
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"loc" => {
                if let Some(loc) = current.take() {
                    locs.push(loc.trim().to_string());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(SourceError::Xml(format!(
                    "at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
    }
    Ok(locs)
}

/// Text of a `&name;` or `&#NN;` reference inside element content.
fn resolve_reference(r: &quick_xml::events::BytesRef<'_>) -> Result<String, SourceError> {
    if let Some(ch) = r.resolve_char_ref().map_err(|e| SourceError::Xml(e.to_string()))? {
        return Ok(ch.to_string());
    }
    let name = r.decode().map_err(|e| SourceError::Xml(e.to_string()))?;
    quick_xml::escape::resolve_xml_entity(&name)
        .map(str::to_string)
        .ok_or_else(|| SourceError::Xml(format!("unknown entity &{name};")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nav_param_from_url() {
        assert_eq!(
            nav_param_from_url("https://www.homedepot.com/b/Appliances-Dishwashers/N-5yc1vZc3po"),
            Some("5yc1vZc3po")
        );
        assert_eq!(
            nav_param_from_url("https://www.homedepot.com/b/Appliances-Dishwashers/Samsung/N-5yc1vZc3poZ21j/"),
            Some("5yc1vZc3poZ21j")
        );
        assert_eq!(nav_param_from_url("https://example.com/b/Other/plain"), Some("plain"));
        assert_eq!(nav_param_from_url("https://example.com/b/N-"), None);
    }

    #[test]
    fn test_sitemap_locs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://www.homedepot.com/l/Manhattan-59th-Street/NY/New-York/10022/6177</loc></url>
  <url>
    <loc>
      https://www.homedepot.com/l/Flushing/NY/Flushing/11354/1207
    </loc>
    <lastmod>2024-01-01</lastmod>
  </url>
</urlset>"#;

        let locs = sitemap_locs(xml).unwrap();
        assert_eq!(
            locs,
            vec![
                "https://www.homedepot.com/l/Manhattan-59th-Street/NY/New-York/10022/6177",
                "https://www.homedepot.com/l/Flushing/NY/Flushing/11354/1207",
            ]
        );
    }

    #[test]
    fn test_sitemap_locs_decodes_entities() {
        let xml = "<urlset><url><loc>https://www.homedepot.com/b/Bath-Faucets/Moen/N-5yc1vZbzb4?a=1&amp;b=2&#38;c=&lt;3&gt;</loc></url></urlset>";

        let locs = sitemap_locs(xml).unwrap();
        assert_eq!(
            locs,
            vec!["https://www.homedepot.com/b/Bath-Faucets/Moen/N-5yc1vZbzb4?a=1&b=2&c=<3>"]
        );
    }

    #[test]
    fn test_sitemap_locs_rejects_unknown_entity() {
        assert!(matches!(
            sitemap_locs("<urlset><url><loc>a&nbsp;b</loc></url></urlset>"),
            Err(SourceError::Xml(_))
        ));
    }

    #[test]
    fn test_sitemap_locs_rejects_broken_xml() {
        assert!(matches!(
            sitemap_locs("<urlset><url><loc>x</url></urlset>"),
            Err(SourceError::Xml(_))
        ));
    }
}
