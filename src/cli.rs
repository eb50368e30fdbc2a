//! Command-line interface definitions for the catalog scraper.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every run option can also come from a YAML config file (`--config`); values
//! given on the command line win over the file.

use clap::Parser;

/// Command-line arguments for the catalog scraper.
///
/// # Examples
///
/// ```sh
/// # Two stores, two categories, default output file
/// catalog_scraper --store 589,6177 --category 5yc1vZc3poZ21j,5yc1vZc3poZgt7
///
/// # Resolve a store by its sitemap name and cap concurrency
/// catalog_scraper --store-name Manhattan-59th-Street -c 5yc1vZc3poZ21j --max-in-flight 8
///
/// # Explore what is available
/// catalog_scraper --list-categories
/// catalog_scraper --list-brands Appliances/Dishwashers
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Store IDs to query (comma separated or repeated)
    #[arg(short, long = "store", value_delimiter = ',')]
    pub stores: Vec<String>,

    /// Store names from the store sitemap (e.g. Manhattan-59th-Street)
    #[arg(long = "store-name", value_delimiter = ',')]
    pub store_names: Vec<String>,

    /// Category navigation parameters to query (comma separated or repeated)
    #[arg(short, long = "category", value_delimiter = ',')]
    pub categories: Vec<String>,

    /// Optional path to a YAML config file
    #[arg(long, env = "CATALOG_SCRAPER_CONFIG")]
    pub config: Option<String>,

    /// Products requested per page
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Highest total the endpoint can page through; larger totals are clamped
    #[arg(long)]
    pub offset_ceiling: Option<u32>,

    /// Maximum concurrent requests per phase (unbounded when omitted)
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Per-request timeout in seconds (0 disables the timeout)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// GraphQL endpoint URL
    #[arg(long, env = "CATALOG_SCRAPER_ENDPOINT")]
    pub endpoint: Option<String>,

    /// CSV file to append rows to
    #[arg(short, long)]
    pub output: Option<String>,

    /// Directory for a raw JSON dump of every response
    #[arg(short = 'j', long)]
    pub raw_json_dir: Option<String>,

    /// Print stores from the store sitemap as JSON and exit
    #[arg(long)]
    pub list_stores: bool,

    /// Print categories from the site map as JSON and exit
    #[arg(long)]
    pub list_categories: bool,

    /// Print brand navigation parameters for CATEGORY/SUBCATEGORY as JSON and exit
    #[arg(long, value_name = "CATEGORY/SUBCATEGORY")]
    pub list_brands: Option<String>,
}

impl Cli {
    /// Whether this invocation only lists sources instead of scraping.
    pub fn is_listing(&self) -> bool {
        self.list_stores || self.list_categories || self.list_brands.is_some()
    }
}
