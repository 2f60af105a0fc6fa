//! Example: Parse a saved catalog response with a configured site
//!
//! Run with:
//!   cargo run -p vopfeed --example parse_feed -- <site_key> <operation> <body_file> [keyword]
//!
//! Operations: class, page, list, detail, search, download

use std::env;
use std::fs;

use tracing_subscriber::EnvFilter;
use vopconfig::get_config;
use vopfeed::{CatalogConfigExt, SiteFeed};

fn usage() -> ! {
    eprintln!("Usage: parse_feed <site_key> <class|page|list|detail|search|download> <body_file> [keyword]");
    std::process::exit(1);
}

fn main() -> anyhow::Result<()> {
    let config = get_config();

    let level = config.get_log_min_level()?.to_lowercase();
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{level},vopfeed=debug")))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        usage();
    }
    let (site_key, operation, body_file) = (&args[1], &args[2], &args[3]);
    let keyword = args.get(4).map(String::as_str).unwrap_or_default();

    let Some(site) = config.get_catalog_site(site_key)? else {
        anyhow::bail!("Unknown site '{site_key}'");
    };
    println!("Site: {} ({}, {})", site.name, site.key, site.parse_mode);

    let body = fs::read_to_string(body_file)?;
    let feed = SiteFeed::new(site);

    let output = match operation.as_str() {
        "class" => serde_json::to_string_pretty(&feed.parse_classification(&body)?)?,
        "page" => serde_json::to_string_pretty(&feed.parse_listing_page(&body)?)?,
        "list" => serde_json::to_string_pretty(&feed.parse_listing(&body)?)?,
        "detail" => serde_json::to_string_pretty(&feed.parse_detail(&body)?)?,
        "search" => serde_json::to_string_pretty(&feed.parse_search(&body, keyword)?)?,
        "download" => serde_json::to_string_pretty(&feed.parse_download(&body)?)?,
        _ => usage(),
    };

    println!("{output}");
    Ok(())
}
