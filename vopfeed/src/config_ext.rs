//! Site list stored in vopconfig
//!
//! Sites live under `catalog.sites` as a YAML sequence:
//!
//! ```yaml
//! catalog:
//!   sites:
//!     - key: lziapi
//!       name: 量子资源
//!       api: https://cj.lziapi.com/api.php/provide/vod/from/liangzi/at/xml
//!       group: default
//!       active: true
//!       parse_mode: xml
//! ```
//!
//! # Example
//!
//! ```no_run
//! use vopconfig::get_config;
//! use vopfeed::{CatalogConfigExt, SiteFeed};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//! for site in config.get_catalog_active_sites()? {
//!     let feed = SiteFeed::new(site);
//!     println!("{} -> {}", feed.site().name, feed.site().class_url()?);
//! }
//! # Ok(())
//! # }
//! ```

use crate::site::Site;
use anyhow::Result;
use serde_yaml::Value;
use std::collections::HashSet;
use tracing::warn;
use vopconfig::Config;

const SITES_PATH: [&str; 2] = ["catalog", "sites"];

/// Extension trait giving `vopconfig::Config` access to the catalog sites
pub trait CatalogConfigExt {
    /// Every configured site, in configuration order
    ///
    /// Returns an empty list when no site is configured.
    fn get_catalog_sites(&self) -> Result<Vec<Site>>;

    /// Replaces the configured site list
    fn set_catalog_sites(&self, sites: &[Site]) -> Result<()>;

    /// Site whose key is `key`
    fn get_catalog_site(&self, key: &str) -> Result<Option<Site>>;

    /// Sites flagged active
    fn get_catalog_active_sites(&self) -> Result<Vec<Site>>;
}

impl CatalogConfigExt for Config {
    fn get_catalog_sites(&self) -> Result<Vec<Site>> {
        match self.get_value(&SITES_PATH) {
            Ok(Value::Null) | Err(_) => Ok(Vec::new()),
            Ok(value) => Ok(serde_yaml::from_value(value)?),
        }
    }

    fn set_catalog_sites(&self, sites: &[Site]) -> Result<()> {
        let keys: HashSet<&str> = sites.iter().map(|s| s.key.as_str()).collect();
        if keys.len() != sites.len() {
            warn!("Duplicate site keys in catalog, lookups return the first one");
        }
        let value = serde_yaml::to_value(sites)?;
        self.set_value(&SITES_PATH, value)
    }

    fn get_catalog_site(&self, key: &str) -> Result<Option<Site>> {
        Ok(self.get_catalog_sites()?.into_iter().find(|s| s.key == key))
    }

    fn get_catalog_active_sites(&self) -> Result<Vec<Site>> {
        Ok(self
            .get_catalog_sites()?
            .into_iter()
            .filter(|s| s.active)
            .collect())
    }
}
