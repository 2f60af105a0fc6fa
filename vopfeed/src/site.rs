//! Catalog sites and per-site feed parsing
//!
//! A [`Site`] is the configuration record of one upstream endpoint. It knows
//! how to build the request URLs the endpoint expects; fetching them is up to
//! the caller. A [`SiteFeed`] binds a site to the strategy of its wire format
//! and post-processes parsed values with site-level knowledge (relative
//! picture links, strict search).

use crate::error::Result;
use crate::models::{
    ClassificationResult, DownloadBundle, ItemDetail, ItemSummary, PageMeta, SearchMatch,
};
use crate::strategy::{ParseMode, ParserStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

fn default_active() -> bool {
    true
}

/// One upstream catalog endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Unique site identifier
    pub key: String,
    pub name: String,
    /// Catalog API endpoint
    pub api: String,
    /// Dedicated download endpoint, when the site has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<String>,
    #[serde(default)]
    pub group: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub parse_mode: ParseMode,
    /// Base for relative links; the origin of `api` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Re-filter search results by name even when the format does not
    #[serde(default)]
    pub strict_search: bool,
}

impl Site {
    pub fn new(key: impl Into<String>, name: impl Into<String>, api: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            api: api.into(),
            download: None,
            group: String::new(),
            active: true,
            parse_mode: ParseMode::default(),
            base_url: None,
            strict_search: false,
        }
    }

    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = parse_mode;
        self
    }

    pub fn with_download(mut self, download: impl Into<String>) -> Self {
        self.download = Some(download.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_strict_search(mut self, strict_search: bool) -> Self {
        self.strict_search = strict_search;
        self
    }

    pub fn strategy(&self) -> &'static dyn ParserStrategy {
        self.parse_mode.strategy()
    }

    /// Key under which a parsed item of this site can be cached
    pub fn cache_key(&self, id: &str) -> String {
        format!("{}@{}", self.key, id)
    }

    /// Base URL used to resolve relative links
    pub fn base_url(&self) -> Result<Url> {
        if let Some(base) = &self.base_url {
            return Ok(Url::parse(base)?);
        }
        let mut origin = Url::parse(&self.api)?;
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        Ok(origin)
    }

    fn endpoint(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(endpoint)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    /// Category request (bare API endpoint)
    pub fn class_url(&self) -> Result<Url> {
        self.endpoint(&self.api, &[])
    }

    /// Listing request for `page`, optionally restricted to one category
    pub fn list_url(&self, page: u32, class_id: Option<&str>) -> Result<Url> {
        let page = page.to_string();
        let mut params = vec![("ac", self.parse_mode.list_action()), ("pg", page.as_str())];
        if let Some(class_id) = class_id {
            params.push(("t", class_id));
        }
        self.endpoint(&self.api, &params)
    }

    /// Detail request for one or more comma-separated ids
    pub fn detail_url(&self, ids: &str) -> Result<Url> {
        self.endpoint(
            &self.api,
            &[("ac", self.parse_mode.detail_action()), ("ids", ids)],
        )
    }

    pub fn search_url(&self, keyword: &str) -> Result<Url> {
        self.endpoint(&self.api, &[("wd", keyword)])
    }

    /// Request to the dedicated download endpoint, `None` without one
    pub fn download_url(&self, id: &str) -> Result<Option<Url>> {
        match &self.download {
            Some(download) => self
                .endpoint(download, &[("ac", "videolist"), ("ids", id), ("ct", "1")])
                .map(Some),
            None => Ok(None),
        }
    }
}

/// Parses the responses of one site
#[derive(Debug, Clone)]
pub struct SiteFeed {
    site: Site,
    base: Option<Url>,
}

impl SiteFeed {
    pub fn new(site: Site) -> Self {
        let base = match site.base_url() {
            Ok(base) => Some(base),
            Err(e) => {
                warn!(site = %site.key, error = %e, "Site has no usable base URL, links kept as-is");
                None
            }
        };
        Self { site, base }
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    fn strategy(&self) -> &'static dyn ParserStrategy {
        self.site.strategy()
    }

    /// Rewrites a relative `pic` field into an absolute URL
    fn resolve_links(&self, mut item: ItemSummary) -> ItemSummary {
        let Some(base) = &self.base else {
            return item;
        };
        let Some(picture) = item.picture() else {
            return item;
        };
        let picture = picture.trim();
        if picture.is_empty() || Url::parse(picture).is_ok() {
            return item;
        }
        match base.join(picture) {
            Ok(resolved) => item.insert("pic", Value::String(resolved.to_string())),
            Err(e) => debug!(site = %self.site.key, picture, error = %e, "Cannot resolve picture link"),
        }
        item
    }

    /// A site is healthy when its category response parses
    pub fn check(&self, body: &str) -> bool {
        match self.parse_classification(body) {
            Ok(_) => true,
            Err(e) => {
                warn!(site = %self.site.key, error = %e, "Site check failed");
                false
            }
        }
    }

    pub fn parse_classification(&self, body: &str) -> Result<ClassificationResult> {
        self.strategy().parse_classification(body)
    }

    pub fn parse_listing_page(&self, body: &str) -> Result<PageMeta> {
        self.strategy().parse_listing_page(body)
    }

    pub fn parse_listing(&self, body: &str) -> Result<Vec<ItemSummary>> {
        let items = self.strategy().parse_listing(body)?;
        Ok(items.into_iter().map(|i| self.resolve_links(i)).collect())
    }

    pub fn parse_detail(&self, body: &str) -> Result<Option<ItemDetail>> {
        Ok(self.strategy().parse_detail(body)?.map(|mut detail| {
            detail.summary = self.resolve_links(detail.summary);
            detail
        }))
    }

    pub fn parse_search(&self, body: &str, keyword: &str) -> Result<Vec<SearchMatch>> {
        let matches = self.strategy().parse_search(body, keyword)?;
        let matches = matches
            .into_iter()
            .filter(|m| !self.site.strict_search || m.matches_keyword(keyword))
            .map(|m| self.resolve_links(m))
            .collect::<Vec<_>>();
        debug!(site = %self.site.key, keyword, matches = matches.len(), "Parsed search");
        Ok(matches)
    }

    pub fn parse_download(&self, body: &str) -> Result<DownloadBundle> {
        self.strategy().parse_download(body)
    }
}

impl From<Site> for SiteFeed {
    fn from(site: Site) -> Self {
        Self::new(site)
    }
}
