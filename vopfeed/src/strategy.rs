//! Strategy trait shared by both wire formats and the per-site dispatcher

use crate::error::{FeedError, Result};
use crate::json::JsonStrategy;
use crate::models::{
    ClassificationResult, DownloadBundle, ItemDetail, ItemSummary, PageMeta, SearchMatch,
};
use crate::xml::XmlStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Converts raw catalog response bodies into the canonical model
///
/// Implementations are stateless: every call parses `body` from scratch and
/// returns freshly built values.
pub trait ParserStrategy: Send + Sync {
    /// `ac` query value of listing requests
    fn list_action(&self) -> &'static str;

    /// `ac` query value of detail requests
    fn detail_action(&self) -> &'static str;

    /// Categories plus the pagination header of the first listing page
    fn parse_classification(&self, body: &str) -> Result<ClassificationResult>;

    /// Pagination header of a listing, items left empty
    fn parse_listing_page(&self, body: &str) -> Result<PageMeta>;

    fn parse_listing(&self, body: &str) -> Result<Vec<ItemSummary>>;

    /// Detail of the first item of the body, `None` when there is none
    fn parse_detail(&self, body: &str) -> Result<Option<ItemDetail>>;

    fn parse_search(&self, body: &str, keyword: &str) -> Result<Vec<SearchMatch>>;

    /// Download links of the first item of the body
    fn parse_download(&self, body: &str) -> Result<DownloadBundle>;
}

/// Wire format spoken by a site
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Tag-tree documents (`<rss><list><video>...`)
    #[default]
    Xml,
    /// Flat JSON records (`{"list": [{"vod_id": ...}]}`)
    Json,
}

impl ParseMode {
    pub const ALL: [ParseMode; 2] = [ParseMode::Xml, ParseMode::Json];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Xml => "xml",
            ParseMode::Json => "json",
        }
    }

    /// The strategy handling this format
    pub fn strategy(&self) -> &'static dyn ParserStrategy {
        match self {
            ParseMode::Xml => &XmlStrategy,
            ParseMode::Json => &JsonStrategy,
        }
    }
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParseMode {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" => Ok(ParseMode::Xml),
            "json" => Ok(ParseMode::Json),
            other => Err(FeedError::UnknownParseMode(other.to_string())),
        }
    }
}

impl ParserStrategy for ParseMode {
    fn list_action(&self) -> &'static str {
        self.strategy().list_action()
    }

    fn detail_action(&self) -> &'static str {
        self.strategy().detail_action()
    }

    fn parse_classification(&self, body: &str) -> Result<ClassificationResult> {
        self.strategy().parse_classification(body)
    }

    fn parse_listing_page(&self, body: &str) -> Result<PageMeta> {
        self.strategy().parse_listing_page(body)
    }

    fn parse_listing(&self, body: &str) -> Result<Vec<ItemSummary>> {
        self.strategy().parse_listing(body)
    }

    fn parse_detail(&self, body: &str) -> Result<Option<ItemDetail>> {
        self.strategy().parse_detail(body)
    }

    fn parse_search(&self, body: &str, keyword: &str) -> Result<Vec<SearchMatch>> {
        self.strategy().parse_search(body, keyword)
    }

    fn parse_download(&self, body: &str) -> Result<DownloadBundle> {
        self.strategy().parse_download(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode_from_str() {
        assert_eq!("xml".parse::<ParseMode>().unwrap(), ParseMode::Xml);
        assert_eq!(" JSON ".parse::<ParseMode>().unwrap(), ParseMode::Json);
        let err = "html".parse::<ParseMode>().unwrap_err();
        assert!(matches!(err, FeedError::UnknownParseMode(ref m) if m == "html"));
    }

    #[test]
    fn test_parse_mode_serde() {
        let mode: ParseMode = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(mode, ParseMode::Json);
        assert_eq!(serde_json::to_string(&ParseMode::Xml).unwrap(), "\"xml\"");
        assert_eq!(ParseMode::default(), ParseMode::Xml);
    }

    #[test]
    fn test_actions_follow_mode() {
        assert_eq!(ParseMode::Xml.list_action(), "videolist");
        assert_eq!(ParseMode::Xml.detail_action(), "videolist");
        assert_eq!(ParseMode::Json.list_action(), "list");
        assert_eq!(ParseMode::Json.detail_action(), "detail");
    }

    #[test]
    fn test_dispatch_reaches_format() {
        let xml = r#"<rss><list page="1"><video><id>1</id><name>A</name></video></list></rss>"#;
        assert!(ParseMode::Xml.parse_search(xml, "a").unwrap().len() == 1);
        assert!(ParseMode::Json.parse_search(xml, "a").unwrap_err().is_malformed());
    }
}
