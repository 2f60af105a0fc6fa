//! Canonical data model produced by the parsing strategies
//!
//! Every value here is built fresh by a parse call and handed to the caller;
//! the engine keeps nothing.

use crate::error::{FeedError, Result};
use crate::playlist::{encode_uri, PlaylistEntry};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Message attached to a bundle built from a site download endpoint
pub const DOWNLOAD_QUEUED_MESSAGE: &str = "Added to the download queue";

/// Message attached to a bundle built from an already parsed item detail
pub const DOWNLOAD_COPIED_MESSAGE: &str = "Source links copied, ready to download";

/// Message carried by [`FeedError::NoDownloadLink`]
pub const NO_DOWNLOAD_LINK_MESSAGE: &str =
    "Unable to resolve a download link, open the player debug view to inspect the sources";

/// Flexible deserializer for ids that can be strings or integers
///
/// A missing, null, blank or non-scalar id reads as `None`.
pub(crate) fn deserialize_optional_id<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Flexible deserializer for pagination counters
///
/// Upstream feeds send counters as numbers, numeric strings, or null.
/// Anything that is not a non-negative number reads as 0.
pub(crate) fn deserialize_count<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// A single value or a list of values
///
/// Upstream documents switch between the two shapes depending on how many
/// children a node has. Deserialize into this and call [`OneOrMany::into_vec`]
/// right away.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

// ============================================================================
// Categories and pagination
// ============================================================================

/// A content category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    pub id: String,
    /// Display name, site decoration stripped
    pub name: String,
}

/// Categories of a site together with the pagination header of its listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub classes: Vec<ClassDescriptor>,
    pub page: u32,
    pub page_count: u32,
    pub page_size: u32,
    pub record_count: u32,
}

/// Pagination header of a listing, parsed independently of its item body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total_page_count: u32,
    pub page_count: u32,
    pub record_count: u32,
    /// Always empty; the UI fills it page by page
    pub items: Vec<ItemSummary>,
}

impl PageMeta {
    pub fn new(page_count: u32, record_count: u32) -> Self {
        Self {
            total_page_count: page_count,
            page_count,
            record_count,
            items: Vec::new(),
        }
    }
}

// ============================================================================
// Items
// ============================================================================

/// Pass-through key/value record describing one catalog item
///
/// Keys are the upstream field names with wire-format prefixes removed
/// (`vod_name` becomes `name`). Values are kept as the upstream sent them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemSummary {
    fields: Map<String, Value>,
}

/// Search results share the shape of listing items
pub type SearchMatch = ItemSummary;

impl ItemSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String view of a field; numbers are rendered, other shapes ignored
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<String> {
        self.get_str("id")
    }

    pub fn name(&self) -> Option<String> {
        self.get_str("name")
    }

    /// Poster/picture URL
    pub fn picture(&self) -> Option<String> {
        self.get_str("pic")
    }

    /// Case-insensitive containment of `keyword` in the item name
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        self.name()
            .map(|name| name.to_lowercase().contains(&keyword.to_lowercase()))
            .unwrap_or(false)
    }

    /// Returns a copy of this item with one field replaced
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub(crate) fn insert_if_absent(&mut self, key: &str, value: Value) {
        if !self.fields.contains_key(key) {
            self.fields.insert(key.to_string(), value);
        }
    }
}

/// One labeled, ordered bundle of candidate playback URLs
///
/// Every url is non-empty and, after an optional `title$` prefix, starts
/// with a URL scheme. Groups are never built empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceGroup {
    /// Format/preference label, empty when the group is not classified
    pub label: String,
    pub urls: Vec<String>,
    /// Upstream identifier of the source variant, when the feed names it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

impl SourceGroup {
    pub(crate) fn new(label: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            label: label.into(),
            urls,
            source_name: None,
        }
    }

    pub(crate) fn with_source_name(mut self, source_name: Option<&str>) -> Self {
        self.source_name = source_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        self
    }

    pub fn is_labeled(&self) -> bool {
        !self.label.is_empty()
    }

    /// Title/url view of each candidate
    pub fn entries(&self) -> impl Iterator<Item = PlaylistEntry<'_>> {
        self.urls.iter().map(|u| PlaylistEntry::parse(u))
    }
}

/// Item summary plus its canonical source groups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    #[serde(flatten)]
    pub summary: ItemSummary,
    pub source_groups: Vec<SourceGroup>,
}

impl ItemDetail {
    pub fn new(summary: ItemSummary, source_groups: Vec<SourceGroup>) -> Self {
        Self {
            summary,
            source_groups,
        }
    }

    pub fn find_group(&self, label: &str) -> Option<&SourceGroup> {
        self.source_groups.iter().find(|g| g.label == label)
    }

    /// Download bundle built from one of the parsed source groups
    ///
    /// Used for sites without a download endpoint. Picks the group labeled
    /// `label`, falling back to the first group.
    pub fn download_bundle(&self, label: Option<&str>) -> Result<DownloadBundle> {
        let group = label
            .and_then(|l| self.find_group(l))
            .or_else(|| self.source_groups.first())
            .ok_or_else(|| FeedError::no_download_link(NO_DOWNLOAD_LINK_MESSAGE))?;

        let urls: Vec<String> = group
            .entries()
            .filter(|e| !e.url.is_empty())
            .map(|e| encode_uri(e.url))
            .collect();
        if urls.is_empty() {
            return Err(FeedError::no_download_link(NO_DOWNLOAD_LINK_MESSAGE));
        }

        Ok(DownloadBundle::new(urls.join("\n"), DOWNLOAD_COPIED_MESSAGE))
    }
}

/// Newline-joined download URLs and the message to show the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadBundle {
    pub urls: String,
    pub message: String,
}

impl DownloadBundle {
    pub fn new(urls: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            urls: urls.into(),
            message: message.into(),
        }
    }

    /// Bundle produced by a site download endpoint
    pub fn queued(urls: impl Into<String>) -> Self {
        Self::new(urls, DOWNLOAD_QUEUED_MESSAGE)
    }

    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.urls.lines().filter(|l| !l.is_empty())
    }
}
