//! Flat-record (JSON) catalog format
//!
//! Responses are a single object carrying pagination counters, an optional
//! `class` array and a `list` of records whose keys are prefixed with
//! `vod_`. Counters arrive as numbers or numeric strings depending on the
//! site.

use crate::error::{FeedError, Result};
use crate::models::{
    deserialize_count, deserialize_optional_id, ClassDescriptor, ClassificationResult,
    DownloadBundle, ItemDetail, ItemSummary, OneOrMany, PageMeta, SearchMatch, SourceGroup,
    NO_DOWNLOAD_LINK_MESSAGE,
};
use crate::playlist::split_playlist;
use crate::strategy::ParserStrategy;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

const WIRE_PREFIX: &str = "vod_";

type Record = Map<String, Value>;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    class: Option<OneOrMany<ClassRecord>>,
    #[serde(default)]
    list: Option<OneOrMany<Record>>,
    #[serde(default, deserialize_with = "deserialize_count")]
    page: u32,
    #[serde(default, deserialize_with = "deserialize_count")]
    pagecount: u32,
    #[serde(default, deserialize_with = "deserialize_count")]
    limit: u32,
    #[serde(default, deserialize_with = "deserialize_count")]
    total: u32,
    #[serde(default)]
    url: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ClassRecord {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    type_id: Option<String>,
    #[serde(default)]
    type_name: String,
}

impl Envelope {
    fn parse(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(strip_stray_newline(body))?)
    }

    fn records(self) -> Option<Vec<Record>> {
        self.list.map(OneOrMany::into_vec)
    }

    fn require_records(self) -> Result<Vec<Record>> {
        self.records()
            .ok_or_else(|| FeedError::malformed("missing list field"))
    }
}

/// Some sites prepend a newline to the body
fn strip_stray_newline(body: &str) -> &str {
    body.strip_prefix('\n').unwrap_or(body)
}

/// Removes the `vod_` prefix from every key; an unprefixed key sent after
/// its prefixed twin wins.
fn strip_wire_prefix(record: Record) -> ItemSummary {
    let mut item = ItemSummary::new();
    for (key, value) in record {
        match key.strip_prefix(WIRE_PREFIX) {
            Some(stripped) => item.insert(stripped, value),
            None => item.insert(key, value),
        }
    }
    item
}

fn str_field<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

/// Parser for flat-record catalog documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonStrategy;

impl ParserStrategy for JsonStrategy {
    fn list_action(&self) -> &'static str {
        "list"
    }

    fn detail_action(&self) -> &'static str {
        "detail"
    }

    fn parse_classification(&self, body: &str) -> Result<ClassificationResult> {
        let envelope = Envelope::parse(body)?;
        if envelope.list.is_none() {
            return Err(FeedError::malformed("missing list field"));
        }
        let class = envelope
            .class
            .ok_or_else(|| FeedError::malformed("missing class field"))?;

        let classes: Vec<ClassDescriptor> = class
            .into_vec()
            .into_iter()
            .filter_map(|c| {
                let Some(id) = c.type_id else {
                    warn!(name = %c.type_name, "Skipping category without id");
                    return None;
                };
                Some(ClassDescriptor {
                    id,
                    name: c.type_name,
                })
            })
            .collect();
        debug!(classes = classes.len(), "Parsed flat-record classification");

        Ok(ClassificationResult {
            classes,
            page: envelope.page,
            page_count: envelope.pagecount,
            page_size: envelope.limit,
            record_count: envelope.total,
        })
    }

    fn parse_listing_page(&self, body: &str) -> Result<PageMeta> {
        let envelope = Envelope::parse(body)?;
        Ok(PageMeta::new(envelope.pagecount, envelope.total))
    }

    fn parse_listing(&self, body: &str) -> Result<Vec<ItemSummary>> {
        let records = Envelope::parse(body)?.require_records()?;
        Ok(records.into_iter().map(strip_wire_prefix).collect())
    }

    fn parse_detail(&self, body: &str) -> Result<Option<ItemDetail>> {
        let records = Envelope::parse(body)?.require_records()?;
        let Some(first) = records.first() else {
            return Ok(None);
        };

        let source_groups: Vec<SourceGroup> = records
            .iter()
            .enumerate()
            .filter_map(|(position, record)| {
                let raw = str_field(record, "vod_play_url").unwrap_or_default();
                let urls = split_playlist(&raw.replace('\\', ""));
                if urls.is_empty() {
                    debug!(position, "Skipping record without playable candidate");
                    return None;
                }
                Some(
                    SourceGroup::new(format!("m3u8{}", position + 1), urls)
                        .with_source_name(str_field(record, "vod_play_from")),
                )
            })
            .collect();

        let mut summary = strip_wire_prefix(first.clone());
        if let Some(content) = summary.get("content").cloned() {
            summary.insert("des", content);
        }

        debug!(groups = source_groups.len(), "Parsed flat-record detail");
        Ok(Some(ItemDetail::new(summary, source_groups)))
    }

    fn parse_search(&self, body: &str, _keyword: &str) -> Result<Vec<SearchMatch>> {
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records = Envelope::parse(body)?.records().unwrap_or_default();
        Ok(records.into_iter().map(strip_wire_prefix).collect())
    }

    fn parse_download(&self, body: &str) -> Result<DownloadBundle> {
        let envelope = Envelope::parse(body)?;
        match envelope.url {
            Some(Value::String(url)) if !url.trim().is_empty() => Ok(DownloadBundle::queued(url)),
            _ => Err(FeedError::no_download_link(NO_DOWNLOAD_LINK_MESSAGE)),
        }
    }
}
