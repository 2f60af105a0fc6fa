//! Tag-tree (XML) catalog format
//!
//! Documents look like:
//!
//! ```xml
//! <rss version="5.1">
//!   <class><ty id="1">电影{hot}</ty><ty id="2">剧集</ty></class>
//!   <list page="1" pagecount="20" pagesize="20" recordcount="400">
//!     <video>
//!       <id>42</id><name>Foobar</name><pic>/upload/42.jpg</pic>
//!       <dl><dd flag="lzm3u8">第01集$http://cdn/1.m3u8#第02集$http://cdn/2.m3u8</dd></dl>
//!     </video>
//!   </list>
//! </rss>
//! ```
//!
//! The `<rss>` wrapper is optional.

use crate::error::{FeedError, Result};
use crate::models::{
    ClassDescriptor, ClassificationResult, DownloadBundle, ItemDetail, ItemSummary, PageMeta,
    SearchMatch, NO_DOWNLOAD_LINK_MESSAGE,
};
use crate::playlist::{classify_source_groups, download_links, RawSource};
use crate::strategy::ParserStrategy;
use crate::tagtree::TagNode;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

lazy_static! {
    static ref LIST_OPENING_TAG: Regex =
        Regex::new(r"<list(\s[^>]*?)?\s*/?>").expect("valid list tag regex");
    static ref CLASS_DECORATION: Regex = Regex::new(r"\{.*\}").expect("valid decoration regex");
}

/// Parser for tag-tree catalog documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XmlStrategy;

impl XmlStrategy {
    /// Parses `body` and returns the node holding `<class>` and `<list>`
    fn container(body: &str) -> Result<TagNode> {
        let mut doc = TagNode::parse_document(body)?;
        match doc.children.iter().position(|c| c.name == "rss") {
            Some(pos) => Ok(doc.children.swap_remove(pos)),
            None => Ok(doc),
        }
    }

    fn require<'a>(node: &'a TagNode, name: &str) -> Result<&'a TagNode> {
        node.child(name)
            .ok_or_else(|| FeedError::malformed(format!("missing <{name}> node")))
    }

    fn counter(node: &TagNode, attribute: &str) -> u32 {
        node.attr(attribute)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Leaf children of a `<video>` as a flat record; nested nodes such as
    /// `<dl>` are not part of the summary.
    fn summary(video: &TagNode) -> ItemSummary {
        let mut item = ItemSummary::new();
        for field in video.children.iter().filter(|c| c.is_leaf()) {
            item.insert_if_absent(&field.name, Value::String(field.text().to_string()));
        }
        item
    }

    fn has_playable_source(video: &TagNode) -> bool {
        video
            .child("dl")
            .is_some_and(|dl| dl.children_named("dd").any(|dd| !dd.text().is_empty()))
    }

    fn videos(list: &TagNode) -> impl Iterator<Item = &TagNode> {
        list.children_named("video")
    }
}

impl ParserStrategy for XmlStrategy {
    fn list_action(&self) -> &'static str {
        "videolist"
    }

    fn detail_action(&self) -> &'static str {
        "videolist"
    }

    fn parse_classification(&self, body: &str) -> Result<ClassificationResult> {
        let root = Self::container(body)?;
        let class = Self::require(&root, "class")?;
        let list = Self::require(&root, "list")?;

        let classes = class
            .children_named("ty")
            .filter_map(|ty| {
                let Some(id) = ty.attr("id") else {
                    warn!(name = ty.text(), "Skipping category without id");
                    return None;
                };
                Some(ClassDescriptor {
                    id: id.trim().to_string(),
                    name: CLASS_DECORATION.replace(ty.text(), "").trim().to_string(),
                })
            })
            .collect::<Vec<_>>();

        debug!(classes = classes.len(), "Parsed tag-tree classification");

        Ok(ClassificationResult {
            classes,
            page: Self::counter(list, "page"),
            page_count: Self::counter(list, "pagecount"),
            page_size: Self::counter(list, "pagesize"),
            record_count: Self::counter(list, "recordcount"),
        })
    }

    fn parse_listing_page(&self, body: &str) -> Result<PageMeta> {
        // Only the opening tag is read, the item body may be arbitrarily broken
        let captures = LIST_OPENING_TAG
            .captures(body)
            .ok_or_else(|| FeedError::malformed("missing <list> node"))?;
        let attributes = captures.get(1).map_or("", |m| m.as_str());
        let header = TagNode::parse_document(&format!("<list{attributes}></list>"))?;
        let list = Self::require(&header, "list")?;

        Ok(PageMeta::new(
            Self::counter(list, "pagecount"),
            Self::counter(list, "recordcount"),
        ))
    }

    fn parse_listing(&self, body: &str) -> Result<Vec<ItemSummary>> {
        let root = Self::container(body)?;
        let list = Self::require(&root, "list")?;

        let items: Vec<ItemSummary> = Self::videos(list)
            .filter(|video| Self::has_playable_source(video))
            .map(Self::summary)
            .collect();

        debug!(items = items.len(), "Parsed tag-tree listing");
        Ok(items)
    }

    fn parse_detail(&self, body: &str) -> Result<Option<ItemDetail>> {
        let root = Self::container(body)?;
        let Some(video) = root.child("list").and_then(|list| list.child("video")) else {
            return Ok(None);
        };

        let dl = Self::require(video, "dl")?;
        let dds: Vec<&TagNode> = dl.children_named("dd").collect();
        if dds.is_empty() {
            return Err(FeedError::malformed("missing <dd> node"));
        }

        let source_groups = classify_source_groups(
            dds.iter()
                .map(|dd| RawSource::new(dd.text()).with_source_name(dd.attr("flag"))),
        );
        debug!(groups = source_groups.len(), "Parsed tag-tree detail");

        Ok(Some(ItemDetail::new(Self::summary(video), source_groups)))
    }

    fn parse_search(&self, body: &str, keyword: &str) -> Result<Vec<SearchMatch>> {
        let root = Self::container(body)?;
        let Some(list) = root.child("list") else {
            return Ok(Vec::new());
        };

        Ok(Self::videos(list)
            .map(Self::summary)
            .filter(|item| item.matches_keyword(keyword))
            .collect())
    }

    fn parse_download(&self, body: &str) -> Result<DownloadBundle> {
        let root = Self::container(body)?;
        let list = Self::require(&root, "list")?;

        let links = match list.child("video").and_then(|video| video.child("dl")) {
            Some(dl) => download_links(dl.children_named("dd").map(TagNode::text)),
            None => Vec::new(),
        };
        if links.is_empty() {
            return Err(FeedError::no_download_link(NO_DOWNLOAD_LINK_MESSAGE));
        }

        Ok(DownloadBundle::queued(links.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DOWNLOAD_QUEUED_MESSAGE;

    const CLASS_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="5.1">
  <list page="1" pagecount="5" pagesize="20" recordcount="88">
    <video><id>1</id><name>A</name></video>
  </list>
  <class>
    <ty id="1">电影{hot}</ty>
    <ty id="2">剧集</ty>
  </class>
</rss>"#;

    #[test]
    fn test_classification() {
        let result = XmlStrategy.parse_classification(CLASS_BODY).unwrap();
        assert_eq!(
            result.classes,
            vec![
                ClassDescriptor {
                    id: "1".into(),
                    name: "电影".into()
                },
                ClassDescriptor {
                    id: "2".into(),
                    name: "剧集".into()
                },
            ]
        );
        assert_eq!(
            (result.page, result.page_count, result.page_size, result.record_count),
            (1, 5, 20, 88)
        );
    }

    #[test]
    fn test_classification_single_category_without_rss() {
        let body = r#"<class><ty id="9">Docs</ty></class><list pagecount="2"/>"#;
        let result = XmlStrategy.parse_classification(body).unwrap();
        assert_eq!(result.classes.len(), 1);
        assert_eq!(result.classes[0].name, "Docs");
        assert_eq!(result.page_count, 2);
        assert_eq!(result.page, 0);
    }

    #[test]
    fn test_classification_requires_list() {
        let body = r#"<rss><class><ty id="1">A</ty></class></rss>"#;
        let err = XmlStrategy.parse_classification(body).unwrap_err();
        assert!(matches!(err, FeedError::MalformedResponse(_)));
    }

    #[test]
    fn test_listing_page_reads_header_only() {
        let body = r#"<rss><list page="3" pagecount="12" recordcount="240"><video><name>broken"#;
        let page = XmlStrategy.parse_listing_page(body).unwrap();
        assert_eq!(page.total_page_count, 12);
        assert_eq!(page.page_count, 12);
        assert_eq!(page.record_count, 240);
        assert!(page.items.is_empty());

        let page = XmlStrategy
            .parse_listing_page(r#"<rss><list pagecount="1" recordcount="0"/></rss>"#)
            .unwrap();
        assert_eq!(page.page_count, 1);

        assert!(XmlStrategy
            .parse_listing_page("<rss><listing/></rss>")
            .unwrap_err()
            .is_malformed());
    }

    #[test]
    fn test_listing_drops_items_without_source() {
        let body = r#"<rss><list>
            <video><id>1</id><name>Kept</name><dl><dd flag="a"></dd><dd>http://a/1.m3u8</dd></dl></video>
            <video><id>2</id><name>No dl</name></video>
            <video><id>3</id><name>Empty dd</name><dl><dd> </dd></dl></video>
        </list></rss>"#;
        let items = XmlStrategy.parse_listing(body).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name().as_deref(), Some("Kept"));
        assert!(items[0].get("dl").is_none());
    }

    #[test]
    fn test_listing_keeps_item_with_bare_less_than_in_name() {
        let body = r#"<rss><list>
            <video><id>1</id><name>a < b</name><dl><dd>http://a/1.m3u8</dd></dl></video>
            <video><id>2</id><name>c</name><dl><dd>http://a/2.m3u8</dd></dl></video>
        </list></rss>"#;
        let items = XmlStrategy.parse_listing(body).unwrap();
        let names: Vec<String> = items.iter().filter_map(|item| item.name()).collect();
        assert_eq!(names, vec!["a < b", "c"]);
    }

    #[test]
    fn test_listing_without_videos_is_empty() {
        assert!(XmlStrategy.parse_listing("<rss><list/></rss>").unwrap().is_empty());
        assert!(XmlStrategy.parse_listing("<rss></rss>").unwrap_err().is_malformed());
    }

    #[test]
    fn test_detail_builds_source_groups() {
        let body = r#"<rss><list><video>
            <id>7</id><name>Show</name><des><![CDATA[<p>Plot</p>]]></des>
            <dl>
              <dd flag="xx">http://x/x.ts</dd>
              <dd flag="lzm3u8">2$$http://a/2.m3u8#1$http://a/1.m3u8</dd>
            </dl>
        </video></list></rss>"#;
        let detail = XmlStrategy.parse_detail(body).unwrap().unwrap();
        assert_eq!(detail.summary.id().as_deref(), Some("7"));
        assert_eq!(detail.summary.get_str("des").as_deref(), Some("<p>Plot</p>"));
        assert_eq!(detail.source_groups.len(), 2);
        assert_eq!(detail.source_groups[0].label, "m3u8-0");
        assert_eq!(detail.source_groups[0].source_name.as_deref(), Some("lzm3u8"));
        assert_eq!(
            detail.source_groups[0].urls,
            vec!["1$http://a/1.m3u8", "2$http://a/2.m3u8"]
        );
        assert_eq!(detail.source_groups[1].label, "");
    }

    #[test]
    fn test_detail_empty_and_malformed() {
        assert_eq!(XmlStrategy.parse_detail("<rss><list/></rss>").unwrap(), None);
        let no_dl = "<rss><list><video><id>1</id></video></list></rss>";
        assert!(XmlStrategy.parse_detail(no_dl).unwrap_err().is_malformed());
        let no_dd = "<rss><list><video><dl></dl></video></list></rss>";
        assert!(XmlStrategy.parse_detail(no_dd).unwrap_err().is_malformed());
    }

    #[test]
    fn test_search_filters_by_name() {
        let body = r#"<rss><list>
            <video><id>1</id><name>Foobar</name></video>
            <video><id>2</id><name>baz</name></video>
        </list></rss>"#;
        let matches = XmlStrategy.parse_search(body, "FOO").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id().as_deref(), Some("1"));
        assert!(XmlStrategy.parse_search("<rss/>", "foo").unwrap().is_empty());
    }

    #[test]
    fn test_download() {
        let body = r#"<rss><list><video><dl>
            <dd>第1集$$http://a/1 a.mp4#第2集$http://a/2.mp4</dd>
            <dd>http://b/1.m3u8</dd>
        </dl></video></list></rss>"#;
        let bundle = XmlStrategy.parse_download(body).unwrap();
        assert_eq!(
            bundle.urls,
            "http://a/1%20a.mp4\nhttp://a/2.mp4\nhttp://b/1.m3u8"
        );
        assert_eq!(bundle.message, DOWNLOAD_QUEUED_MESSAGE);
    }

    #[test]
    fn test_download_errors() {
        assert!(XmlStrategy.parse_download("<rss/>").unwrap_err().is_malformed());
        let empty = "<rss><list><video><dl><dd></dd></dl></video></list></rss>";
        assert!(XmlStrategy.parse_download(empty).unwrap_err().is_no_download_link());
    }
}
