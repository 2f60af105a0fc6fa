//! Integration tests for the tag-tree catalog format

use vopfeed::{FeedError, ParseMode, ParserStrategy, XmlStrategy};

const CLASS: &str = include_str!("fixtures/xml_class.xml");
const CLASS_WITHOUT_LIST: &str = include_str!("fixtures/xml_class_without_list.xml");
const VIDEOLIST: &str = include_str!("fixtures/xml_videolist.xml");
const DETAIL: &str = include_str!("fixtures/xml_detail.xml");
const SEARCH: &str = include_str!("fixtures/xml_search.xml");

#[test]
fn test_classification() {
    let result = XmlStrategy.parse_classification(CLASS).unwrap();

    let names: Vec<&str> = result.classes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["电影片", "连续剧", "国产剧", "综艺片"]);
    assert_eq!(result.classes[2].id, "13");
    assert_eq!(result.page, 1);
    assert_eq!(result.page_count, 1276);
    assert_eq!(result.page_size, 20);
    assert_eq!(result.record_count, 25503);
}

#[test]
fn test_classification_without_list_is_malformed() {
    let err = XmlStrategy
        .parse_classification(CLASS_WITHOUT_LIST)
        .unwrap_err();
    assert!(matches!(err, FeedError::MalformedResponse(_)));
}

#[test]
fn test_listing_page() {
    let page = XmlStrategy.parse_listing_page(VIDEOLIST).unwrap();
    assert_eq!(page.total_page_count, 64);
    assert_eq!(page.page_count, 64);
    assert_eq!(page.record_count, 1270);
    assert!(page.items.is_empty());
}

#[test]
fn test_listing_keeps_playable_items() {
    let items = XmlStrategy.parse_listing(VIDEOLIST).unwrap();

    let ids: Vec<String> = items.iter().filter_map(|i| i.id()).collect();
    assert_eq!(ids, vec!["81234", "81236"]);
    assert_eq!(items[0].name().as_deref(), Some("繁花"));
    assert_eq!(
        items[0].picture().as_deref(),
        Some("/upload/vod/20240101-1/fanhua.jpg")
    );
    assert_eq!(items[0].get_str("state").as_deref(), Some(""));
    assert_eq!(items[1].name().as_deref(), Some("Foobar & Friends"));
}

#[test]
fn test_detail_source_groups() {
    let detail = XmlStrategy.parse_detail(DETAIL).unwrap().unwrap();

    assert_eq!(detail.summary.id().as_deref(), Some("81234"));
    assert_eq!(
        detail.summary.get_str("des").as_deref(),
        Some("<p>上海，1990年代。</p>")
    );

    let labels: Vec<&str> = detail.source_groups.iter().map(|g| g.label.as_str()).collect();
    assert_eq!(labels, vec!["m3u8-0", "", "PreferredSource-1"]);

    let m3u8 = &detail.source_groups[0];
    assert_eq!(m3u8.source_name.as_deref(), Some("lzm3u8"));
    assert_eq!(
        m3u8.urls,
        vec![
            "1$https://cdn.example.com/1/index.m3u8",
            "2$https://cdn.example.com/2/index.m3u8",
            "10$https://cdn.example.com/10/index.m3u8",
        ]
    );

    let share = &detail.source_groups[1];
    assert_eq!(share.source_name.as_deref(), Some("lzyun"));
    assert_eq!(share.urls.len(), 2);
    assert!(share.urls[0].starts_with("第01集$"));

    assert!(detail.find_group("PreferredSource-1").is_some());
}

#[test]
fn test_detail_groups_are_never_empty() {
    let detail = XmlStrategy.parse_detail(DETAIL).unwrap().unwrap();
    for group in &detail.source_groups {
        assert!(!group.urls.is_empty());
        for entry in group.entries() {
            assert!(entry.url.starts_with("https://"));
        }
    }
}

#[test]
fn test_search_keyword_filter() {
    let matches = XmlStrategy.parse_search(SEARCH, "foo").unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].name().as_deref(), Some("Foobar"));

    assert!(XmlStrategy.parse_search(SEARCH, "qux").unwrap().is_empty());
    assert!(XmlStrategy.parse_search(CLASS_WITHOUT_LIST, "foo").unwrap().is_empty());
}

#[test]
fn test_download_flattens_every_source() {
    let bundle = XmlStrategy.parse_download(DETAIL).unwrap();
    let links: Vec<&str> = bundle.links().collect();

    assert_eq!(links[0], "https://share.example.com/share/aaa");
    assert!(links.contains(&"https://cdn.example.com/10/index.m3u8"));
    assert!(links.contains(&"https://cdn.example.com/2.m3u8?sign=a.b"));
    // junk segments are not filtered by download extraction
    assert!(links.contains(&"not-a-url"));
    assert!(links.contains(&"more%20junk"));
}

#[test]
fn test_download_without_list_is_malformed() {
    assert!(XmlStrategy
        .parse_download(CLASS_WITHOUT_LIST)
        .unwrap_err()
        .is_malformed());
}

#[test]
fn test_dispatch_matches_direct_strategy() {
    assert_eq!(
        ParseMode::Xml.parse_detail(DETAIL).unwrap(),
        XmlStrategy.parse_detail(DETAIL).unwrap()
    );
    assert_eq!(
        ParseMode::Xml.parse_classification(CLASS).unwrap(),
        XmlStrategy.parse_classification(CLASS).unwrap()
    );
}
