//! Integration tests for the flat-record catalog format

use serde_json::json;
use vopfeed::{FeedError, JsonStrategy, ParseMode, ParserStrategy};

const CLASS: &str = include_str!("fixtures/json_class.json");
const LIST: &str = include_str!("fixtures/json_list.json");
const DETAIL: &str = include_str!("fixtures/json_detail.json");
const DOWNLOAD: &str = include_str!("fixtures/json_download.json");

#[test]
fn test_classification() {
    let result = JsonStrategy.parse_classification(CLASS).unwrap();

    assert_eq!(result.classes.len(), 3);
    assert_eq!(result.classes[2].id, "13");
    assert_eq!(result.classes[2].name, "国产剧");
    assert_eq!(result.page, 1);
    assert_eq!(result.page_count, 1502);
    assert_eq!(result.page_size, 20);
    assert_eq!(result.record_count, 30031);
}

#[test]
fn test_classification_without_list_is_malformed() {
    let body = json!({"code": 1, "class": [{"type_id": 1, "type_name": "电影片"}]}).to_string();
    let err = JsonStrategy.parse_classification(&body).unwrap_err();
    assert!(matches!(err, FeedError::MalformedResponse(_)));
}

#[test]
fn test_listing_page_with_leading_newline() {
    let page = JsonStrategy.parse_listing_page(LIST).unwrap();
    assert_eq!(page.page_count, 1502);
    assert_eq!(page.total_page_count, 1502);
    assert_eq!(page.record_count, 30031);
}

#[test]
fn test_listing_records() {
    let items = JsonStrategy.parse_listing(LIST).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id().as_deref(), Some("90211"));
    assert_eq!(items[0].picture().as_deref(), Some("/upload/vod/fanhua.jpg"));
    assert_eq!(items[1].get_str("remarks").as_deref(), Some("HD"));
    assert!(items[1].get("vod_remarks").is_none());
}

#[test]
fn test_detail() {
    let detail = JsonStrategy.parse_detail(DETAIL).unwrap().unwrap();

    assert_eq!(detail.summary.name().as_deref(), Some("繁花"));
    assert_eq!(
        detail.summary.get_str("des"),
        detail.summary.get_str("content")
    );

    let labels: Vec<&str> = detail.source_groups.iter().map(|g| g.label.as_str()).collect();
    assert_eq!(labels, vec!["m3u81", "m3u83"]);
    assert_eq!(
        detail.source_groups[0].urls,
        vec![
            "第01集$https://cdn.example.com/1/index.m3u8",
            "第02集$https://cdn.example.com/2/index.m3u8",
        ]
    );
    assert_eq!(detail.source_groups[1].source_name.as_deref(), Some("backup"));
}

#[test]
fn test_detail_empty_list() {
    let body = json!({"code": 1, "list": []}).to_string();
    assert_eq!(JsonStrategy.parse_detail(&body).unwrap(), None);
}

#[test]
fn test_search_is_not_refiltered() {
    let body = json!({"list": [
        {"vod_id": 1, "vod_name": "Foobar"},
        {"vod_id": 2, "vod_name": "baz"}
    ]})
    .to_string();

    let matches = JsonStrategy.parse_search(&body, "foo").unwrap();
    let names: Vec<String> = matches.iter().filter_map(|m| m.name()).collect();
    assert_eq!(names, vec!["Foobar", "baz"]);
    assert!(JsonStrategy.parse_search("", "foo").unwrap().is_empty());
}

#[test]
fn test_download() {
    let bundle = JsonStrategy.parse_download(DOWNLOAD).unwrap();
    assert_eq!(
        bundle.links().collect::<Vec<_>>(),
        vec![
            "https://cdn.example.com/1/index.mp4",
            "https://cdn.example.com/2/index.mp4"
        ]
    );

    let err = JsonStrategy.parse_download(CLASS).unwrap_err();
    assert!(matches!(err, FeedError::NoDownloadLink(_)));
}

#[test]
fn test_invalid_body_is_malformed() {
    for body in ["<rss/>", "{\"list\": ", "[1, 2]"] {
        assert!(ParseMode::Json.parse_listing(body).unwrap_err().is_malformed());
    }
}
