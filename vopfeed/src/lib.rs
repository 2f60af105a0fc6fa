//! Feed normalization engine for third-party video catalogs
//!
//! Catalog sites expose the same data (categories, paginated listings, item
//! detail, search, download links) in one of two wire formats: tag-tree XML
//! documents or flat JSON records. Within each format the list of playable
//! sources of an item is encoded as loosely delimited strings with repeated
//! separators, junk segments and mixed media formats.
//!
//! This crate turns raw response bodies into a canonical model:
//!
//! - [`ParserStrategy`]: the six parse operations, implemented by
//!   [`XmlStrategy`], [`JsonStrategy`] and the [`ParseMode`] dispatcher
//! - [`playlist`]: delimited playlist normalization and source-group
//!   classification shared by both formats
//! - [`Site`] / [`SiteFeed`]: per-site request URLs and post-processing
//!
//! Nothing here performs I/O. Fetching bodies, caching and concurrency are
//! left to the caller.
//!
//! # Example
//!
//! ```
//! use vopfeed::{ParseMode, ParserStrategy};
//!
//! let body = r#"<rss><list><video>
//!     <id>1</id><name>Foobar</name>
//!     <dl><dd>1$http://a.com/1.m3u8#2$http://a.com/2.m3u8</dd></dl>
//! </video></list></rss>"#;
//!
//! let detail = ParseMode::Xml.parse_detail(body)?.expect("one video");
//! assert_eq!(detail.source_groups[0].label, "m3u8-0");
//! # Ok::<(), vopfeed::FeedError>(())
//! ```
//!
//! # Configuration Extension
//!
//! With the `vopconfig` feature (default) the site list is read from the
//! configuration through [`CatalogConfigExt`].

pub mod error;
pub mod json;
pub mod models;
pub mod playlist;
pub mod site;
pub mod strategy;
mod tagtree;
pub mod xml;

#[cfg(feature = "vopconfig")]
pub mod config_ext;

pub use error::{FeedError, Result};
pub use json::JsonStrategy;
pub use models::{
    ClassDescriptor, ClassificationResult, DownloadBundle, ItemDetail, ItemSummary, OneOrMany,
    PageMeta, SearchMatch, SourceGroup,
};
pub use playlist::{classify_source_groups, split_playlist, PlaylistEntry, RawSource};
pub use site::{Site, SiteFeed};
pub use strategy::{ParseMode, ParserStrategy};
pub use xml::XmlStrategy;

#[cfg(feature = "vopconfig")]
pub use config_ext::CatalogConfigExt;
