//! Delimited playlist strings and source-group classification
//!
//! Upstream catalogs encode the playable sources of an item as one string
//! per source variant. Entries are separated by `#` and each entry is either
//! a bare URL or `title$url`:
//!
//! ```text
//! 第1集$http://cdn.example/1.m3u8#第2集$http://cdn.example/2.m3u8
//! ```
//!
//! Feeds routinely double or triple the `$` separator and mix entries that
//! are not URLs at all. [`split_playlist`] turns one such string into clean
//! candidates, and [`classify_source_groups`] turns the strings of one item
//! into labeled, ordered [`SourceGroup`]s.

use crate::models::SourceGroup;
use lazy_static::lazy_static;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::debug;

/// Formats the player handles natively
pub const SUPPORTED_FORMATS: [&str; 2] = ["m3u8", "mp4"];

/// Label of a group mixing several supported formats
pub const PREFERRED_SOURCE_LABEL: &str = "PreferredSource";

/// Characters left untouched by `encodeURI`
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b',')
    .remove(b'#');

lazy_static! {
    static ref SEPARATOR_RUN: Regex = Regex::new(r"\$+").expect("valid separator regex");
}

/// One playlist candidate split into its display title and URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaylistEntry<'a> {
    pub title: Option<&'a str>,
    pub url: &'a str,
}

impl<'a> PlaylistEntry<'a> {
    /// Splits `title$url`; a candidate that already starts with a URL scheme
    /// has no title even if it contains `$` further on.
    pub fn parse(candidate: &'a str) -> Self {
        if has_url_scheme(candidate) {
            return Self {
                title: None,
                url: candidate,
            };
        }
        match candidate.split_once('$') {
            Some((title, url)) => Self {
                title: Some(title),
                url,
            },
            None => Self {
                title: None,
                url: candidate,
            },
        }
    }

    /// Digits of the title when it is made of digits only, leading zeros
    /// removed. Titles of any length are accepted.
    pub fn episode_digits(&self) -> Option<&'a str> {
        let title = self.title?.trim();
        if title.is_empty() || !title.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match title.trim_start_matches('0') {
            "" => Some("0"),
            digits => Some(digits),
        }
    }
}

/// One raw playlist string and the upstream name of its source variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSource<'a> {
    pub playlist: &'a str,
    pub source_name: Option<&'a str>,
}

impl<'a> RawSource<'a> {
    pub fn new(playlist: &'a str) -> Self {
        Self {
            playlist,
            source_name: None,
        }
    }

    pub fn with_source_name(mut self, source_name: Option<&'a str>) -> Self {
        self.source_name = source_name;
        self
    }
}

impl<'a> From<&'a str> for RawSource<'a> {
    fn from(playlist: &'a str) -> Self {
        Self::new(playlist)
    }
}

/// True when `s` begins with `scheme://`
pub fn has_url_scheme(s: &str) -> bool {
    let Some((scheme, _)) = s.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Collapses every run of `$` into a single `$`
pub fn collapse_separators(raw: &str) -> Cow<'_, str> {
    SEPARATOR_RUN.replace_all(raw, "$")
}

fn is_candidate(segment: &str) -> bool {
    if segment.is_empty() {
        return false;
    }
    has_url_scheme(segment)
        || segment
            .split_once('$')
            .is_some_and(|(_, rest)| has_url_scheme(rest))
}

/// Normalizes one delimited playlist string into ordered candidates
///
/// Segments that are neither a URL nor `title$URL` are dropped silently.
pub fn split_playlist(raw: &str) -> Vec<String> {
    collapse_separators(raw)
        .split('#')
        .filter(|segment| is_candidate(segment))
        .map(str::to_string)
        .collect()
}

/// File extension at the end of a URL path, query string ignored
pub fn extension_of(url: &str) -> Option<String> {
    let path = url.split('?').next().unwrap_or(url);
    let (_, ext) = path.rsplit_once('.')?;
    if ext.is_empty() || !ext.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn is_supported_format(ext: &str) -> bool {
    SUPPORTED_FORMATS.iter().any(|f| *f == ext)
}

/// Labels eligible to be moved to the front of the group list
pub fn is_promotable_label(label: &str) -> bool {
    label.starts_with(PREFERRED_SOURCE_LABEL)
        || label.split('-').next().is_some_and(is_supported_format)
}

fn group_label(candidates: &[String], index: usize) -> Option<String> {
    let extensions: HashSet<String> = candidates
        .iter()
        .filter_map(|c| extension_of(PlaylistEntry::parse(c).url))
        .collect();

    if extensions.is_empty() || !extensions.iter().all(|e| is_supported_format(e)) {
        return None;
    }

    if extensions.len() == 1 {
        let ext = extensions.into_iter().next()?;
        Some(format!("{ext}-{index}"))
    } else if index == 0 {
        Some(PREFERRED_SOURCE_LABEL.to_string())
    } else {
        Some(format!("{PREFERRED_SOURCE_LABEL}-{index}"))
    }
}

/// Stable sort by episode number when every candidate carries one
///
/// Numbers are compared as digit strings (shorter first, then lexically) so
/// titles longer than any integer type still order numerically.
fn sort_by_episode(mut candidates: Vec<String>) -> Vec<String> {
    let numbered = candidates
        .iter()
        .all(|c| PlaylistEntry::parse(c).episode_digits().is_some());

    if numbered {
        candidates.sort_by_cached_key(|c| {
            let digits = PlaylistEntry::parse(c).episode_digits().unwrap_or_default();
            (digits.len(), digits.to_string())
        });
    }
    candidates
}

/// Moves the first promotable group to the front, keeping the others in order
fn promote_preferred(groups: &mut Vec<SourceGroup>) {
    if groups.len() < 2 {
        return;
    }
    if let Some(pos) = groups.iter().position(|g| is_promotable_label(&g.label)) {
        let group = groups.remove(pos);
        groups.insert(0, group);
    }
}

/// Builds the ordered source groups of one item
///
/// Each raw string becomes one group. Groups holding only supported formats
/// are labeled and consume the counting index; other groups keep an empty
/// label and their position. Promotion runs once, after every group exists.
pub fn classify_source_groups<'a, I>(sources: I) -> Vec<SourceGroup>
where
    I: IntoIterator,
    I::Item: Into<RawSource<'a>>,
{
    let mut index = 0;
    let mut groups = Vec::new();

    for source in sources {
        let source: RawSource<'a> = source.into();
        let candidates = split_playlist(source.playlist);
        if candidates.is_empty() {
            debug!(source = ?source.source_name, "Skipping source without playable candidate");
            continue;
        }

        let label = match group_label(&candidates, index) {
            Some(label) => {
                index += 1;
                label
            }
            None => String::new(),
        };

        groups.push(
            SourceGroup::new(label, sort_by_episode(candidates))
                .with_source_name(source.source_name),
        );
    }

    promote_preferred(&mut groups);
    groups
}

/// `encodeURI`-style percent-encoding of one URL
pub fn encode_uri(url: &str) -> String {
    utf8_percent_encode(url, URI_ENCODE_SET).to_string()
}

/// Flattens raw playlist strings into encoded download URLs
///
/// Unlike [`split_playlist`] no URL check is made: every non-empty entry is
/// kept, titles removed.
pub fn download_links<'a, I>(playlists: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    playlists
        .into_iter()
        .flat_map(|raw| {
            collapse_separators(raw)
                .split('#')
                .map(|segment| PlaylistEntry::parse(segment).url.trim().to_string())
                .filter(|url| !url.is_empty())
                .map(|url| encode_uri(&url))
                .collect::<Vec<_>>()
        })
        .collect()
}
