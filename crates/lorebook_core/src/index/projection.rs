//! Entry ↔ indexed-entry projection.
//!
//! # Responsibility
//! - Flatten an [`Entry`] into the search-friendly [`IndexedEntry`].
//! - Reconstruct a display [`Entry`] from an indexed row.
//!
//! # Invariants
//! - The projection is lossy on `description`: only an excerpt is kept.
//! - `links` is always recomputed from the description, never copied.
//! - Malformed date strings are logged and indexed as "no date".

use crate::links::extract_links;
use crate::model::entry::{normalize_tags, Entry, EntryType};
use crate::model::flex_date::{format_flex_date, FlexDate};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Denormalized, rebuildable search projection of one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedEntry {
    pub slug: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryType,
    /// Description truncated at a whitespace boundary.
    pub excerpt: String,
    pub tags: BTreeSet<String>,
    /// Forward links in first-occurrence order.
    pub links: Vec<String>,
    /// Backward links, maintained by the reverse-link pass.
    pub linked_from: BTreeSet<String>,
    pub start: Option<FlexDate>,
    pub end: Option<FlexDate>,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub custom: BTreeMap<String, String>,
    pub created: i64,
    pub modified: i64,
}

impl IndexedEntry {
    /// Text fed to the full-text index besides the name.
    pub(crate) fn search_body(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3 + self.tags.len() + self.custom.len());
        parts.push(self.excerpt.as_str());
        parts.extend(self.tags.iter().map(String::as_str));
        parts.push(self.address.as_str());
        parts.extend(self.custom.values().map(String::as_str));
        parts.retain(|part| !part.is_empty());
        parts.join("\n")
    }
}

/// Projects an entry for indexing.
///
/// `excerpt_chars` bounds the stored description excerpt. Tags are
/// re-normalized so hand-built entries index consistently.
pub fn to_indexed(entry: &Entry, excerpt_chars: usize) -> IndexedEntry {
    let slug = entry.slug();
    IndexedEntry {
        start: parse_date_field(&slug, "start", &entry.start),
        end: parse_date_field(&slug, "end", &entry.end),
        slug,
        name: entry.name.clone(),
        kind: entry.kind,
        excerpt: excerpt(&entry.description, excerpt_chars),
        tags: normalize_tags(&entry.tags),
        links: extract_links(&entry.description),
        linked_from: BTreeSet::new(),
        address: entry.address.clone(),
        latitude: entry.latitude,
        longitude: entry.longitude,
        custom: entry.custom.clone(),
        created: entry.created,
        modified: entry.modified,
    }
}

/// Rebuilds a display entry from its indexed projection.
///
/// The description is the stored excerpt, not the full text.
pub fn from_indexed(indexed: &IndexedEntry) -> Entry {
    Entry {
        name: indexed.name.clone(),
        description: indexed.excerpt.clone(),
        tags: indexed.tags.clone(),
        kind: indexed.kind,
        start: format_flex_date(indexed.start.as_ref()),
        end: format_flex_date(indexed.end.as_ref()),
        address: indexed.address.clone(),
        latitude: indexed.latitude,
        longitude: indexed.longitude,
        custom: indexed.custom.clone(),
        created: indexed.created,
        modified: indexed.modified,
    }
}

/// Truncates `text` to at most `budget` characters, cutting at the last
/// whitespace before the budget when there is one.
pub fn excerpt(text: &str, budget: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= budget {
        return trimmed.to_string();
    }

    let mut chars = trimmed.chars();
    let head: String = chars.by_ref().take(budget).collect();
    if chars.next().is_some_and(char::is_whitespace) {
        return head.trim_end().to_string();
    }
    match head.rfind(char::is_whitespace) {
        Some(cut) if cut > 0 => head[..cut].trim_end().to_string(),
        _ => head,
    }
}

fn parse_date_field(slug: &str, field: &str, value: &str) -> Option<FlexDate> {
    match FlexDate::parse(value) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("event=date_parse module=index status=degraded slug={slug} field={field} error={err}");
            None
        }
    }
}
