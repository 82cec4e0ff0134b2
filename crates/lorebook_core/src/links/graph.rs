//! Reverse-link pass and broken-link report.
//!
//! # Responsibility
//! - Recompute every entry's forward links from its current description.
//! - Invert all forward links into backward-link sets.
//! - Report references whose target entry does not exist.
//!
//! # Invariants
//! - After [`repopulate`], `linked_from(S) == { F : S ∈ links(F) }` for every
//!   indexed slug `S`.
//! - Backward links are recomputed from scratch on every pass.

use crate::index::engine::EntryIndex;
use crate::index::IndexResult;
use crate::store::EntryStore;
use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Summary of one reverse-link pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepopulateReport {
    /// Entries visited.
    pub entries: usize,
    /// Forward edges found, including dangling ones.
    pub edges: usize,
    /// Entries whose description could not be read; their previously indexed
    /// forward links were reused.
    pub skipped: usize,
}

/// Rebuilds forward and backward links for every indexed entry.
///
/// # Errors
/// - Fails on index read/write failures. Unreadable store entries are
///   skipped with a warning.
pub fn repopulate<S: EntryStore>(index: &EntryIndex, store: &S) -> IndexResult<RepopulateReport> {
    let started_at = Instant::now();
    let ids = index.all_ids()?;
    let mut report = RepopulateReport {
        entries: ids.len(),
        ..RepopulateReport::default()
    };
    let mut backlinks: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for id in &ids {
        let links = match store.read_entry(id) {
            Ok(entry) => index.put(&entry)?.links,
            Err(err) => {
                warn!("event=link_repopulate_entry module=links status=skipped id={id} error={err}");
                report.skipped += 1;
                index.lookup(id)?.map(|indexed| indexed.links).unwrap_or_default()
            }
        };

        report.edges += links.len();
        for target in links {
            backlinks.entry(target).or_default().insert(id.clone());
        }
    }

    for id in &ids {
        let sources = backlinks.remove(id).unwrap_or_default();
        index.set_backlinks(id, &sources)?;
    }

    info!(
        "event=link_repopulate module=links status=ok entries={} edges={} skipped={} duration_ms={}",
        report.entries,
        report.edges,
        report.skipped,
        started_at.elapsed().as_millis()
    );
    Ok(report)
}

/// Maps entry display names to the sorted slugs they reference that do not
/// exist. Entries without broken links are omitted.
pub fn broken_links(index: &EntryIndex) -> IndexResult<BTreeMap<String, Vec<String>>> {
    let ids = index.all_ids()?;
    let mut report = BTreeMap::new();

    for id in &ids {
        let Some(indexed) = index.lookup(id)? else {
            continue;
        };
        let missing: BTreeSet<String> = indexed
            .links
            .into_iter()
            .filter(|target| !ids.contains(target))
            .collect();
        if !missing.is_empty() {
            report.insert(indexed.name, missing.into_iter().collect());
        }
    }

    Ok(report)
}
