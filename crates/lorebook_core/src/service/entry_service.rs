//! Entry use-case service.
//!
//! # Responsibility
//! - Expose the operations the CLI layer needs: save/index/remove entries,
//!   rebuild, stubs, search, timeline, link queries and link maintenance.
//! - Keep storage and index in step on every write path.
//!
//! # Invariants
//! - Writes validate the entry name and tags before touching storage.
//! - Descriptions are link-rendered against the index before being stored.
//! - Storage is written before the index, so the index never leads storage.

use crate::index::engine::{EntryIndex, RebuildReport, SearchPage};
use crate::index::pager::ResultPager;
use crate::index::projection::{from_indexed, IndexedEntry};
use crate::index::query::{EntryFilter, Sort};
use crate::index::{IndexError, IndexOptions};
use crate::links::graph::{broken_links, repopulate, RepopulateReport};
use crate::links::render_links;
use crate::model::entry::{normalize_tags, validate_name, Entry, EntryValidationError};
use crate::model::slug::slugify;
use crate::store::{EntryStore, StoreError};
use log::info;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for entry use-cases.
#[derive(Debug)]
pub enum ServiceError {
    Validation(EntryValidationError),
    /// Tag input contains a blank value.
    InvalidTag(String),
    EntryNotFound(String),
    /// Target slug already belongs to another entry.
    Duplicate(String),
    Store(StoreError),
    Index(IndexError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidTag(value) => write!(f, "invalid tag: `{value}`"),
            Self::EntryNotFound(id) => write!(f, "entry not found: {id}"),
            Self::Duplicate(id) => write!(f, "an entry named `{id}` already exists"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Index(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent entry state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Index(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EntryValidationError> for ServiceError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::EntryNotFound(id),
            StoreError::Duplicate(id) => Self::Duplicate(id),
            StoreError::Validation(err) => Self::Validation(err),
            other => Self::Store(other),
        }
    }
}

impl From<IndexError> for ServiceError {
    fn from(value: IndexError) -> Self {
        Self::Index(value)
    }
}

/// Facade over entry storage and the search index.
pub struct EntryService<S: EntryStore> {
    store: S,
    index: EntryIndex,
}

impl<S: EntryStore> EntryService<S> {
    /// Creates a service from an already-opened index.
    pub fn new(store: S, index: EntryIndex) -> Self {
        Self { store, index }
    }

    /// Opens (or builds) the index at `index_path` for `store`.
    pub fn open(store: S, index_path: impl AsRef<Path>, options: IndexOptions) -> ServiceResult<Self> {
        let index = EntryIndex::open(index_path, &store, options)?;
        Ok(Self::new(store, index))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn index(&self) -> &EntryIndex {
        &self.index
    }

    /// Validates, link-renders, stores and indexes one entry.
    ///
    /// Returns the indexed projection of what was stored.
    pub fn save_entry(&self, mut entry: Entry) -> ServiceResult<IndexedEntry> {
        entry.validate()?;
        if let Some(blank) = entry.tags.iter().find(|tag| tag.trim().is_empty()) {
            return Err(ServiceError::InvalidTag(blank.clone()));
        }
        entry.tags = normalize_tags(&entry.tags);

        let own_slug = entry.slug();
        let rendered = render_links(&entry.description, |slug| {
            slug == own_slug || self.index.exists(slug)
        });
        entry.description = rendered.text;
        entry.modified = chrono::Utc::now().timestamp_millis();

        self.store.write_entry(&entry)?;
        let indexed = self.index.put(&entry)?;
        info!(
            "event=entry_save module=service status=ok slug={} links={}",
            indexed.slug,
            indexed.links.len()
        );
        Ok(indexed)
    }

    /// Indexes an entry as-is, without touching storage.
    pub fn index_entry(&self, entry: &Entry) -> ServiceResult<IndexedEntry> {
        Ok(self.index.put(entry)?)
    }

    /// Removes one slug from the index only.
    pub fn remove_from_index(&self, id: &str) -> ServiceResult<bool> {
        Ok(self.index.delete(id)?)
    }

    /// Discards the index and rebuilds it from storage.
    pub fn rebuild(&mut self) -> ServiceResult<RebuildReport> {
        Ok(self.index.rebuild(&self.store)?)
    }

    /// Deletes an entry from storage and the index.
    pub fn delete_entry(&self, id: &str) -> ServiceResult<()> {
        self.store.delete_entry(id)?;
        self.index.delete(id)?;
        info!("event=entry_delete module=service status=ok slug={id}");
        Ok(())
    }

    /// Renames an entry, re-indexes it under the new slug and refreshes the
    /// link graph.
    pub fn rename_entry(&self, old_id: &str, new_name: &str) -> ServiceResult<IndexedEntry> {
        validate_name(new_name)?;
        let mut entry = self.store.read_entry(old_id)?;
        let new_id = slugify(new_name);
        if new_id != old_id && self.index.contains(&new_id)? {
            return Err(ServiceError::Duplicate(new_id));
        }

        entry.name = new_name.to_string();
        entry.modified = chrono::Utc::now().timestamp_millis();
        self.store.rename_entry(old_id, &entry)?;

        self.index.delete(old_id)?;
        self.index.put(&entry)?;
        repopulate(&self.index, &self.store)?;
        info!("event=entry_rename module=service status=ok from={old_id} to={new_id}");

        self.index
            .lookup(&new_id)?
            .ok_or(ServiceError::InconsistentState(
                "renamed entry missing from index",
            ))
    }

    /// Reads the full entry from storage.
    pub fn entry(&self, id: &str) -> ServiceResult<Entry> {
        Ok(self.store.read_entry(id)?)
    }

    /// Display projection rebuilt from the index (description is an excerpt).
    pub fn stub(&self, id: &str) -> ServiceResult<Option<Entry>> {
        Ok(self.index.lookup(id)?.as_ref().map(from_indexed))
    }

    /// Runs a filtered, sorted, paginated search.
    pub fn search_entries(
        &self,
        filter: &EntryFilter,
        sort: Sort,
        page_no: u32,
        page_size: u32,
    ) -> ServiceResult<SearchPage> {
        Ok(self.index.search(filter, sort, page_no, page_size)?)
    }

    /// Starts interactive paging over a search.
    pub fn pager(
        &self,
        filter: &EntryFilter,
        sort: Sort,
        page_size: Option<u32>,
    ) -> ServiceResult<ResultPager<'_>> {
        Ok(ResultPager::new(&self.index, filter, sort, page_size)?)
    }

    /// Entries starting within `[start, end]`, earliest first.
    pub fn timeline(&self, start: &str, end: &str) -> ServiceResult<Vec<IndexedEntry>> {
        Ok(self.index.timeline(start, end)?)
    }

    /// Forward links of `id`, or `None` when it is not indexed.
    pub fn links(&self, id: &str) -> ServiceResult<Option<Vec<String>>> {
        Ok(self.index.lookup(id)?.map(|indexed| indexed.links))
    }

    /// Backward links of `id`, or `None` when it is not indexed.
    pub fn reverse_links(&self, id: &str) -> ServiceResult<Option<BTreeSet<String>>> {
        Ok(self.index.lookup(id)?.map(|indexed| indexed.linked_from))
    }

    /// Recomputes forward and backward links for every entry.
    pub fn repopulate_links(&self) -> ServiceResult<RepopulateReport> {
        Ok(repopulate(&self.index, &self.store)?)
    }

    /// Dangling references grouped by entry display name.
    pub fn broken_links(&self) -> ServiceResult<BTreeMap<String, Vec<String>>> {
        Ok(broken_links(&self.index)?)
    }

    /// Every tag in use, sorted.
    pub fn list_tags(&self) -> ServiceResult<Vec<String>> {
        Ok(self.index.all_tags()?)
    }
}
