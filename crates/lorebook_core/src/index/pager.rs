//! Stateful, re-querying result pager.
//!
//! # Responsibility
//! - Track filter, sort, page size, current page and last seen total.
//! - Re-issue the query on every page change so results stay fresh.
//!
//! # Invariants
//! - Only the current page's entries are held; other pages are never cached.
//! - `next`/`prev` at a boundary return `false` and leave state unchanged.

use super::engine::EntryIndex;
use super::projection::IndexedEntry;
use super::query::{build_query, Clause, EntryFilter, Sort};
use super::IndexResult;

/// Interactive pager over one index query.
pub struct ResultPager<'idx> {
    index: &'idx EntryIndex,
    clause: Clause,
    sort: Sort,
    page_size: u32,
    page_no: u32,
    total: u64,
    entries: Vec<IndexedEntry>,
}

impl<'idx> ResultPager<'idx> {
    /// Creates a pager for `filter` and loads the first page.
    pub fn new(
        index: &'idx EntryIndex,
        filter: &EntryFilter,
        sort: Sort,
        page_size: Option<u32>,
    ) -> IndexResult<Self> {
        let clause = build_query(filter, index.options().name_boost);
        Self::for_clause(index, clause, sort, page_size)
    }

    /// Creates a pager for a prebuilt clause and loads the first page.
    pub fn for_clause(
        index: &'idx EntryIndex,
        clause: Clause,
        sort: Sort,
        page_size: Option<u32>,
    ) -> IndexResult<Self> {
        let mut pager = Self {
            index,
            clause,
            sort,
            page_size: index.options().normalize_page_size(page_size),
            page_no: 1,
            total: 0,
            entries: Vec::new(),
        };
        pager.refresh()?;
        Ok(pager)
    }

    /// Re-queries the current page.
    pub fn refresh(&mut self) -> IndexResult<()> {
        let page = self
            .index
            .query(&self.clause, self.sort, self.page_no, self.page_size)?;
        self.total = page.total;
        self.entries = page.entries;
        Ok(())
    }

    /// Moves to the next page. Returns `false` when already on the last page.
    pub fn next(&mut self) -> IndexResult<bool> {
        if u64::from(self.page_no) * u64::from(self.page_size) >= self.total {
            return Ok(false);
        }
        self.page_no += 1;
        self.refresh()?;
        Ok(true)
    }

    /// Moves to the previous page. Returns `false` on the first page.
    pub fn prev(&mut self) -> IndexResult<bool> {
        if self.page_no <= 1 {
            return Ok(false);
        }
        self.page_no -= 1;
        self.refresh()?;
        Ok(true)
    }

    /// Entries of the current page.
    pub fn entries(&self) -> &[IndexedEntry] {
        &self.entries
    }

    pub fn page_no(&self) -> u32 {
        self.page_no
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Total matches as of the last fetch.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of pages as of the last fetch.
    pub fn page_count(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page_size))
    }
}
