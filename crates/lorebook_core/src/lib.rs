//! Core indexing and link-graph engine for Lorebook, a personal knowledge
//! base of people, places, things, events and notes.
//! This crate is the single source of truth for entry identity, link and
//! search semantics.

pub mod db;
pub mod index;
pub mod links;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use index::engine::{EntryIndex, IndexState, RebuildReport, SearchPage};
pub use index::pager::ResultPager;
pub use index::projection::{excerpt, from_indexed, to_indexed, IndexedEntry};
pub use index::query::{build_query, Clause, EntryFilter, Sort, SortField};
pub use index::{IndexError, IndexOptions, IndexResult};
pub use links::graph::{broken_links, repopulate, RepopulateReport};
pub use links::{extract_links, render_links, LinkExtractor, RenderedLinks};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entry::{normalize_tags, validate_name, Entry, EntryType, EntryValidationError};
pub use model::flex_date::{format_flex_date, range_end, range_start, DateError, DatePrecision, FlexDate};
pub use model::slug::slugify;
pub use service::entry_service::{EntryService, ServiceError, ServiceResult};
pub use store::{EntryStore, MemoryEntryStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
