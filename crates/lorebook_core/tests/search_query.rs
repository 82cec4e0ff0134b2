use lorebook_core::{
    Entry, EntryFilter, EntryIndex, EntryType, IndexOptions, IndexedEntry, Sort, SortField,
};
use std::collections::BTreeSet;

fn entry(name: &str, kind: EntryType, description: &str, tags: &[&str]) -> Entry {
    let mut entry = Entry::new(name, kind);
    entry.description = description.to_string();
    entry.set_tags(tags.iter().copied());
    entry
}

fn slugs(entries: &[IndexedEntry]) -> Vec<&str> {
    entries.iter().map(|indexed| indexed.slug.as_str()).collect()
}

fn tagged_index() -> EntryIndex {
    let index = EntryIndex::open_in_memory(IndexOptions::default()).unwrap();
    index
        .put(&entry("First", EntryType::Note, "", &["tag0", "tag1"]))
        .unwrap();
    index
        .put(&entry("Second", EntryType::Thing, "", &["tag1", "tag2"]))
        .unwrap();
    index
}

#[test]
fn empty_filter_matches_everything() {
    let index = tagged_index();
    let page = index
        .search(&EntryFilter::default(), Sort::default(), 1, 10)
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(slugs(&page.entries), vec!["first", "second"]);
}

#[test]
fn any_tags_match_either_entry() {
    let index = tagged_index();
    let filter = EntryFilter {
        any_tags: vec!["tag0".to_string(), "tag2".to_string()],
        ..EntryFilter::default()
    };
    let page = index.search(&filter, Sort::default(), 1, 10).unwrap();
    assert_eq!(slugs(&page.entries), vec!["first", "second"]);
}

#[test]
fn only_tags_require_every_tag() {
    let index = tagged_index();
    let neither = EntryFilter {
        only_tags: vec!["tag0".to_string(), "tag2".to_string()],
        ..EntryFilter::default()
    };
    assert_eq!(index.search(&neither, Sort::default(), 1, 10).unwrap().total, 0);

    let shared = EntryFilter {
        only_tags: vec!["TAG1 ".to_string()],
        ..EntryFilter::default()
    };
    assert_eq!(index.search(&shared, Sort::default(), 1, 10).unwrap().total, 2);
}

#[test]
fn type_filter_restricts_and_all_types_is_unrestricted() {
    let index = tagged_index();
    let things = EntryFilter {
        types: BTreeSet::from([EntryType::Thing]),
        ..EntryFilter::default()
    };
    let page = index.search(&things, Sort::default(), 1, 10).unwrap();
    assert_eq!(slugs(&page.entries), vec!["second"]);

    let every = EntryFilter {
        types: EntryType::ALL.into_iter().collect(),
        ..EntryFilter::default()
    };
    assert_eq!(index.search(&every, Sort::default(), 1, 10).unwrap().total, 2);
}

#[test]
fn keywords_rank_name_matches_first() {
    let index = EntryIndex::open_in_memory(IndexOptions::default()).unwrap();
    index
        .put(&entry("Apple Notes", EntryType::Note, "orchard", &[]))
        .unwrap();
    index
        .put(&entry("Banana", EntryType::Thing, "apple adjacent fruit", &[]))
        .unwrap();
    index
        .put(&entry("Cherry", EntryType::Thing, "unrelated", &[]))
        .unwrap();

    let filter = EntryFilter {
        keywords: "apple".to_string(),
        ..EntryFilter::default()
    };
    let page = index.search(&filter, Sort::relevance(), 1, 10).unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(slugs(&page.entries), vec!["apple-notes", "banana"]);
}

#[test]
fn keywords_match_term_prefixes_and_ignore_punctuation() {
    let index = EntryIndex::open_in_memory(IndexOptions::default()).unwrap();
    index
        .put(&entry("Lunar Landing", EntryType::Event, "Apollo program milestone", &[]))
        .unwrap();

    let prefix = EntryFilter {
        keywords: "apol mile".to_string(),
        ..EntryFilter::default()
    };
    assert_eq!(index.search(&prefix, Sort::relevance(), 1, 10).unwrap().total, 1);

    let syntax = EntryFilter {
        keywords: "\"(*".to_string(),
        ..EntryFilter::default()
    };
    assert_eq!(index.search(&syntax, Sort::relevance(), 1, 10).unwrap().total, 0);
}

#[test]
fn sort_by_name_descending_and_pages() {
    let index = EntryIndex::open_in_memory(IndexOptions::default()).unwrap();
    for name in ["Delta", "alpha", "Charlie", "bravo", "Echo"] {
        index.put(&entry(name, EntryType::Note, "", &[])).unwrap();
    }

    let ascending = index
        .search(&EntryFilter::default(), Sort::ascending(SortField::Name), 1, 2)
        .unwrap();
    assert_eq!(ascending.total, 5);
    assert_eq!(slugs(&ascending.entries), vec!["alpha", "bravo"]);

    let last = index
        .search(&EntryFilter::default(), Sort::ascending(SortField::Name), 3, 2)
        .unwrap();
    assert_eq!(slugs(&last.entries), vec!["echo"]);

    let descending = index
        .search(&EntryFilter::default(), Sort::descending(SortField::Name), 1, 3)
        .unwrap();
    assert_eq!(slugs(&descending.entries), vec!["echo", "delta", "charlie"]);

    let beyond = index
        .search(&EntryFilter::default(), Sort::default(), 9, 2)
        .unwrap();
    assert_eq!(beyond.total, 5);
    assert!(beyond.entries.is_empty());
}

#[test]
fn timeline_uses_inclusive_flexible_bounds() {
    let index = EntryIndex::open_in_memory(IndexOptions::default()).unwrap();
    for (name, start) in [
        ("Y2000", "2000"),
        ("Feb 2000", "2000-02"),
        ("Spring 2001", "2001-03-01"),
        ("Spring 2002", "2002-03-10"),
        ("Spring 2003", "2003-03-22"),
        ("New Year 2004", "2004-01-01"),
    ] {
        let mut event = entry(name, EntryType::Event, "", &[]);
        event.start = start.to_string();
        index.put(&event).unwrap();
    }
    index.put(&entry("Undated", EntryType::Event, "", &[])).unwrap();

    let window = index.timeline("2001", "2003-01-03").unwrap();
    assert_eq!(slugs(&window), vec!["spring-2001", "spring-2002"]);

    let open_start = index.timeline("", "2000-12").unwrap();
    assert_eq!(slugs(&open_start), vec!["y2000", "feb-2000"]);

    let everything = index.timeline("", "").unwrap();
    assert_eq!(everything.len(), 6);

    let degraded = index.timeline("not a date", "2000").unwrap();
    assert_eq!(slugs(&degraded), vec!["y2000"]);

    let degraded_end = index.timeline("2003", "2003-99").unwrap();
    assert_eq!(slugs(&degraded_end), vec!["spring-2003", "new-year-2004"]);
}
