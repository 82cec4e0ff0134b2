use lorebook_core::{
    Entry, EntryIndex, EntryStore, EntryType, IndexOptions, IndexState, MemoryEntryStore,
};
use std::collections::BTreeSet;

fn person(name: &str, description: &str) -> Entry {
    let mut entry = Entry::new(name, EntryType::Person);
    entry.description = description.to_string();
    entry
}

#[test]
fn put_then_lookup_returns_projection() {
    let index = EntryIndex::open_in_memory(IndexOptions::default()).unwrap();
    let mut entry = person("Ada Lovelace", "Worked with [Charles Babbage].");
    entry.set_tags(["Math", "history"]);
    entry.start = "1815-12-10".to_string();
    entry.custom.insert("born_in".to_string(), "London".to_string());

    index.put(&entry).unwrap();

    let loaded = index.lookup("ada-lovelace").unwrap().unwrap();
    assert_eq!(loaded.name, "Ada Lovelace");
    assert_eq!(loaded.kind, EntryType::Person);
    assert_eq!(loaded.links, vec!["charles-babbage".to_string()]);
    assert_eq!(
        loaded.tags,
        BTreeSet::from(["history".to_string(), "math".to_string()])
    );
    assert_eq!(loaded.start.unwrap().format(), "1815-12-10");
    assert_eq!(loaded.custom.get("born_in").map(String::as_str), Some("London"));
    assert!(index.exists("ada-lovelace"));
    assert!(!index.exists("charles-babbage"));
}

#[test]
fn put_replaces_previous_projection() {
    let index = EntryIndex::open_in_memory(IndexOptions::default()).unwrap();
    let mut entry = person("Ada", "[One] [Two]");
    entry.set_tags(["old"]);
    index.put(&entry).unwrap();

    entry.description = "[Three]".to_string();
    entry.set_tags(["new"]);
    index.put(&entry).unwrap();

    let loaded = index.lookup("ada").unwrap().unwrap();
    assert_eq!(loaded.links, vec!["three".to_string()]);
    assert_eq!(loaded.tags, BTreeSet::from(["new".to_string()]));
    assert_eq!(index.all_tags().unwrap(), vec!["new".to_string()]);
}

#[test]
fn put_preserves_backlinks() {
    let index = EntryIndex::open_in_memory(IndexOptions::default()).unwrap();
    index.put(&person("Target", "")).unwrap();
    assert!(index
        .set_backlinks("target", &BTreeSet::from(["source".to_string()]))
        .unwrap());

    let reindexed = index.put(&person("Target", "changed")).unwrap();
    assert_eq!(reindexed.linked_from, BTreeSet::from(["source".to_string()]));
    assert!(!index.set_backlinks("missing", &BTreeSet::new()).unwrap());
}

#[test]
fn delete_is_safe_when_absent() {
    let index = EntryIndex::open_in_memory(IndexOptions::default()).unwrap();
    index.put(&person("Ada", "")).unwrap();

    assert!(index.delete("ada").unwrap());
    assert!(!index.delete("ada").unwrap());
    assert!(index.lookup("ada").unwrap().is_none());
    assert!(index.all_ids().unwrap().is_empty());
}

#[test]
fn excerpt_is_truncated_by_options() {
    let options = IndexOptions {
        excerpt_chars: 12,
        ..IndexOptions::default()
    };
    let index = EntryIndex::open_in_memory(options).unwrap();
    index.put(&person("Ada", "alpha beta gamma delta")).unwrap();

    let loaded = index.lookup("ada").unwrap().unwrap();
    assert_eq!(loaded.excerpt, "alpha beta");
}

#[test]
fn rebuild_skips_unreadable_entries_and_reports_counts() {
    let store = MemoryEntryStore::with_entries([person("Ada", ""), person("Grace", "")]);
    store.insert_raw("ghost", person("Ghost", "")).unwrap();
    let mut index = EntryIndex::open_in_memory(IndexOptions::default()).unwrap();
    index.put(&person("Stale", "")).unwrap();

    let flaky = FlakyStore {
        inner: store,
        broken: "ghost",
    };
    let report = index.rebuild(&flaky).unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.indexed, 2);
    assert_eq!(report.skipped(), 1);
    assert_eq!(index.state(), IndexState::Ready);
    assert_eq!(
        index.all_ids().unwrap().into_iter().collect::<Vec<_>>(),
        vec!["ada".to_string(), "grace".to_string()]
    );
}

#[test]
fn open_builds_missing_index_then_reopens_without_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.sqlite3");
    let store = MemoryEntryStore::with_entries([person("Ada", "[Grace]"), person("Grace", "")]);

    let index = EntryIndex::open(&path, &store, IndexOptions::default()).unwrap();
    assert_eq!(index.state(), IndexState::Ready);
    assert_eq!(index.all_ids().unwrap().len(), 2);
    drop(index);

    store.write_entry(&person("Linus", "")).unwrap();
    let reopened = EntryIndex::open(&path, &store, IndexOptions::default()).unwrap();
    assert_eq!(reopened.all_ids().unwrap().len(), 2);
    assert!(!reopened.exists("linus"));
}

#[test]
fn open_discards_unreadable_index_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.sqlite3");
    std::fs::write(&path, vec![0x5a_u8; 4096]).unwrap();
    let store = MemoryEntryStore::with_entries([person("Ada", "")]);

    let index = EntryIndex::open(&path, &store, IndexOptions::default()).unwrap();
    assert_eq!(index.state(), IndexState::Ready);
    assert!(index.exists("ada"));
}

struct FlakyStore {
    inner: MemoryEntryStore,
    broken: &'static str,
}

impl EntryStore for FlakyStore {
    fn read_entry(&self, id: &str) -> lorebook_core::StoreResult<Entry> {
        if id == self.broken {
            return Err(lorebook_core::StoreError::Backend("unreadable file".to_string()));
        }
        self.inner.read_entry(id)
    }

    fn list_ids(&self) -> lorebook_core::StoreResult<BTreeSet<String>> {
        self.inner.list_ids()
    }

    fn write_entry(&self, entry: &Entry) -> lorebook_core::StoreResult<()> {
        self.inner.write_entry(entry)
    }

    fn delete_entry(&self, id: &str) -> lorebook_core::StoreResult<()> {
        self.inner.delete_entry(id)
    }

    fn rename_entry(&self, old_id: &str, renamed: &Entry) -> lorebook_core::StoreResult<()> {
        self.inner.rename_entry(old_id, renamed)
    }
}
