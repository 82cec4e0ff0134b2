//! SQLite-backed entry index engine.
//!
//! # Responsibility
//! - Own the index connection and its Absent → Building → Ready lifecycle.
//! - Upsert, delete, look up and query indexed entries.
//! - Rebuild the whole index from the authoritative entry store.
//!
//! # Invariants
//! - A `put` is visible to every lookup/query issued after it returns.
//! - `put` never touches backward links; only the reverse-link pass does.
//! - Rebuild discards the schema first; corruption is never repaired in place.
//! - Unreadable entries are skipped during rebuild and counted, not fatal.

use super::projection::{to_indexed, IndexedEntry};
use super::query::{build_query, compile, timeline_query, Clause, EntryFilter, Sort, SortField};
use super::{IndexError, IndexOptions, IndexResult};
use crate::db::{open_db, open_db_in_memory, reset_schema, DbError};
use crate::model::entry::{Entry, EntryType};
use crate::model::flex_date::{range_end, range_start, DatePrecision, FlexDate};
use crate::store::EntryStore;
use chrono::NaiveDate;
use log::{error, info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Instant;

const ENTRY_SELECT_SQL: &str = "SELECT
    entries.slug AS slug,
    entries.name AS name,
    entries.type AS type,
    entries.excerpt AS excerpt,
    entries.start_day AS start_day,
    entries.start_precision AS start_precision,
    entries.end_day AS end_day,
    entries.end_precision AS end_precision,
    entries.address AS address,
    entries.latitude AS latitude,
    entries.longitude AS longitude,
    entries.custom AS custom,
    entries.created_at AS created_at,
    entries.modified_at AS modified_at";

/// Lifecycle of the persistent index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// No usable index on disk yet.
    Absent,
    /// Rebuild in progress or interrupted.
    Building,
    Ready,
}

/// Outcome of a full rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildReport {
    pub indexed: usize,
    pub total: usize,
}

impl RebuildReport {
    /// Number of stored entries that could not be indexed.
    pub fn skipped(&self) -> usize {
        self.total.saturating_sub(self.indexed)
    }
}

/// One page of search results plus the total match count.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub entries: Vec<IndexedEntry>,
    pub total: u64,
}

/// Service object owning the index connection.
pub struct EntryIndex {
    conn: Connection,
    options: IndexOptions,
    state: IndexState,
}

impl EntryIndex {
    /// Opens the index at `path`, building it from `store` when missing.
    ///
    /// An existing file that SQLite cannot open is discarded and rebuilt.
    ///
    /// # Errors
    /// - Returns [`IndexError::Db`] when the index cannot be created or its
    ///   schema is newer than this binary supports.
    /// - Returns [`IndexError::Store`] when the store cannot list entries.
    pub fn open<S: EntryStore>(
        path: impl AsRef<Path>,
        store: &S,
        options: IndexOptions,
    ) -> IndexResult<Self> {
        let path = path.as_ref();
        let existed = path.exists();

        let conn = match open_db(path) {
            Ok(conn) => conn,
            Err(DbError::Sqlite(err)) if existed => {
                warn!(
                    "event=index_open module=index status=discarded path={} error={}",
                    path.display(),
                    err
                );
                std::fs::remove_file(path).map_err(|io_err| {
                    IndexError::InvalidData(format!(
                        "cannot discard unreadable index `{}`: {io_err}",
                        path.display()
                    ))
                })?;
                return Self::create_at(path, store, options);
            }
            Err(err) => return Err(err.into()),
        };

        if !existed {
            let mut index = Self::from_connection(conn, options, IndexState::Absent);
            index.rebuild(store)?;
            return Ok(index);
        }

        info!(
            "event=index_open module=index status=ok path={}",
            path.display()
        );
        Ok(Self::from_connection(conn, options, IndexState::Ready))
    }

    /// Opens an empty, ready in-memory index.
    pub fn open_in_memory(options: IndexOptions) -> IndexResult<Self> {
        let conn = open_db_in_memory()?;
        Ok(Self::from_connection(conn, options, IndexState::Ready))
    }

    fn create_at<S: EntryStore>(path: &Path, store: &S, options: IndexOptions) -> IndexResult<Self> {
        let conn = open_db(path)?;
        let mut index = Self::from_connection(conn, options, IndexState::Absent);
        index.rebuild(store)?;
        Ok(index)
    }

    fn from_connection(conn: Connection, options: IndexOptions, state: IndexState) -> Self {
        Self {
            conn,
            options,
            state,
        }
    }

    pub fn state(&self) -> IndexState {
        self.state
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Projects `entry` and upserts it under its slug.
    ///
    /// Existing backward links of the slug are preserved.
    pub fn put(&self, entry: &Entry) -> IndexResult<IndexedEntry> {
        let mut indexed = to_indexed(entry, self.options.excerpt_chars);
        let tx = self.conn.unchecked_transaction()?;
        write_indexed(&tx, &indexed, false)?;
        indexed.linked_from = load_backlinks(&tx, &indexed.slug)?;
        tx.commit()?;
        Ok(indexed)
    }

    /// Upserts a fully-formed indexed entry, including its backward links.
    pub fn put_indexed(&self, indexed: &IndexedEntry) -> IndexResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        write_indexed(&tx, indexed, true)?;
        tx.commit()?;
        Ok(())
    }

    /// Replaces the backward-link set of `slug`.
    ///
    /// Returns `false` when `slug` is not indexed.
    pub fn set_backlinks(&self, slug: &str, sources: &BTreeSet<String>) -> IndexResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        if !slug_exists(&tx, slug)? {
            return Ok(false);
        }
        replace_backlinks(&tx, slug, sources)?;
        tx.commit()?;
        Ok(true)
    }

    /// Removes `slug` from the index. Returns whether anything was removed.
    pub fn delete(&self, slug: &str) -> IndexResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM entries WHERE slug = ?1;", [slug])?;
        tx.execute("DELETE FROM entries_fts WHERE slug = ?1;", [slug])?;
        tx.execute("DELETE FROM entry_backlinks WHERE source_slug = ?1;", [slug])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Discards the index and re-indexes every entry in `store`.
    ///
    /// # Errors
    /// - Fails when the schema cannot be recreated, the store cannot list
    ///   ids, or an index write fails. Individual unreadable entries are
    ///   skipped and reported through [`RebuildReport`].
    pub fn rebuild<S: EntryStore>(&mut self, store: &S) -> IndexResult<RebuildReport> {
        let started_at = Instant::now();
        self.state = IndexState::Building;
        info!("event=index_rebuild module=index status=start");

        if let Err(err) = reset_schema(&mut self.conn) {
            error!(
                "event=index_rebuild module=index status=error error_code=index_reset_failed error={}",
                err
            );
            return Err(err.into());
        }

        let ids = store.list_ids()?;
        let total = ids.len();
        let mut indexed = 0;

        let tx = self.conn.transaction()?;
        for id in &ids {
            match store.read_entry(id) {
                Ok(entry) => {
                    let projected = to_indexed(&entry, self.options.excerpt_chars);
                    write_indexed(&tx, &projected, false)?;
                    indexed += 1;
                }
                Err(err) => {
                    warn!(
                        "event=index_rebuild_entry module=index status=skipped id={} error={}",
                        id, err
                    );
                }
            }
        }
        tx.commit()?;

        self.state = IndexState::Ready;
        let report = RebuildReport { indexed, total };
        if report.skipped() > 0 {
            warn!(
                "event=index_rebuild module=index status=partial indexed={} total={} skipped={} duration_ms={}",
                report.indexed,
                report.total,
                report.skipped(),
                started_at.elapsed().as_millis()
            );
        } else {
            info!(
                "event=index_rebuild module=index status=ok indexed={} total={} duration_ms={}",
                report.indexed,
                report.total,
                started_at.elapsed().as_millis()
            );
        }
        Ok(report)
    }

    /// Fetches one indexed entry.
    pub fn lookup(&self, slug: &str) -> IndexResult<Option<IndexedEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} FROM entries WHERE slug = ?1;"))?;
        let mut rows = stmt.query([slug])?;
        if let Some(row) = rows.next()? {
            let mut indexed = parse_entry_row(row)?;
            load_relations(&self.conn, &mut indexed)?;
            return Ok(Some(indexed));
        }
        Ok(None)
    }

    pub fn contains(&self, slug: &str) -> IndexResult<bool> {
        slug_exists(&self.conn, slug)
    }

    /// Existence predicate for link rendering.
    ///
    /// Index failures are logged and treated as "missing".
    pub fn exists(&self, slug: &str) -> bool {
        self.contains(slug).unwrap_or_else(|err| {
            warn!("event=index_exists module=index status=error slug={slug} error={err}");
            false
        })
    }

    /// Runs `clause` and returns one page plus the total match count.
    ///
    /// `page_no` is 1-based; `0` is treated as the first page.
    pub fn query(
        &self,
        clause: &Clause,
        sort: Sort,
        page_no: u32,
        page_size: u32,
    ) -> IndexResult<SearchPage> {
        let page_size = self.options.normalize_page_size(Some(page_size));
        let offset = i64::from(page_no.max(1) - 1).saturating_mul(i64::from(page_size));
        let total = self.count(clause)?;
        let entries = self.fetch(clause, sort, Some((i64::from(page_size), offset)))?;
        Ok(SearchPage { entries, total })
    }

    /// Builds a query from `filter` and runs it.
    pub fn search(
        &self,
        filter: &EntryFilter,
        sort: Sort,
        page_no: u32,
        page_size: u32,
    ) -> IndexResult<SearchPage> {
        let clause = build_query(filter, self.options.name_boost);
        self.query(&clause, sort, page_no, page_size)
    }

    /// Returns entries whose start lies in `[start, end]`, ordered by start.
    ///
    /// Blank bounds are open-ended; malformed bounds are logged and treated
    /// as open-ended.
    pub fn timeline(&self, start: &str, end: &str) -> IndexResult<Vec<IndexedEntry>> {
        let from = range_start(start).unwrap_or_else(|err| {
            warn!("event=timeline_bound module=index status=degraded bound=start error={err}");
            NaiveDate::MIN
        });
        let to = range_end(end).unwrap_or_else(|err| {
            warn!("event=timeline_bound module=index status=degraded bound=end error={err}");
            NaiveDate::MAX
        });
        self.fetch(
            &timeline_query(from, to),
            Sort::ascending(SortField::Start),
            None,
        )
    }

    /// Counts entries matching `clause`.
    pub fn count(&self, clause: &Clause) -> IndexResult<u64> {
        let compiled = compile(clause);
        let sql = format!("SELECT COUNT(*) FROM entries WHERE {};", compiled.where_sql);
        let total: i64 = self
            .conn
            .query_row(&sql, params_from_iter(compiled.where_binds), |row| row.get(0))
            .map_err(|err| map_query_error(err, clause))?;
        u64::try_from(total)
            .map_err(|_| IndexError::InvalidData(format!("negative match count {total}")))
    }

    /// Every indexed slug in ascending order.
    pub fn all_ids(&self) -> IndexResult<BTreeSet<String>> {
        let mut stmt = self.conn.prepare("SELECT slug FROM entries ORDER BY slug;")?;
        let mut rows = stmt.query([])?;
        let mut ids = BTreeSet::new();
        while let Some(row) = rows.next()? {
            ids.insert(row.get::<_, String>(0)?);
        }
        Ok(ids)
    }

    /// Every distinct tag in ascending order.
    pub fn all_tags(&self) -> IndexResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT tag FROM entry_tags ORDER BY tag;")?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(row.get(0)?);
        }
        Ok(tags)
    }

    fn fetch(
        &self,
        clause: &Clause,
        sort: Sort,
        page: Option<(i64, i64)>,
    ) -> IndexResult<Vec<IndexedEntry>> {
        let compiled = compile(clause);
        let mut sql = format!(
            "{ENTRY_SELECT_SQL}, ({}) AS score FROM entries WHERE {} ORDER BY {}",
            compiled.score_sql,
            compiled.where_sql,
            sort.order_sql()
        );
        let mut bind_values: Vec<Value> = compiled.score_binds;
        bind_values.extend(compiled.where_binds);
        if let Some((limit, offset)) = page {
            sql.push_str(" LIMIT ? OFFSET ?");
            bind_values.push(Value::Integer(limit));
            bind_values.push(Value::Integer(offset));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt
            .query(params_from_iter(bind_values))
            .map_err(|err| map_query_error(err, clause))?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().map_err(|err| map_query_error(err, clause))? {
            entries.push(parse_entry_row(row)?);
        }
        drop(rows);

        for indexed in &mut entries {
            load_relations(&self.conn, indexed)?;
        }
        Ok(entries)
    }
}

fn write_indexed(
    conn: &Connection,
    indexed: &IndexedEntry,
    replace_backlinks_too: bool,
) -> IndexResult<()> {
    let slug = indexed.slug.as_str();
    let custom = serde_json::to_string(&indexed.custom)?;

    conn.execute(
        "INSERT INTO entries (
            slug,
            name,
            type,
            excerpt,
            start_day,
            start_precision,
            end_day,
            end_precision,
            address,
            latitude,
            longitude,
            custom,
            created_at,
            modified_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        ON CONFLICT (slug) DO UPDATE SET
            name = excluded.name,
            type = excluded.type,
            excerpt = excluded.excerpt,
            start_day = excluded.start_day,
            start_precision = excluded.start_precision,
            end_day = excluded.end_day,
            end_precision = excluded.end_precision,
            address = excluded.address,
            latitude = excluded.latitude,
            longitude = excluded.longitude,
            custom = excluded.custom,
            created_at = excluded.created_at,
            modified_at = excluded.modified_at;",
        params![
            slug,
            indexed.name.as_str(),
            indexed.kind.as_str(),
            indexed.excerpt.as_str(),
            indexed.start.as_ref().map(FlexDate::day_number),
            indexed.start.map(|date| date.precision.as_str()),
            indexed.end.as_ref().map(FlexDate::day_number),
            indexed.end.map(|date| date.precision.as_str()),
            indexed.address.as_str(),
            indexed.latitude,
            indexed.longitude,
            custom,
            indexed.created,
            indexed.modified,
        ],
    )?;

    conn.execute("DELETE FROM entry_tags WHERE slug = ?1;", [slug])?;
    for tag in &indexed.tags {
        conn.execute(
            "INSERT OR IGNORE INTO entry_tags (slug, tag) VALUES (?1, ?2);",
            params![slug, tag.as_str()],
        )?;
    }

    conn.execute("DELETE FROM entry_links WHERE source_slug = ?1;", [slug])?;
    for (position, target) in (0_i64..).zip(indexed.links.iter()) {
        conn.execute(
            "INSERT OR IGNORE INTO entry_links (source_slug, target_slug, position)
             VALUES (?1, ?2, ?3);",
            params![slug, target.as_str(), position],
        )?;
    }

    conn.execute("DELETE FROM entries_fts WHERE slug = ?1;", [slug])?;
    conn.execute(
        "INSERT INTO entries_fts (slug, name, body) VALUES (?1, ?2, ?3);",
        params![slug, indexed.name.as_str(), indexed.search_body()],
    )?;

    if replace_backlinks_too {
        replace_backlinks(conn, slug, &indexed.linked_from)?;
    }

    Ok(())
}

fn replace_backlinks(conn: &Connection, slug: &str, sources: &BTreeSet<String>) -> IndexResult<()> {
    conn.execute("DELETE FROM entry_backlinks WHERE target_slug = ?1;", [slug])?;
    for source in sources {
        conn.execute(
            "INSERT INTO entry_backlinks (target_slug, source_slug) VALUES (?1, ?2);",
            params![slug, source.as_str()],
        )?;
    }
    Ok(())
}

fn slug_exists(conn: &Connection, slug: &str) -> IndexResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM entries WHERE slug = ?1);",
        [slug],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_entry_row(row: &Row<'_>) -> IndexResult<IndexedEntry> {
    let slug: String = row.get("slug")?;

    let type_text: String = row.get("type")?;
    let kind = EntryType::from_db(&type_text).ok_or_else(|| {
        IndexError::InvalidData(format!("invalid entry type `{type_text}` for `{slug}`"))
    })?;

    let start = parse_date_columns(row, "start_day", "start_precision", &slug)?;
    let end = parse_date_columns(row, "end_day", "end_precision", &slug)?;

    let custom_text: String = row.get("custom")?;
    let custom: BTreeMap<String, String> = serde_json::from_str(&custom_text)?;

    Ok(IndexedEntry {
        name: row.get("name")?,
        kind,
        excerpt: row.get("excerpt")?,
        tags: BTreeSet::new(),
        links: Vec::new(),
        linked_from: BTreeSet::new(),
        start,
        end,
        address: row.get("address")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        custom,
        created: row.get("created_at")?,
        modified: row.get("modified_at")?,
        slug,
    })
}

fn parse_date_columns(
    row: &Row<'_>,
    day_column: &str,
    precision_column: &str,
    slug: &str,
) -> IndexResult<Option<FlexDate>> {
    let day: Option<i32> = row.get(day_column)?;
    let precision: Option<String> = row.get(precision_column)?;
    match (day, precision) {
        (None, None) => Ok(None),
        (Some(day), Some(precision_text)) => {
            let precision = DatePrecision::from_db(&precision_text).ok_or_else(|| {
                IndexError::InvalidData(format!(
                    "invalid date precision `{precision_text}` in {precision_column} for `{slug}`"
                ))
            })?;
            FlexDate::from_day_number(day, precision).map(Some).ok_or_else(|| {
                IndexError::InvalidData(format!("invalid day {day} in {day_column} for `{slug}`"))
            })
        }
        _ => Err(IndexError::InvalidData(format!(
            "{day_column} and {precision_column} must both be set or both be null for `{slug}`"
        ))),
    }
}

fn load_relations(conn: &Connection, indexed: &mut IndexedEntry) -> IndexResult<()> {
    indexed.tags = load_strings(
        conn,
        "SELECT tag FROM entry_tags WHERE slug = ?1 ORDER BY tag;",
        &indexed.slug,
    )?
    .into_iter()
    .collect();
    indexed.links = load_strings(
        conn,
        "SELECT target_slug FROM entry_links WHERE source_slug = ?1 ORDER BY position;",
        &indexed.slug,
    )?;
    indexed.linked_from = load_backlinks(conn, &indexed.slug)?;
    Ok(())
}

fn load_backlinks(conn: &Connection, slug: &str) -> IndexResult<BTreeSet<String>> {
    Ok(load_strings(
        conn,
        "SELECT source_slug FROM entry_backlinks WHERE target_slug = ?1 ORDER BY source_slug;",
        slug,
    )?
    .into_iter()
    .collect())
}

fn load_strings(conn: &Connection, sql: &str, slug: &str) -> IndexResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([slug])?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        values.push(row.get(0)?);
    }
    Ok(values)
}

fn map_query_error(err: rusqlite::Error, clause: &Clause) -> IndexError {
    if is_match_syntax_error(&err) {
        return IndexError::InvalidQuery {
            query: format!("{clause:?}"),
            message: err.to_string(),
        };
    }

    IndexError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}
