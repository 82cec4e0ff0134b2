//! Boolean query composition for entry search.
//!
//! # Responsibility
//! - Build a clause tree from type, tag, keyword and date-range criteria.
//! - Compile clause trees into parameterized SQL over the index schema.
//!
//! # Invariants
//! - An empty filter compiles to "match everything", never "match nothing".
//! - Selecting every type (or none) adds no type restriction.
//! - User text only ever reaches SQL through bind parameters.

use crate::model::entry::{normalize_tag, EntryType};
use chrono::{Datelike, NaiveDate};
use rusqlite::types::Value;
use std::collections::BTreeSet;

/// Node of a boolean search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    MatchAll,
    TypeIs(EntryType),
    /// Normalized tag equality.
    HasTag(String),
    /// Case-insensitive substring match on the display name.
    NameContains { text: String, boost: u32 },
    /// Full-text match across name and searchable body.
    FullText(String),
    /// Start date falls within the inclusive range.
    StartBetween { from: NaiveDate, to: NaiveDate },
    /// At least one child must match.
    Any(Vec<Clause>),
    /// Every child must match.
    All(Vec<Clause>),
}

/// Search criteria accepted from the CLI layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub types: BTreeSet<EntryType>,
    /// Entry must carry at least one of these tags.
    pub any_tags: Vec<String>,
    /// Entry must carry every one of these tags.
    pub only_tags: Vec<String>,
    pub keywords: String,
}

/// Field used to order search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Relevance,
    #[default]
    Name,
    Start,
    Created,
    Modified,
}

/// Ordering for search results; ties always break by slug ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sort {
    pub field: SortField,
    pub descending: bool,
}

impl Sort {
    pub fn ascending(field: SortField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn descending(field: SortField) -> Self {
        Self {
            field,
            descending: true,
        }
    }

    /// Best matches first.
    pub fn relevance() -> Self {
        Self::descending(SortField::Relevance)
    }

    pub(crate) fn order_sql(self) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        let primary = match self.field {
            SortField::Relevance => format!("score {direction}"),
            SortField::Name => format!("entries.name COLLATE NOCASE {direction}"),
            SortField::Start => {
                format!("entries.start_day IS NULL, entries.start_day {direction}")
            }
            SortField::Created => format!("entries.created_at {direction}"),
            SortField::Modified => format!("entries.modified_at {direction}"),
        };
        format!("{primary}, entries.slug ASC")
    }
}

/// Builds the top-level conjunction for `filter`.
///
/// `name_boost` weights name matches over body-only matches when sorting by
/// relevance.
pub fn build_query(filter: &EntryFilter, name_boost: u32) -> Clause {
    let mut clauses = Vec::with_capacity(4);

    if !filter.types.is_empty() && filter.types.len() < EntryType::ALL.len() {
        clauses.push(Clause::Any(
            filter.types.iter().copied().map(Clause::TypeIs).collect(),
        ));
    }

    let any_tags = tag_clauses(&filter.any_tags);
    if !any_tags.is_empty() {
        clauses.push(Clause::Any(any_tags));
    }

    let only_tags = tag_clauses(&filter.only_tags);
    if !only_tags.is_empty() {
        clauses.push(Clause::All(only_tags));
    }

    let keywords = filter.keywords.trim();
    if !keywords.is_empty() {
        clauses.push(Clause::Any(vec![
            Clause::NameContains {
                text: keywords.to_string(),
                boost: name_boost,
            },
            Clause::FullText(keywords.to_string()),
        ]));
    }

    if clauses.is_empty() {
        Clause::MatchAll
    } else {
        Clause::All(clauses)
    }
}

/// Builds the clause selecting entries whose start lies in `[from, to]`.
pub fn timeline_query(from: NaiveDate, to: NaiveDate) -> Clause {
    Clause::StartBetween { from, to }
}

fn tag_clauses(tags: &[String]) -> Vec<Clause> {
    let unique: BTreeSet<String> = tags.iter().filter_map(|tag| normalize_tag(tag)).collect();
    unique.into_iter().map(Clause::HasTag).collect()
}

/// SQL fragments for one clause tree.
#[derive(Debug, Default)]
pub(crate) struct CompiledQuery {
    pub where_sql: String,
    pub where_binds: Vec<Value>,
    pub score_sql: String,
    pub score_binds: Vec<Value>,
}

pub(crate) fn compile(clause: &Clause) -> CompiledQuery {
    let mut compiled = CompiledQuery::default();
    compiled.where_sql = compile_where(clause, &mut compiled.where_binds);

    let mut score_terms = Vec::new();
    collect_score_terms(clause, &mut score_terms, &mut compiled.score_binds);
    compiled.score_sql = if score_terms.is_empty() {
        "0".to_string()
    } else {
        score_terms.join(" + ")
    };
    compiled
}

fn compile_where(clause: &Clause, binds: &mut Vec<Value>) -> String {
    match clause {
        Clause::MatchAll => "1 = 1".to_string(),
        Clause::TypeIs(kind) => {
            binds.push(Value::Text(kind.as_str().to_string()));
            "entries.type = ?".to_string()
        }
        Clause::HasTag(tag) => {
            binds.push(Value::Text(tag.clone()));
            "EXISTS (
                SELECT 1 FROM entry_tags
                WHERE entry_tags.slug = entries.slug AND entry_tags.tag = ?
            )"
            .to_string()
        }
        Clause::NameContains { text, .. } => {
            binds.push(Value::Text(like_pattern(text)));
            r"entries.name LIKE ? ESCAPE '\'".to_string()
        }
        Clause::FullText(text) => match fts_expression(text) {
            Some(expression) => {
                binds.push(Value::Text(expression));
                "entries.slug IN (SELECT slug FROM entries_fts WHERE entries_fts MATCH ?)"
                    .to_string()
            }
            None => "0 = 1".to_string(),
        },
        Clause::StartBetween { from, to } => {
            binds.push(Value::Integer(i64::from(from.num_days_from_ce())));
            binds.push(Value::Integer(i64::from(to.num_days_from_ce())));
            "entries.start_day BETWEEN ? AND ?".to_string()
        }
        Clause::Any(children) => join_children(children, " OR ", "0 = 1", binds),
        Clause::All(children) => join_children(children, " AND ", "1 = 1", binds),
    }
}

fn join_children(
    children: &[Clause],
    separator: &str,
    empty: &str,
    binds: &mut Vec<Value>,
) -> String {
    if children.is_empty() {
        return empty.to_string();
    }
    let parts = children
        .iter()
        .map(|child| format!("({})", compile_where(child, binds)))
        .collect::<Vec<_>>();
    parts.join(separator)
}

fn collect_score_terms(clause: &Clause, terms: &mut Vec<String>, binds: &mut Vec<Value>) {
    match clause {
        Clause::NameContains { text, boost } => {
            binds.push(Value::Text(like_pattern(text)));
            terms.push(format!(
                r"(CASE WHEN entries.name LIKE ? ESCAPE '\' THEN {boost} ELSE 0 END)"
            ));
        }
        Clause::FullText(text) => {
            if let Some(expression) = fts_expression(text) {
                binds.push(Value::Text(expression));
                terms.push(
                    "(CASE WHEN entries.slug IN (SELECT slug FROM entries_fts WHERE entries_fts MATCH ?) THEN 1 ELSE 0 END)"
                        .to_string(),
                );
            }
        }
        Clause::Any(children) | Clause::All(children) => {
            for child in children {
                collect_score_terms(child, terms, binds);
            }
        }
        Clause::MatchAll
        | Clause::TypeIs(_)
        | Clause::HasTag(_)
        | Clause::StartBetween { .. } => {}
    }
}

/// Builds an FTS5 expression requiring every term as a prefix.
///
/// Returns `None` when `text` has no searchable terms.
fn fts_expression(text: &str) -> Option<String> {
    let terms = text
        .split_whitespace()
        .filter(|term| term.chars().any(char::is_alphanumeric))
        .map(|term| format!("\"{}\"*", term.replace('"', "\"\"")))
        .collect::<Vec<_>>();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" AND "))
    }
}

fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::{build_query, compile, fts_expression, like_pattern, Clause, EntryFilter};
    use crate::model::entry::EntryType;

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(build_query(&EntryFilter::default(), 5), Clause::MatchAll);
        assert_eq!(compile(&Clause::MatchAll).where_sql, "1 = 1");
    }

    #[test]
    fn all_types_selected_means_no_type_clause() {
        let filter = EntryFilter {
            types: EntryType::ALL.into_iter().collect(),
            ..EntryFilter::default()
        };
        assert_eq!(build_query(&filter, 5), Clause::MatchAll);
    }

    #[test]
    fn clauses_compose_in_fixed_order() {
        let filter = EntryFilter {
            types: [EntryType::Person, EntryType::Place].into_iter().collect(),
            any_tags: vec!["Tag0".to_string(), "tag1".to_string()],
            only_tags: vec!["tag2".to_string(), " ".to_string()],
            keywords: " ada ".to_string(),
        };
        let clause = build_query(&filter, 7);
        assert_eq!(
            clause,
            Clause::All(vec![
                Clause::Any(vec![
                    Clause::TypeIs(EntryType::Person),
                    Clause::TypeIs(EntryType::Place),
                ]),
                Clause::Any(vec![
                    Clause::HasTag("tag0".to_string()),
                    Clause::HasTag("tag1".to_string()),
                ]),
                Clause::All(vec![Clause::HasTag("tag2".to_string())]),
                Clause::Any(vec![
                    Clause::NameContains {
                        text: "ada".to_string(),
                        boost: 7,
                    },
                    Clause::FullText("ada".to_string()),
                ]),
            ])
        );
    }

    #[test]
    fn compiled_binds_follow_placeholders() {
        let filter = EntryFilter {
            any_tags: vec!["a".to_string(), "b".to_string()],
            keywords: "x".to_string(),
            ..EntryFilter::default()
        };
        let compiled = compile(&build_query(&filter, 5));
        assert_eq!(
            compiled.where_sql.matches('?').count(),
            compiled.where_binds.len()
        );
        assert_eq!(
            compiled.score_sql.matches('?').count(),
            compiled.score_binds.len()
        );
        assert_eq!(compiled.score_binds.len(), 2);
    }

    #[test]
    fn fts_terms_are_quoted_prefixes() {
        assert_eq!(fts_expression("ada \"love"), Some("\"ada\"* AND \"\"\"love\"*".to_string()));
        assert_eq!(fts_expression("   "), None);
        assert_eq!(fts_expression("- ::"), None);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(like_pattern("50%_x"), r"%50\%\_x%");
    }
}
