//! Entry domain model.
//!
//! # Responsibility
//! - Define the canonical knowledge-base record (people, places, things,
//!   events and notes).
//! - Enforce display-name rules before an entry reaches storage or the index.
//!
//! # Invariants
//! - The slug is always derived from `name`; it is never stored separately.
//! - Tags are lowercase, trimmed and unique.
//! - `start`/`end` hold flexible date strings (`YYYY`, `YYYY-MM`, `YYYY-MM-DD`
//!   or empty).

use crate::model::slug::slugify;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Upper bound for display names, in characters.
pub const MAX_NAME_CHARS: usize = 100;

/// Entry category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Note,
    Event,
    Person,
    Place,
    Thing,
}

impl EntryType {
    pub const ALL: [EntryType; 5] = [
        EntryType::Note,
        EntryType::Event,
        EntryType::Person,
        EntryType::Place,
        EntryType::Thing,
    ];

    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Event => "event",
            Self::Person => "person",
            Self::Place => "place",
            Self::Thing => "thing",
        }
    }

    /// Parses a storage name produced by [`EntryType::as_str`].
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "note" => Some(Self::Note),
            "event" => Some(Self::Event),
            "person" => Some(Self::Person),
            "place" => Some(Self::Place),
            "thing" => Some(Self::Thing),
            _ => None,
        }
    }
}

impl Display for EntryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons an entry name is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValidationError {
    EmptyName,
    NameTooLong { chars: usize, max: usize },
    LeadingOrTrailingSpace,
    DoubleSpace,
    Bracket(char),
    ControlCharacter,
    /// Name contains no alphanumeric characters, so no slug can be derived.
    EmptySlug,
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "entry name cannot be empty"),
            Self::NameTooLong { chars, max } => {
                write!(f, "entry name has {chars} characters; maximum is {max}")
            }
            Self::LeadingOrTrailingSpace => {
                write!(f, "entry name cannot start or end with whitespace")
            }
            Self::DoubleSpace => write!(f, "entry name cannot contain consecutive spaces"),
            Self::Bracket(ch) => write!(f, "entry name cannot contain `{ch}`"),
            Self::ControlCharacter => write!(f, "entry name cannot contain control characters"),
            Self::EmptySlug => write!(f, "entry name must contain a letter or digit"),
        }
    }
}

impl Error for EntryValidationError {}

/// One knowledge-base record as held by persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique display name; the slug is derived from it.
    pub name: String,
    /// Free text; may embed `[Other Entry]` link markup.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Serialized as `type` to match entry file frontmatter.
    #[serde(rename = "type")]
    pub kind: EntryType,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Type-specific extension fields.
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
    /// Unix epoch milliseconds.
    pub created: i64,
    /// Unix epoch milliseconds.
    pub modified: i64,
}

impl Entry {
    /// Creates an entry with empty optional fields and current timestamps.
    pub fn new(name: impl Into<String>, kind: EntryType) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            name: name.into(),
            description: String::new(),
            tags: BTreeSet::new(),
            kind,
            start: String::new(),
            end: String::new(),
            address: String::new(),
            latitude: None,
            longitude: None,
            custom: BTreeMap::new(),
            created: now,
            modified: now,
        }
    }

    /// Canonical identifier derived from `name`.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// Replaces the tag set with normalized values.
    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
    }

    /// Checks display-name rules.
    ///
    /// # Errors
    /// - Returns the first violated rule.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        validate_name(&self.name)
    }
}

/// Checks display-name rules shared by create and rename paths.
///
/// # Errors
/// - Returns the first violated rule.
pub fn validate_name(name: &str) -> Result<(), EntryValidationError> {
    if name.is_empty() {
        return Err(EntryValidationError::EmptyName);
    }

    let chars = name.chars().count();
    if chars > MAX_NAME_CHARS {
        return Err(EntryValidationError::NameTooLong {
            chars,
            max: MAX_NAME_CHARS,
        });
    }

    if name.starts_with(char::is_whitespace) || name.ends_with(char::is_whitespace) {
        return Err(EntryValidationError::LeadingOrTrailingSpace);
    }

    if name.contains("  ") {
        return Err(EntryValidationError::DoubleSpace);
    }

    if let Some(bracket) = name.chars().find(|ch| matches!(ch, '[' | ']')) {
        return Err(EntryValidationError::Bracket(bracket));
    }

    if name.chars().any(char::is_control) {
        return Err(EntryValidationError::ControlCharacter);
    }

    if slugify(name).is_empty() {
        return Err(EntryValidationError::EmptySlug);
    }

    Ok(())
}

/// Normalizes one tag value; blank tags yield `None`.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates tag values.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .filter_map(|tag| normalize_tag(tag.as_ref()))
        .collect()
}
