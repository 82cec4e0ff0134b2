//! Knowledge-base domain model.
//!
//! # Responsibility
//! - Define the entry record, its identifier rules and partial dates.
//!
//! # Invariants
//! - Every entry is identified by the slug of its display name.

pub mod entry;
pub mod flex_date;
pub mod slug;
