//! Conversions between native storage values and client-safe values.
//!
//! Nothing outside `crate::database` constructs or parses a [`Uuid`]; ids
//! travel through the rest of the crate as opaque strings and timestamps as
//! ISO-8601 strings.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use super::error::StoreError;

/// Format a document id for the outside world
pub fn id_to_string(id: Uuid) -> String {
    id.to_string()
}

/// Parse an id received from the outside. Anything unparseable simply does not
/// resolve to a document, so callers treat `None` as "not found".
pub fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id.trim()).ok()
}

/// Parse a list of embedded references. Unlike lookups, a malformed reference
/// on a write is an error: storing it would corrupt the document.
pub fn parse_references(ids: &[String]) -> Result<Vec<Uuid>, StoreError> {
    ids.iter()
        .map(|id| parse_id(id).ok_or_else(|| StoreError::InvalidReference(id.clone())))
        .collect()
}

pub fn references_to_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().copied().map(id_to_string).collect()
}

/// ISO-8601 with millisecond precision and a `Z` suffix
pub fn to_iso(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn to_iso_opt(timestamp: Option<DateTime<Utc>>) -> Option<String> {
    timestamp.map(to_iso)
}

/// New document ids are random v4 UUIDs
pub fn new_id() -> Uuid {
    Uuid::new_v4()
}
