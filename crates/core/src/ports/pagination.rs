//! Pagination types for search queries.
//!
//! One input shape ([`PaginationOptions`]) and one output shape
//! ([`PaginatedResult`]) serve both pagination modes:
//!
//! - **Cursor** mode walks forward from an opaque continuation token.
//! - **Offset** mode skips a fixed number of rows ("page N of M").
//!
//! Every ordering is total: the sort field is always followed by the
//! unique row id as a tie-break, so pages never duplicate or skip rows
//! that tie on the sort field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pagination mode requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaginationMode {
    /// Forward-only continuation tokens.
    Cursor,
    /// Row offset from the start of the ordering.
    Offset,
}

/// Ordering direction for sorted queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl OrderDirection {
    /// Parse `ASC` / `DESC`, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            _ => None,
        }
    }

    /// SQL keyword for this direction.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Raw pagination input, exactly as supplied by the caller.
///
/// Normalization (mode selection, defaults, validation) happens in
/// [`crate::services::PaginationEngine`].
#[derive(Debug, Clone, Default)]
pub struct PaginationOptions {
    /// Explicit mode. When absent, see [`PaginationOptions::resolved_mode`].
    pub mode: Option<PaginationMode>,
    /// Page size. Defaulted by the engine when absent.
    pub limit: Option<i64>,
    /// Continuation token (cursor mode only).
    pub cursor: Option<String>,
    /// Row offset (offset mode only).
    pub offset: Option<i64>,
    /// Sort field (offset mode only, must be in the query's allow-list).
    pub sort_field: Option<String>,
    /// Sort direction (offset mode only).
    pub sort_dir: Option<String>,
}

impl PaginationOptions {
    /// Cursor-mode options.
    pub fn cursor(limit: i64, cursor: Option<String>) -> Self {
        Self {
            mode: Some(PaginationMode::Cursor),
            limit: Some(limit),
            cursor,
            ..Default::default()
        }
    }

    /// Offset-mode options.
    pub fn offset(limit: i64, offset: i64) -> Self {
        Self {
            mode: Some(PaginationMode::Offset),
            limit: Some(limit),
            offset: Some(offset),
            ..Default::default()
        }
    }

    /// Set the requested sort.
    pub fn sorted_by(mut self, field: &str, dir: &str) -> Self {
        self.sort_field = Some(field.to_string());
        self.sort_dir = Some(dir.to_string());
        self
    }

    /// The mode that will be honored.
    ///
    /// An explicit mode always wins. Otherwise a non-empty cursor selects
    /// cursor mode, and everything else is offset mode.
    pub fn resolved_mode(&self) -> PaginationMode {
        match self.mode {
            Some(mode) => mode,
            None if self.cursor_token().is_some() => PaginationMode::Cursor,
            None => PaginationMode::Offset,
        }
    }

    /// The cursor, treating an empty string as "no cursor".
    pub fn cursor_token(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.trim().is_empty())
    }
}

// =============================================================================
// Ordering
// =============================================================================

/// Value of a row's sort field, as stored inside a cursor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum SortValue {
    Null,
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl From<i64> for SortValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for SortValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<&i64> for SortValue {
    fn from(v: &i64) -> Self {
        Self::Int(*v)
    }
}

impl From<&i32> for SortValue {
    fn from(v: &i32) -> Self {
        Self::Int(*v as i64)
    }
}

impl From<&str> for SortValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<&String> for SortValue {
    fn from(v: &String) -> Self {
        Self::Text(v.clone())
    }
}

impl From<DateTime<Utc>> for SortValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<&DateTime<Utc>> for SortValue {
    fn from(v: &DateTime<Utc>) -> Self {
        Self::Timestamp(*v)
    }
}

/// A position in an ordered result set.
///
/// `field` and `direction` identify the ordering the position belongs to;
/// `value` and `id` locate the row inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderingKey {
    #[serde(rename = "f")]
    pub field: String,
    #[serde(rename = "d")]
    pub direction: OrderDirection,
    #[serde(rename = "s")]
    pub value: SortValue,
    #[serde(rename = "i")]
    pub id: i64,
}

impl OrderingKey {
    /// Whether this position was taken from `ordering`.
    pub fn belongs_to(&self, ordering: &Ordering) -> bool {
        self.field == ordering.field && self.direction == ordering.direction
    }
}

/// Sort allow-list and default ordering of a searchable entity.
#[derive(Debug, Clone, Copy)]
pub struct SortSpec {
    /// Field names callers may sort by.
    pub allowed: &'static [&'static str],
    /// Field used when the caller supplies none (or an unknown one).
    pub default_field: &'static str,
    /// Direction used with the default field.
    pub default_direction: OrderDirection,
}

impl SortSpec {
    /// The default ordering.
    pub fn default_ordering(&self) -> Ordering {
        Ordering {
            field: self.default_field,
            direction: self.default_direction,
        }
    }

    /// Look up an allowed field by name.
    pub fn allowed_field(&self, name: &str) -> Option<&'static str> {
        self.allowed.iter().copied().find(|f| *f == name)
    }
}

/// A resolved ordering: `field direction, id direction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub field: &'static str,
    pub direction: OrderDirection,
}

/// Entities that can be returned by a paginated search.
pub trait Searchable: Send + Sync + 'static {
    /// Sort allow-list and default ordering.
    const SORT: SortSpec;

    /// Unique, stable row id used as the ordering tie-break.
    fn id(&self) -> i64;

    /// Value of `field` for this row. Unknown fields yield [`SortValue::Null`].
    fn sort_value(&self, field: &str) -> SortValue;

    /// This row's position within `ordering`.
    fn ordering_key(&self, ordering: &Ordering) -> OrderingKey {
        OrderingKey {
            field: ordering.field.to_string(),
            direction: ordering.direction,
            value: self.sort_value(ordering.field),
            id: self.id(),
        }
    }
}

/// Which slice of the ordering a [`crate::ports::PageFetcher`] must return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageBounds {
    /// Up to `limit` rows strictly after `position` (or from the start when `None`).
    After {
        position: Option<OrderingKey>,
        limit: i64,
    },
    /// Up to `limit` rows starting at row `offset`.
    Offset { offset: i64, limit: i64 },
}

// =============================================================================
// Result
// =============================================================================

/// One page of a search, in either mode.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedResult<T> {
    /// Rows of this page, in ordering order. Never longer than `limit`.
    pub items: Vec<T>,
    /// Count of all matching rows regardless of page.
    pub total_count: i64,
    /// Effective page size.
    pub limit: i64,
    /// Cursor mode only: token for the next page, present iff `has_next_page`.
    pub next_cursor: Option<String>,
    /// Offset mode only: the requested offset, present only when it is > 0.
    pub current_offset: Option<i64>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    /// The sort allow-list of the query.
    pub available_sort_fields: Vec<String>,
}

impl<T> PaginatedResult<T> {
    /// Convert the items, keeping the page metadata.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            limit: self.limit,
            next_cursor: self.next_cursor,
            current_offset: self.current_offset,
            has_next_page: self.has_next_page,
            has_previous_page: self.has_previous_page,
            available_sort_fields: self.available_sort_fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test critique: règle unique de sélection du mode
    #[test]
    fn test_mode_resolution_rule() {
        // Mode explicite prioritaire
        let opts = PaginationOptions {
            mode: Some(PaginationMode::Offset),
            cursor: Some("abc".into()),
            ..Default::default()
        };
        assert_eq!(opts.resolved_mode(), PaginationMode::Offset);

        // Curseur non vide sans mode => curseur
        let opts = PaginationOptions {
            cursor: Some("abc".into()),
            offset: Some(3),
            ..Default::default()
        };
        assert_eq!(opts.resolved_mode(), PaginationMode::Cursor);

        // Curseur vide ou absent => offset
        let opts = PaginationOptions {
            cursor: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(opts.resolved_mode(), PaginationMode::Offset);
        assert_eq!(
            PaginationOptions::default().resolved_mode(),
            PaginationMode::Offset
        );
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!(OrderDirection::parse("desc"), Some(OrderDirection::Desc));
        assert_eq!(OrderDirection::parse(" ASC "), Some(OrderDirection::Asc));
        assert_eq!(OrderDirection::parse("sideways"), None);
    }

    #[test]
    fn test_sort_spec_lookup() {
        const SPEC: SortSpec = SortSpec {
            allowed: &["name", "created"],
            default_field: "name",
            default_direction: OrderDirection::Asc,
        };
        assert_eq!(SPEC.allowed_field("created"), Some("created"));
        assert_eq!(SPEC.allowed_field("password"), None);
        assert_eq!(SPEC.default_ordering().field, "name");
    }
}
