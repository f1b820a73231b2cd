//! Generic paginated search over one table.
//!
//! Each searchable entity describes its table once in a [`TableSpec`];
//! [`PgSearchRepository`] turns a [`SearchFilter`], an [`Ordering`] and
//! [`PageBounds`] into a data query and a count query sharing the same
//! `WHERE` clause.

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{instrument, trace};

use dmplan_core::error::{StorageError, StorageResult};
use dmplan_core::ports::{
    OrderDirection, Ordering, PageBounds, PageFetcher, SearchFilter, Searchable, SortValue,
};

use super::helpers::{contains_pattern, query_error};

// =============================================================================
// Table Description
// =============================================================================

/// How one searchable entity maps onto SQL.
///
/// SAFETY: every string here is a compile-time constant spliced into SQL.
/// Caller input only ever reaches queries through bound parameters, and
/// sort fields are resolved through `sort_columns` before use.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    /// `FROM` clause, with alias (e.g. `templates t`).
    pub from: &'static str,
    /// Select list matching the row struct.
    pub select: &'static str,
    /// Unique id column, the ordering tie-break.
    pub id_column: &'static str,
    /// Columns matched case-insensitively against the search term.
    pub term_columns: &'static [&'static str],
    /// Column compared against `SearchFilter::owner_uris`.
    pub owner_column: Option<&'static str>,
    /// Column compared against `SearchFilter::best_practice`.
    pub best_practice_column: Option<&'static str>,
    /// Column compared against `SearchFilter::affiliation_uri`.
    pub affiliation_column: Option<&'static str>,
    /// Column compared against `SearchFilter::created_by`.
    pub creator_column: Option<&'static str>,
    /// Column compared against `SearchFilter::parent_id`.
    pub parent_column: Option<&'static str>,
    /// Predicate always applied (e.g. only active rows).
    pub fixed_predicate: Option<&'static str>,
    /// API sort field → SQL expression.
    pub sort_columns: &'static [(&'static str, &'static str)],
}

impl TableSpec {
    /// SQL expression for an API sort field.
    pub fn sort_column(&self, field: &str) -> StorageResult<&'static str> {
        self.sort_columns
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, column)| *column)
            .ok_or_else(|| {
                StorageError::QueryError(format!("{} cannot be sorted by {}", self.from, field))
            })
    }
}

/// A row struct decoded from a [`TableSpec`] select list.
pub trait SearchRow: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin + 'static {
    type Entity: Searchable;

    const TABLE: TableSpec;

    fn into_entity(self) -> StorageResult<Self::Entity>;
}

// =============================================================================
// Query Building
// =============================================================================

fn push_filters(qb: &mut QueryBuilder<'static, Postgres>, spec: &TableSpec, filter: &SearchFilter) {
    qb.push(" WHERE TRUE");

    if let Some(predicate) = spec.fixed_predicate {
        qb.push(" AND ").push(predicate);
    }

    if let Some(term) = filter.normalized_term() {
        if !spec.term_columns.is_empty() {
            let pattern = contains_pattern(term);
            qb.push(" AND (");
            for (i, column) in spec.term_columns.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
            }
            qb.push(")");
        }
    }

    if let Some(column) = spec.owner_column {
        if !filter.owner_uris.is_empty() {
            qb.push(" AND ")
                .push(column)
                .push(" = ANY(")
                .push_bind(filter.owner_uris.clone())
                .push(")");
        }
    }

    if let (Some(column), Some(best_practice)) = (spec.best_practice_column, filter.best_practice) {
        qb.push(" AND ").push(column).push(" = ").push_bind(best_practice);
    }

    if let (Some(column), Some(uri)) = (spec.affiliation_column, filter.affiliation_uri.as_ref()) {
        qb.push(" AND ").push(column).push(" = ").push_bind(uri.clone());
    }

    if let (Some(column), Some(user_id)) = (spec.creator_column, filter.created_by) {
        qb.push(" AND ").push(column).push(" = ").push_bind(user_id);
    }

    if let (Some(column), Some(parent_id)) = (spec.parent_column, filter.parent_id) {
        qb.push(" AND ").push(column).push(" = ").push_bind(parent_id);
    }
}

fn push_sort_value(qb: &mut QueryBuilder<'static, Postgres>, value: &SortValue) -> StorageResult<()> {
    match value {
        SortValue::Int(v) => {
            qb.push_bind(*v);
        }
        SortValue::Text(v) => {
            qb.push_bind(v.clone());
        }
        SortValue::Timestamp(v) => {
            qb.push_bind(*v);
        }
        SortValue::Null => {
            return Err(StorageError::SerializationError(
                "cursor position has no sort value".to_string(),
            ));
        }
    }
    Ok(())
}

/// Build the data query for one page.
pub(crate) fn page_query(
    spec: &TableSpec,
    filter: &SearchFilter,
    ordering: &Ordering,
    bounds: &PageBounds,
) -> StorageResult<QueryBuilder<'static, Postgres>> {
    let sort_column = spec.sort_column(ordering.field)?;
    let direction = ordering.direction.as_sql();

    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(spec.select).push(" FROM ").push(spec.from);
    push_filters(&mut qb, spec, filter);

    if let PageBounds::After {
        position: Some(key),
        ..
    } = bounds
    {
        // Row-value comparison keeps (field, id) ties in one total order
        let comparison = match ordering.direction {
            OrderDirection::Asc => ") > (",
            OrderDirection::Desc => ") < (",
        };
        qb.push(" AND (")
            .push(sort_column)
            .push(", ")
            .push(spec.id_column)
            .push(comparison);
        push_sort_value(&mut qb, &key.value)?;
        qb.push(", ").push_bind(key.id).push(")");
    }

    qb.push(" ORDER BY ")
        .push(sort_column)
        .push(" ")
        .push(direction)
        .push(", ")
        .push(spec.id_column)
        .push(" ")
        .push(direction);

    match bounds {
        PageBounds::After { limit, .. } => {
            qb.push(" LIMIT ").push_bind(*limit);
        }
        PageBounds::Offset { offset, limit } => {
            qb.push(" LIMIT ")
                .push_bind(*limit)
                .push(" OFFSET ")
                .push_bind(*offset);
        }
    }

    Ok(qb)
}

/// Build the count query for a filter.
pub(crate) fn count_query(spec: &TableSpec, filter: &SearchFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
    qb.push(spec.from);
    push_filters(&mut qb, spec, filter);
    qb
}

/// Assert that `R`'s table can sort by every field its entity allows.
#[cfg(test)]
pub(crate) fn assert_sort_columns_cover<R: SearchRow>() {
    let sort = <R::Entity as Searchable>::SORT;
    for field in sort.allowed {
        assert!(
            R::TABLE.sort_column(field).is_ok(),
            "{} has no column for sort field {}",
            R::TABLE.from,
            field
        );
    }
    assert_eq!(R::TABLE.sort_columns.len(), sort.allowed.len());
}

// =============================================================================
// Repository Implementation
// =============================================================================

/// PostgreSQL [`PageFetcher`] for the entity behind row type `R`.
pub struct PgSearchRepository<R> {
    pool: PgPool,
    _row: PhantomData<fn() -> R>,
}

impl<R> PgSearchRepository<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _row: PhantomData,
        }
    }
}

#[async_trait]
impl<R: SearchRow> PageFetcher<R::Entity> for PgSearchRepository<R> {
    #[instrument(skip_all, fields(table = R::TABLE.from, sort = ordering.field))]
    async fn fetch_page(
        &self,
        filter: &SearchFilter,
        ordering: &Ordering,
        bounds: &PageBounds,
    ) -> StorageResult<Vec<R::Entity>> {
        let mut qb = page_query(&R::TABLE, filter, ordering, bounds)?;
        trace!(sql = qb.sql(), "Fetching page");

        let rows: Vec<R> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;

        rows.into_iter().map(R::into_entity).collect()
    }

    #[instrument(skip_all, fields(table = R::TABLE.from))]
    async fn count(&self, filter: &SearchFilter) -> StorageResult<i64> {
        let mut qb = count_query(&R::TABLE, filter);

        qb.build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmplan_core::ports::OrderingKey;

    const SPEC: TableSpec = TableSpec {
        from: "templates t",
        select: "t.id, t.name",
        id_column: "t.id",
        term_columns: &["t.name", "t.description"],
        owner_column: Some("t.owner_id"),
        best_practice_column: Some("t.best_practice"),
        affiliation_column: None,
        creator_column: None,
        parent_column: None,
        fixed_predicate: Some("t.archived = FALSE"),
        sort_columns: &[("name", "t.name"), ("created", "t.created")],
    };

    fn ordering(field: &'static str, direction: OrderDirection) -> Ordering {
        Ordering { field, direction }
    }

    #[test]
    fn test_first_cursor_page_has_no_position_predicate() {
        let qb = page_query(
            &SPEC,
            &SearchFilter::default(),
            &ordering("name", OrderDirection::Asc),
            &PageBounds::After {
                position: None,
                limit: 3,
            },
        )
        .unwrap();

        assert_eq!(
            qb.sql(),
            "SELECT t.id, t.name FROM templates t WHERE TRUE AND t.archived = FALSE \
             ORDER BY t.name ASC, t.id ASC LIMIT $1"
        );
    }

    // Test critique: le curseur devient une comparaison de tuple (champ, id)
    #[test]
    fn test_cursor_position_uses_row_value_comparison() {
        let key = OrderingKey {
            field: "created".into(),
            direction: OrderDirection::Desc,
            value: SortValue::Text("x".into()),
            id: 4,
        };
        let qb = page_query(
            &SPEC,
            &SearchFilter::default(),
            &ordering("created", OrderDirection::Desc),
            &PageBounds::After {
                position: Some(key),
                limit: 3,
            },
        )
        .unwrap();

        let sql = qb.sql();
        assert!(sql.contains("AND (t.created, t.id) < ($1, $2)"));
        assert!(sql.ends_with("ORDER BY t.created DESC, t.id DESC LIMIT $3"));
    }

    #[test]
    fn test_filters_are_bound_not_inlined() {
        let filter = SearchFilter {
            term: Some("'; DROP TABLE templates; --".into()),
            owner_uris: vec!["https://ror.org/1".into()],
            best_practice: Some(true),
            ..Default::default()
        };
        let qb = page_query(
            &SPEC,
            &filter,
            &ordering("name", OrderDirection::Asc),
            &PageBounds::Offset {
                offset: 20,
                limit: 10,
            },
        )
        .unwrap();

        let sql = qb.sql();
        assert!(!sql.contains("DROP"));
        assert!(sql.contains("(t.name ILIKE $1 OR t.description ILIKE $2)"));
        assert!(sql.contains("t.owner_id = ANY($3)"));
        assert!(sql.contains("t.best_practice = $4"));
        assert!(sql.ends_with("LIMIT $5 OFFSET $6"));
    }

    #[test]
    fn test_count_shares_where_clause() {
        let filter = SearchFilter::term("plan");
        let count = count_query(&SPEC, &filter);
        let page = page_query(
            &SPEC,
            &filter,
            &ordering("name", OrderDirection::Asc),
            &PageBounds::Offset {
                offset: 0,
                limit: 10,
            },
        )
        .unwrap();

        let where_of = |sql: &str| {
            let start = sql.find(" WHERE ").unwrap();
            let end = sql.find(" ORDER BY ").unwrap_or(sql.len());
            sql[start..end].to_string()
        };
        assert_eq!(where_of(count.sql()), where_of(page.sql()));
        assert!(count.sql().starts_with("SELECT COUNT(*) FROM templates t"));
    }

    #[test]
    fn test_unknown_sort_field_is_an_error() {
        let err = page_query(
            &SPEC,
            &SearchFilter::default(),
            &ordering("password", OrderDirection::Asc),
            &PageBounds::Offset {
                offset: 0,
                limit: 1,
            },
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_blank_term_adds_no_predicate() {
        let qb = count_query(&SPEC, &SearchFilter::term("   "));
        assert!(!qb.sql().contains("ILIKE"));
    }
}
