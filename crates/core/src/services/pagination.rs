//! Pagination engine.
//!
//! Normalizes [`PaginationOptions`], resolves the ordering, drives a
//! [`PageFetcher`] for one page plus the total count, and assembles the
//! [`PaginatedResult`] metadata for either mode.

use tracing::{debug, instrument, warn};

use crate::error::{PaginationError, PaginationResult};
use crate::metrics::{self, FetchTimer};
use crate::ports::{
    OrderDirection, Ordering, OrderingKey, PageBounds, PageFetcher, PaginatedResult,
    PaginationMode, PaginationOptions, SearchFilter, Searchable,
};

use super::cursor::CursorCodec;

/// Default page size when none is supplied.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum page size; larger requests are clamped.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Largest configurable page size. Requests arrive as GraphQL `Int`.
const PAGE_SIZE_CEILING: i64 = i32::MAX as i64;

/// Page size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl PaginationConfig {
    /// Build a config, keeping both limits within `1..=i32::MAX` and the default within the max.
    pub fn new(default_limit: i64, max_limit: i64) -> Self {
        let max_limit = max_limit.clamp(1, PAGE_SIZE_CEILING);
        Self {
            default_limit: default_limit.clamp(1, max_limit),
            max_limit,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }
}

/// Serves paginated searches over any [`Searchable`] entity.
#[derive(Debug, Clone)]
pub struct PaginationEngine {
    codec: CursorCodec,
    config: PaginationConfig,
}

impl PaginationEngine {
    pub fn new(codec: CursorCodec, config: PaginationConfig) -> Self {
        Self { codec, config }
    }

    /// Return one page of `T` matching `filter`.
    ///
    /// # Errors
    /// - [`PaginationError::InvalidOptions`] for a non-positive limit or negative offset
    /// - [`PaginationError::InvalidCursor`] for a token that fails to decode or
    ///   belongs to another ordering
    /// - [`PaginationError::Storage`] when the fetcher fails
    #[instrument(skip_all, fields(entity = std::any::type_name::<T>(), mode))]
    pub async fn paginate<T: Searchable>(
        &self,
        fetcher: &dyn PageFetcher<T>,
        filter: &SearchFilter,
        options: &PaginationOptions,
    ) -> PaginationResult<PaginatedResult<T>> {
        let mode = options.resolved_mode();
        tracing::Span::current().record("mode", tracing::field::debug(mode));
        metrics::record_pagination_request(mode);

        let limit = self.resolve_limit(options.limit)?;
        if let Some(offset) = options.offset.filter(|o| *o < 0) {
            return Err(PaginationError::InvalidOptions(format!(
                "offset must not be negative, got {offset}"
            )));
        }

        match mode {
            PaginationMode::Cursor => self.cursor_page(fetcher, filter, options, limit).await,
            PaginationMode::Offset => self.offset_page(fetcher, filter, options, limit).await,
        }
    }

    async fn cursor_page<T: Searchable>(
        &self,
        fetcher: &dyn PageFetcher<T>,
        filter: &SearchFilter,
        options: &PaginationOptions,
        limit: i64,
    ) -> PaginationResult<PaginatedResult<T>> {
        // Cursor mode always walks the default ordering
        let ordering = T::SORT.default_ordering();
        let position = match options.cursor_token() {
            Some(token) => Some(self.decode_position(token, &ordering)?),
            None => None,
        };
        let has_previous_page = position.is_some();

        // One extra row tells whether a next page exists
        let bounds = PageBounds::After {
            position,
            limit: limit.saturating_add(1),
        };

        let (mut items, total_count) = {
            let _timer = FetchTimer::new();
            futures::try_join!(
                fetcher.fetch_page(filter, &ordering, &bounds),
                fetcher.count(filter)
            )?
        };

        let has_next_page = items.len() as i64 > limit;
        items.truncate(limit as usize);

        let next_cursor = match items.last() {
            Some(last) if has_next_page => Some(self.codec.encode(&last.ordering_key(&ordering))?),
            _ => None,
        };

        debug!(
            returned = items.len(),
            total_count, has_next_page, "Cursor page served"
        );

        Ok(PaginatedResult {
            items,
            total_count,
            limit,
            next_cursor,
            current_offset: None,
            has_next_page,
            has_previous_page,
            available_sort_fields: available_sort_fields::<T>(),
        })
    }

    async fn offset_page<T: Searchable>(
        &self,
        fetcher: &dyn PageFetcher<T>,
        filter: &SearchFilter,
        options: &PaginationOptions,
        limit: i64,
    ) -> PaginationResult<PaginatedResult<T>> {
        let offset = options.offset.unwrap_or(0);
        let ordering = resolve_ordering::<T>(options);
        let bounds = PageBounds::Offset { offset, limit };

        let (items, total_count) = {
            let _timer = FetchTimer::new();
            futures::try_join!(
                fetcher.fetch_page(filter, &ordering, &bounds),
                fetcher.count(filter)
            )?
        };

        let has_next_page = offset.saturating_add(items.len() as i64) < total_count;

        debug!(
            returned = items.len(),
            total_count,
            offset,
            sort_field = ordering.field,
            "Offset page served"
        );

        Ok(PaginatedResult {
            items,
            total_count,
            limit,
            next_cursor: None,
            current_offset: (offset > 0).then_some(offset),
            has_next_page,
            has_previous_page: offset > 0,
            available_sort_fields: available_sort_fields::<T>(),
        })
    }

    fn resolve_limit(&self, limit: Option<i64>) -> PaginationResult<i64> {
        match limit {
            None => Ok(self.config.default_limit),
            Some(l) if l <= 0 => Err(PaginationError::InvalidOptions(format!(
                "limit must be positive, got {l}"
            ))),
            Some(l) if l > self.config.max_limit => {
                debug!(
                    requested = l,
                    max = self.config.max_limit,
                    "Page size clamped"
                );
                Ok(self.config.max_limit)
            }
            Some(l) => Ok(l),
        }
    }

    fn decode_position(&self, token: &str, ordering: &Ordering) -> PaginationResult<OrderingKey> {
        let key = self.codec.decode(token).map_err(|e| {
            metrics::record_invalid_cursor();
            warn!(error = %e, "Rejected cursor token");
            PaginationError::from(e)
        })?;

        if !key.belongs_to(ordering) {
            metrics::record_invalid_cursor();
            warn!(
                cursor_field = %key.field,
                expected_field = ordering.field,
                "Cursor issued for a different ordering"
            );
            return Err(PaginationError::InvalidCursor(format!(
                "cursor belongs to ordering {} {}, expected {} {}",
                key.field,
                key.direction.as_sql(),
                ordering.field,
                ordering.direction.as_sql()
            )));
        }

        Ok(key)
    }
}

/// Ordering for offset mode.
///
/// An allowed `sort_field` wins; an unknown one falls back to the default
/// ordering. A missing or unparsable `sort_dir` means ascending for a
/// caller-chosen field and the default direction otherwise.
fn resolve_ordering<T: Searchable>(options: &PaginationOptions) -> Ordering {
    let direction = options.sort_dir.as_deref().and_then(OrderDirection::parse);
    let requested = options
        .sort_field
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty());

    match requested {
        Some(name) => match T::SORT.allowed_field(name) {
            Some(field) => Ordering {
                field,
                direction: direction.unwrap_or_default(),
            },
            None => {
                debug!(sort_field = name, "Unknown sort field, using default ordering");
                T::SORT.default_ordering()
            }
        },
        None => Ordering {
            field: T::SORT.default_field,
            direction: direction.unwrap_or(T::SORT.default_direction),
        },
    }
}

fn available_sort_fields<T: Searchable>() -> Vec<String> {
    T::SORT.allowed.iter().map(|f| f.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::ports::memory::MemoryPageFetcher;
    use crate::ports::{SortSpec, SortValue};
    use async_trait::async_trait;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: i64,
        name: String,
        rank: i64,
    }

    impl Searchable for Item {
        const SORT: SortSpec = SortSpec {
            allowed: &["name", "rank"],
            default_field: "name",
            default_direction: OrderDirection::Asc,
        };

        fn id(&self) -> i64 {
            self.id
        }

        fn sort_value(&self, field: &str) -> SortValue {
            match field {
                "name" => SortValue::from(&self.name),
                "rank" => SortValue::Int(self.rank),
                _ => SortValue::Null,
            }
        }
    }

    fn item(id: i64, name: &str, rank: i64) -> Item {
        Item {
            id,
            name: name.to_string(),
            rank,
        }
    }

    fn abc() -> MemoryPageFetcher<Item> {
        MemoryPageFetcher::new(vec![item(3, "C", 1), item(1, "A", 3), item(2, "B", 2)])
    }

    fn engine() -> PaginationEngine {
        PaginationEngine::new(CursorCodec::new("test-secret"), PaginationConfig::default())
    }

    fn names(page: &PaginatedResult<Item>) -> Vec<&str> {
        page.items.iter().map(|i| i.name.as_str()).collect()
    }

    async fn search(
        fetcher: &MemoryPageFetcher<Item>,
        options: PaginationOptions,
    ) -> PaginationResult<PaginatedResult<Item>> {
        engine()
            .paginate(fetcher, &SearchFilter::default(), &options)
            .await
    }

    // Test critique: premier page en mode curseur
    #[tokio::test]
    async fn test_cursor_first_page() {
        let fetcher = abc();
        let page = search(&fetcher, PaginationOptions::cursor(2, None))
            .await
            .unwrap();

        assert_eq!(names(&page), vec!["A", "B"]);
        assert_eq!(page.total_count, 3);
        assert_eq!(page.limit, 2);
        assert!(page.has_next_page);
        assert!(!page.has_previous_page);
        assert!(page.next_cursor.is_some());
        assert_eq!(page.current_offset, None);
        assert_eq!(page.available_sort_fields, vec!["name", "rank"]);
    }

    // Test critique: continuation depuis le curseur
    #[tokio::test]
    async fn test_cursor_continuation() {
        let fetcher = abc();
        let first = search(&fetcher, PaginationOptions::cursor(2, None))
            .await
            .unwrap();
        let second = search(&fetcher, PaginationOptions::cursor(2, first.next_cursor))
            .await
            .unwrap();

        assert_eq!(names(&second), vec!["C"]);
        assert!(!second.has_next_page);
        assert!(second.has_previous_page);
        assert_eq!(second.next_cursor, None);
        assert_eq!(second.total_count, 3);
    }

    #[tokio::test]
    async fn test_offset_page_with_requested_sort() {
        let fetcher = abc();
        let page = search(
            &fetcher,
            PaginationOptions::offset(1, 1).sorted_by("name", "DESC"),
        )
        .await
        .unwrap();

        assert_eq!(names(&page), vec!["B"]);
        assert_eq!(page.current_offset, Some(1));
        assert!(page.has_next_page);
        assert!(page.has_previous_page);
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn test_offset_zero_reports_no_offset() {
        let fetcher = abc();
        let page = search(&fetcher, PaginationOptions::offset(2, 0))
            .await
            .unwrap();

        assert_eq!(names(&page), vec!["A", "B"]);
        assert_eq!(page.current_offset, None);
        assert!(!page.has_previous_page);
        assert!(page.has_next_page);
    }

    #[tokio::test]
    async fn test_invalid_limit_is_rejected_before_fetch() {
        let fetcher = abc();
        let err = search(&fetcher, PaginationOptions::cursor(0, None))
            .await
            .unwrap_err();

        assert!(matches!(err, PaginationError::InvalidOptions(_)));
        assert_eq!(fetcher.fetch_calls(), 0);
        assert_eq!(fetcher.count_calls(), 0);
    }

    #[tokio::test]
    async fn test_negative_offset_is_rejected() {
        let fetcher = abc();
        let err = search(&fetcher, PaginationOptions::offset(2, -1))
            .await
            .unwrap_err();
        assert!(matches!(err, PaginationError::InvalidOptions(_)));
        assert_eq!(fetcher.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_limit_defaults_and_clamps() {
        let fetcher = abc();

        let page = search(&fetcher, PaginationOptions::default()).await.unwrap();
        assert_eq!(page.limit, DEFAULT_PAGE_SIZE);

        let page = search(&fetcher, PaginationOptions::offset(5_000, 0))
            .await
            .unwrap();
        assert_eq!(page.limit, MAX_PAGE_SIZE);
    }

    #[tokio::test]
    async fn test_garbage_cursor_is_rejected() {
        let fetcher = abc();
        let err = search(
            &fetcher,
            PaginationOptions::cursor(2, Some("not-a-token".into())),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PaginationError::InvalidCursor(_)));
        assert_eq!(fetcher.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_cursor_from_other_ordering_is_rejected() {
        let fetcher = abc();
        let foreign = CursorCodec::new("test-secret")
            .encode(&OrderingKey {
                field: "rank".into(),
                direction: OrderDirection::Asc,
                value: SortValue::Int(1),
                id: 3,
            })
            .unwrap();

        let err = search(&fetcher, PaginationOptions::cursor(2, Some(foreign)))
            .await
            .unwrap_err();
        assert!(matches!(err, PaginationError::InvalidCursor(_)));
    }

    #[tokio::test]
    async fn test_empty_cursor_means_first_page() {
        let fetcher = abc();
        let page = search(&fetcher, PaginationOptions::cursor(2, Some(String::new())))
            .await
            .unwrap();
        assert_eq!(names(&page), vec!["A", "B"]);
        assert!(!page.has_previous_page);
    }

    #[tokio::test]
    async fn test_empty_result_set() {
        let fetcher = MemoryPageFetcher::<Item>::new(vec![]);

        let page = search(&fetcher, PaginationOptions::cursor(5, None))
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 0);
        assert!(!page.has_next_page);
        assert_eq!(page.next_cursor, None);

        let page = search(&fetcher, PaginationOptions::offset(5, 10))
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_next_page);
        assert!(page.has_previous_page);
    }

    #[tokio::test]
    async fn test_unknown_sort_field_falls_back_to_default() {
        let fetcher = abc();
        let page = search(
            &fetcher,
            PaginationOptions::offset(3, 0).sorted_by("password", "DESC"),
        )
        .await
        .unwrap();
        assert_eq!(names(&page), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_sort_is_ignored_in_cursor_mode() {
        let fetcher = abc();
        let page = search(
            &fetcher,
            PaginationOptions::cursor(3, None).sorted_by("rank", "ASC"),
        )
        .await
        .unwrap();
        assert_eq!(names(&page), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_search_term_narrows_items_and_count() {
        let fetcher = MemoryPageFetcher::new(vec![
            item(1, "Data plan", 1),
            item(2, "Budget", 2),
            item(3, "DATA policy", 3),
        ]);
        let page = engine()
            .paginate(
                &fetcher,
                &SearchFilter::term("data"),
                &PaginationOptions::offset(10, 0),
            )
            .await
            .unwrap();

        assert_eq!(page.total_count, 2);
        assert_eq!(names(&page), vec!["DATA policy", "Data plan"]);
    }

    // Test critique: les égalités sur le champ de tri sont départagées par l'id
    #[tokio::test]
    async fn test_ties_are_paged_without_duplicates() {
        let fetcher = MemoryPageFetcher::new(
            (1..=7).map(|id| item(id, "same", 0)).collect::<Vec<_>>(),
        );

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = search(&fetcher, PaginationOptions::cursor(2, cursor))
                .await
                .unwrap();
            seen.extend(page.items.iter().map(|i| i.id));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn test_cursor_survives_deletion_of_seen_rows() {
        let fetcher = MemoryPageFetcher::new(vec![
            item(1, "A", 0),
            item(2, "B", 0),
            item(3, "C", 0),
            item(4, "D", 0),
        ]);
        let first = search(&fetcher, PaginationOptions::cursor(2, None))
            .await
            .unwrap();

        fetcher.remove(1);

        let second = search(&fetcher, PaginationOptions::cursor(2, first.next_cursor))
            .await
            .unwrap();
        assert_eq!(names(&second), vec!["C", "D"]);
        assert_eq!(second.total_count, 3);
    }

    struct FailingFetcher;

    #[async_trait]
    impl PageFetcher<Item> for FailingFetcher {
        async fn fetch_page(
            &self,
            _: &SearchFilter,
            _: &Ordering,
            _: &PageBounds,
        ) -> crate::error::StorageResult<Vec<Item>> {
            Err(StorageError::ConnectionError("down".into()))
        }

        async fn count(&self, _: &SearchFilter) -> crate::error::StorageResult<i64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let err = engine()
            .paginate(
                &FailingFetcher,
                &SearchFilter::default(),
                &PaginationOptions::cursor(2, None),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaginationError::Storage(StorageError::ConnectionError(_))
        ));
    }

    #[test]
    fn test_config_keeps_default_within_max() {
        let config = PaginationConfig::new(500, 50);
        assert_eq!(config.default_limit, 50);
        let config = PaginationConfig::new(0, 0);
        assert_eq!(config.max_limit, 1);
        assert_eq!(config.default_limit, 1);
        let config = PaginationConfig::new(20, i64::MAX);
        assert_eq!(config.max_limit, i32::MAX as i64);
    }

    // Test critique: une limite immense ne doit jamais faire paniquer le mode curseur
    #[tokio::test]
    async fn test_huge_limit_does_not_overflow() {
        let fetcher = abc();
        let unbounded = PaginationEngine::new(
            CursorCodec::new("test-secret"),
            PaginationConfig {
                default_limit: 20,
                max_limit: i64::MAX,
            },
        );

        let page = unbounded
            .paginate(
                &fetcher,
                &SearchFilter::default(),
                &PaginationOptions::cursor(i64::MAX, None),
            )
            .await
            .unwrap();
        assert_eq!(names(&page), vec!["A", "B", "C"]);
        assert!(!page.has_next_page);
        assert_eq!(page.next_cursor, None);

        let page = unbounded
            .paginate(
                &fetcher,
                &SearchFilter::default(),
                &PaginationOptions::offset(i64::MAX, i64::MAX),
            )
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_next_page);
    }

    // Test critique: parcours curseur sur un ordre par défaut DESC avec des ex aequo
    #[tokio::test]
    async fn test_cursor_walk_over_descending_default() {
        use crate::models::Project;
        use chrono::{TimeZone, Utc};

        let projects: Vec<Project> = (1..=7)
            .map(|id| Project {
                id,
                title: format!("Project {id}"),
                abstract_text: None,
                is_test_project: false,
                created_by_id: 1,
                created: Utc
                    .with_ymd_and_hms(2024, 1, if id % 2 == 0 { 2 } else { 1 }, 0, 0, 0)
                    .unwrap(),
                modified: Utc::now(),
            })
            .collect();
        let fetcher = MemoryPageFetcher::new(projects);

        let mut seen = Vec::new();
        let mut cursor = None;
        let mut pages = 0;
        loop {
            let page = engine()
                .paginate(
                    &fetcher,
                    &SearchFilter::default(),
                    &PaginationOptions::cursor(2, cursor),
                )
                .await
                .unwrap();
            pages += 1;
            assert_eq!(page.has_previous_page, pages > 1);
            assert_eq!(page.total_count, 7);
            seen.extend(page.items.iter().map(|p| p.id));
            if !page.has_next_page {
                assert_eq!(page.next_cursor, None);
                break;
            }
            cursor = page.next_cursor;
        }

        assert_eq!(pages, 4);
        assert_eq!(seen, vec![6, 4, 2, 7, 5, 3, 1]);
    }

    fn rows_strategy() -> impl Strategy<Value = Vec<Item>> {
        prop::collection::vec(("[a-c]{0,2}", 0i64..5), 0..25).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (name, rank))| item(i as i64 + 1, &name, rank))
                .collect()
        })
    }

    proptest! {
        // Parcourir tous les curseurs visite chaque ligne exactement une fois
        #[test]
        fn prop_cursor_walk_visits_every_row_once(rows in rows_strategy(), limit in 1i64..6) {
            let total = rows.len();
            let fetcher = MemoryPageFetcher::new(rows);
            let engine = engine();

            let mut seen = Vec::new();
            let mut cursor = None;
            futures::executor::block_on(async {
                loop {
                    let page = engine
                        .paginate(&fetcher, &SearchFilter::default(), &PaginationOptions::cursor(limit, cursor.take()))
                        .await
                        .unwrap();
                    assert!(page.items.len() as i64 <= limit);
                    assert_eq!(page.has_next_page, page.next_cursor.is_some());
                    seen.extend(page.items.iter().map(|i| i.id));
                    match page.next_cursor {
                        Some(next) => cursor = Some(next),
                        None => break,
                    }
                }
            });

            let mut unique = seen.clone();
            unique.sort_unstable();
            unique.dedup();
            prop_assert_eq!(unique.len(), seen.len());
            prop_assert_eq!(seen.len(), total);
        }

        // hasNextPage en mode offset == offset + |items| < totalCount
        #[test]
        fn prop_offset_page_laws(rows in rows_strategy(), limit in 1i64..6, offset in 0i64..30) {
            let fetcher = MemoryPageFetcher::new(rows);
            let page = futures::executor::block_on(
                engine().paginate(&fetcher, &SearchFilter::default(), &PaginationOptions::offset(limit, offset).sorted_by("rank", "DESC")),
            )
            .unwrap();

            prop_assert!(page.items.len() as i64 <= limit);
            prop_assert_eq!(page.has_next_page, offset + (page.items.len() as i64) < page.total_count);
            prop_assert_eq!(page.has_previous_page, offset > 0);
            prop_assert_eq!(page.current_offset.is_some(), offset > 0);
        }
    }
}
