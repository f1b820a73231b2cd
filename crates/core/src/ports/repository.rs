//! Port traits for data repositories.
//!
//! These traits define the storage interface used by the domain layer.
//! Implementations live in the infrastructure layer (e.g., `dmplan-storage`)
//! or, for tests, in [`super::memory`].

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::{
    Affiliation, AssociationKind, License, MetadataStandard, Project, ProjectContributor,
    ProjectOutput, Repository, ResearchDomain, Section, Template, User, VersionedTemplate,
};

use super::pagination::{Ordering, PageBounds};

// =============================================================================
// Filter Types
// =============================================================================

/// Filter options shared by all search queries.
///
/// Each store applies the fields meaningful for its entity and ignores
/// the rest (e.g. `best_practice` only narrows template searches).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Case-insensitive substring matched against the entity's text columns.
    pub term: Option<String>,
    /// Restrict to rows owned by one of these affiliation URIs.
    pub owner_uris: Vec<String>,
    /// Restrict to best-practice (or non best-practice) templates.
    pub best_practice: Option<bool>,
    /// Restrict to rows belonging to this affiliation URI.
    pub affiliation_uri: Option<String>,
    /// Restrict to rows created by this user.
    pub created_by: Option<i64>,
    /// Restrict to children of this parent (e.g. sections of a template).
    pub parent_id: Option<i64>,
}

impl SearchFilter {
    /// Filter on a search term only.
    pub fn term(term: impl Into<String>) -> Self {
        Self {
            term: Some(term.into()),
            ..Default::default()
        }
    }

    /// The trimmed search term, if non-empty.
    pub fn normalized_term(&self) -> Option<&str> {
        self.term.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

// =============================================================================
// Repository Traits
// =============================================================================

/// Bounded reads over one entity's ordered result set.
///
/// Implementations must order by `ordering.field` then by id, both in
/// `ordering.direction`, and must apply `filter` identically in
/// [`PageFetcher::fetch_page`] and [`PageFetcher::count`].
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    /// Fetch the rows selected by `bounds`.
    async fn fetch_page(
        &self,
        filter: &SearchFilter,
        ordering: &Ordering,
        bounds: &PageBounds,
    ) -> StorageResult<Vec<T>>;

    /// Count every row matching `filter`.
    async fn count(&self, filter: &SearchFilter) -> StorageResult<i64>;
}

/// Join-table access for one many-to-many relationship.
///
/// `Ok(false)` means the store declined the change (e.g. the related row
/// does not exist); both `Ok(false)` and `Err(_)` count as per-id failures.
#[async_trait]
pub trait AssociationStore: Send + Sync {
    /// Which relationship this store manages.
    fn kind(&self) -> AssociationKind;

    /// Link `id` to `parent_id`.
    async fn add_to(&self, parent_id: i64, id: i64) -> StorageResult<bool>;

    /// Unlink `id` from `parent_id`.
    async fn remove_from(&self, parent_id: i64, id: i64) -> StorageResult<bool>;

    /// Human-readable labels for `ids`, for warning messages.
    ///
    /// Ids without a label are omitted.
    async fn labels(&self, ids: &[i64]) -> StorageResult<Vec<(i64, String)>>;
}

/// Repository for project contributors.
#[async_trait]
pub trait ProjectContributorRepository: Send + Sync {
    /// Get a contributor with its current role ids.
    async fn get_project_contributor(&self, id: i64) -> StorageResult<Option<ProjectContributor>>;
}

/// Repository for project outputs.
#[async_trait]
pub trait ProjectOutputRepository: Send + Sync {
    /// Get an output with its current repository and metadata standard ids.
    async fn get_project_output(&self, id: i64) -> StorageResult<Option<ProjectOutput>>;
}

// =============================================================================
// Composite Repository
// =============================================================================

/// Combined repository access for the API layer.
///
/// Gives every search endpoint its [`PageFetcher`] and every relationship
/// edit its [`AssociationStore`], so adapters are injected in one place.
pub trait Repositories: Send + Sync {
    fn affiliations(&self) -> &dyn PageFetcher<Affiliation>;

    fn templates(&self) -> &dyn PageFetcher<Template>;

    fn published_templates(&self) -> &dyn PageFetcher<VersionedTemplate>;

    fn licenses(&self) -> &dyn PageFetcher<License>;

    fn metadata_standards(&self) -> &dyn PageFetcher<MetadataStandard>;

    fn projects(&self) -> &dyn PageFetcher<Project>;

    fn repositories(&self) -> &dyn PageFetcher<Repository>;

    fn research_domains(&self) -> &dyn PageFetcher<ResearchDomain>;

    fn users(&self) -> &dyn PageFetcher<User>;

    fn sections(&self) -> &dyn PageFetcher<Section>;

    fn project_contributors(&self) -> &dyn ProjectContributorRepository;

    fn project_outputs(&self) -> &dyn ProjectOutputRepository;

    /// Access the join-table store for `kind`.
    fn associations(&self, kind: AssociationKind) -> &dyn AssociationStore;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_term_ignores_blank() {
        assert_eq!(SearchFilter::term("  ").normalized_term(), None);
        assert_eq!(SearchFilter::term(" dmp ").normalized_term(), Some("dmp"));
        assert_eq!(SearchFilter::default().normalized_term(), None);
    }
}
