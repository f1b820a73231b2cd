//! GraphQL type definitions.

use async_graphql::{EmptySubscription, Enum, InputObject, Schema, SimpleObject};
use chrono::{DateTime, Utc};

use dmplan_core::models;
use dmplan_core::ports::{self, PaginatedResult, PaginationMode};

use crate::schema::{MutationRoot, QueryRoot};

/// The dmplan GraphQL schema type.
pub type DmplanSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

// -----------------------------------------------------------------------------
// Pagination Input
// -----------------------------------------------------------------------------

/// Pagination mode.
#[derive(Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaginationType {
    Cursor,
    Offset,
}

impl From<PaginationType> for PaginationMode {
    fn from(t: PaginationType) -> Self {
        match t {
            PaginationType::Cursor => PaginationMode::Cursor,
            PaginationType::Offset => PaginationMode::Offset,
        }
    }
}

/// Pagination and template filter options shared by every search.
#[derive(InputObject, Clone, Debug, Default)]
#[graphql(name = "PaginationOptions")]
pub struct PaginationOptionsInput {
    /// Continuation token from a previous `nextCursor` (CURSOR mode).
    pub cursor: Option<String>,
    /// Page size.
    pub limit: Option<i32>,
    /// Rows to skip (OFFSET mode).
    pub offset: Option<i32>,
    /// One of the query's `availableSortFields` (OFFSET mode).
    pub sort_field: Option<String>,
    /// `ASC` or `DESC` (OFFSET mode).
    pub sort_dir: Option<String>,
    /// Explicit mode. Defaults to CURSOR when a cursor is given, OFFSET otherwise.
    #[graphql(name = "type")]
    pub pagination_type: Option<PaginationType>,
    /// Template searches only: restrict to best-practice templates.
    pub best_practice: Option<bool>,
    /// Template searches only: restrict to these owning affiliation URIs.
    #[graphql(name = "selectOwnerURIs")]
    pub select_owner_uris: Option<Vec<String>>,
}

impl PaginationOptionsInput {
    pub fn to_options(&self) -> ports::PaginationOptions {
        ports::PaginationOptions {
            mode: self.pagination_type.map(PaginationMode::from),
            limit: self.limit.map(i64::from),
            cursor: self.cursor.clone(),
            offset: self.offset.map(i64::from),
            sort_field: self.sort_field.clone(),
            sort_dir: self.sort_dir.clone(),
        }
    }
}

// -----------------------------------------------------------------------------
// Entity Types
// -----------------------------------------------------------------------------

#[derive(SimpleObject)]
pub struct Affiliation {
    pub id: i64,
    pub uri: String,
    pub name: String,
    pub display_name: String,
    pub funder: bool,
    pub active: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<models::Affiliation> for Affiliation {
    fn from(a: models::Affiliation) -> Self {
        Self {
            id: a.id,
            uri: a.uri,
            name: a.name,
            display_name: a.display_name,
            funder: a.funder,
            active: a.active,
            created: a.created,
            modified: a.modified,
        }
    }
}

#[derive(SimpleObject)]
pub struct Template {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub visibility: String,
    pub best_practice: bool,
    pub latest_published_version: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<models::Template> for Template {
    fn from(t: models::Template) -> Self {
        Self {
            id: t.id,
            name: t.name,
            description: t.description,
            owner_id: t.owner_id,
            visibility: t.visibility,
            best_practice: t.best_practice,
            latest_published_version: t.latest_published_version,
            created: t.created,
            modified: t.modified,
        }
    }
}

#[derive(SimpleObject)]
pub struct VersionedTemplate {
    pub id: i64,
    pub template_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    pub owner_id: String,
    pub best_practice: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<models::VersionedTemplate> for VersionedTemplate {
    fn from(t: models::VersionedTemplate) -> Self {
        Self {
            id: t.id,
            template_id: t.template_id,
            name: t.name,
            description: t.description,
            version: t.version,
            owner_id: t.owner_id,
            best_practice: t.best_practice,
            created: t.created,
            modified: t.modified,
        }
    }
}

#[derive(SimpleObject)]
pub struct License {
    pub id: i64,
    pub name: String,
    pub uri: String,
    pub description: Option<String>,
    pub recommended: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<models::License> for License {
    fn from(l: models::License) -> Self {
        Self {
            id: l.id,
            name: l.name,
            uri: l.uri,
            description: l.description,
            recommended: l.recommended,
            created: l.created,
            modified: l.modified,
        }
    }
}

#[derive(SimpleObject)]
pub struct MetadataStandard {
    pub id: i64,
    pub name: String,
    pub uri: String,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<models::MetadataStandard> for MetadataStandard {
    fn from(m: models::MetadataStandard) -> Self {
        Self {
            id: m.id,
            name: m.name,
            uri: m.uri,
            description: m.description,
            created: m.created,
            modified: m.modified,
        }
    }
}

#[derive(SimpleObject)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub abstract_text: Option<String>,
    pub is_test_project: bool,
    pub created_by_id: i64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<models::Project> for Project {
    fn from(p: models::Project) -> Self {
        Self {
            id: p.id,
            title: p.title,
            abstract_text: p.abstract_text,
            is_test_project: p.is_test_project,
            created_by_id: p.created_by_id,
            created: p.created,
            modified: p.modified,
        }
    }
}

#[derive(SimpleObject)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub uri: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<models::Repository> for Repository {
    fn from(r: models::Repository) -> Self {
        Self {
            id: r.id,
            name: r.name,
            uri: r.uri,
            description: r.description,
            website: r.website,
            created: r.created,
            modified: r.modified,
        }
    }
}

#[derive(SimpleObject)]
pub struct ResearchDomain {
    pub id: i64,
    pub name: String,
    pub uri: String,
    pub description: Option<String>,
    pub parent_research_domain_id: Option<i64>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<models::ResearchDomain> for ResearchDomain {
    fn from(r: models::ResearchDomain) -> Self {
        Self {
            id: r.id,
            name: r.name,
            uri: r.uri,
            description: r.description,
            parent_research_domain_id: r.parent_research_domain_id,
            created: r.created,
            modified: r.modified,
        }
    }
}

#[derive(SimpleObject)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub given_name: Option<String>,
    pub sur_name: Option<String>,
    pub role: String,
    pub affiliation_id: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<models::User> for User {
    fn from(u: models::User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            given_name: u.given_name,
            sur_name: u.sur_name,
            role: u.role.as_str().to_string(),
            affiliation_id: u.affiliation_id,
            created: u.created,
            modified: u.modified,
        }
    }
}

#[derive(SimpleObject)]
pub struct Section {
    pub id: i64,
    pub template_id: i64,
    pub name: String,
    pub introduction: Option<String>,
    pub display_order: i32,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<models::Section> for Section {
    fn from(s: models::Section) -> Self {
        Self {
            id: s.id,
            template_id: s.template_id,
            name: s.name,
            introduction: s.introduction,
            display_order: s.display_order,
            created: s.created,
            modified: s.modified,
        }
    }
}

// -----------------------------------------------------------------------------
// Search Results
// -----------------------------------------------------------------------------

/// Generate a paginated result type with its From impl.
macro_rules! define_search_results {
    ($node:ident, $core_model:ty, $results:ident) => {
        #[derive(SimpleObject)]
        pub struct $results {
            pub items: Vec<$node>,
            pub total_count: i64,
            pub limit: i64,
            pub next_cursor: Option<String>,
            pub current_offset: Option<i64>,
            pub has_next_page: bool,
            pub has_previous_page: bool,
            pub available_sort_fields: Vec<String>,
        }

        impl From<PaginatedResult<$core_model>> for $results {
            fn from(page: PaginatedResult<$core_model>) -> Self {
                let page = page.map(<$node>::from);
                Self {
                    items: page.items,
                    total_count: page.total_count,
                    limit: page.limit,
                    next_cursor: page.next_cursor,
                    current_offset: page.current_offset,
                    has_next_page: page.has_next_page,
                    has_previous_page: page.has_previous_page,
                    available_sort_fields: page.available_sort_fields,
                }
            }
        }
    };
}

define_search_results!(Affiliation, models::Affiliation, AffiliationSearchResults);
define_search_results!(Template, models::Template, TemplateSearchResults);
define_search_results!(VersionedTemplate, models::VersionedTemplate, VersionedTemplateSearchResults);
define_search_results!(License, models::License, LicenseSearchResults);
define_search_results!(MetadataStandard, models::MetadataStandard, MetadataStandardSearchResults);
define_search_results!(Project, models::Project, ProjectSearchResults);
define_search_results!(Repository, models::Repository, RepositorySearchResults);
define_search_results!(ResearchDomain, models::ResearchDomain, ResearchDomainSearchResults);
define_search_results!(User, models::User, UserSearchResults);
define_search_results!(Section, models::Section, SectionSearchResults);

// -----------------------------------------------------------------------------
// Association Parents
// -----------------------------------------------------------------------------

/// A project contributor, as returned by role updates.
#[derive(SimpleObject)]
pub struct ProjectContributor {
    pub id: i64,
    pub project_id: i64,
    pub given_name: Option<String>,
    pub sur_name: Option<String>,
    pub email: Option<String>,
    pub role_ids: Vec<i64>,
    pub modified: DateTime<Utc>,
    /// Set when some requested changes could not be applied.
    pub errors: Option<String>,
}

impl ProjectContributor {
    pub fn new(c: models::ProjectContributor, errors: Option<String>) -> Self {
        Self {
            id: c.id,
            project_id: c.project_id,
            given_name: c.given_name,
            sur_name: c.sur_name,
            email: c.email,
            role_ids: c.role_ids,
            modified: c.modified,
            errors,
        }
    }
}

/// A project output, as returned by repository and metadata standard updates.
#[derive(SimpleObject)]
pub struct ProjectOutput {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub repository_ids: Vec<i64>,
    pub metadata_standard_ids: Vec<i64>,
    pub modified: DateTime<Utc>,
    /// Set when some requested changes could not be applied.
    pub errors: Option<String>,
}

impl ProjectOutput {
    pub fn new(o: models::ProjectOutput, errors: Option<String>) -> Self {
        Self {
            id: o.id,
            project_id: o.project_id,
            title: o.title,
            repository_ids: o.repository_ids,
            metadata_standard_ids: o.metadata_standard_ids,
            modified: o.modified,
            errors,
        }
    }
}
