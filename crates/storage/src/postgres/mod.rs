//! PostgreSQL storage adapter.
//!
//! This module implements the port traits defined in `dmplan-core`
//! using PostgreSQL as the backing store.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool and migrations
//! - [`PgRepositories`] - Composite repository implementing `Repositories` trait
//! - [`PgSearchRepository`] - One generic paginated search per entity, driven by a [`TableSpec`]
//! - [`PgAssociationRepository`] - One join-table store per relationship
//!
//! # Usage
//!
//! ```ignore
//! let config = DatabaseConfig::for_api(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let repositories = PgRepositories::new(&db);
//! ```

mod association_repo;
mod database;
mod helpers;
mod project_repo;
mod reference_repo;
mod search_repo;
mod template_repo;
mod user_repo;

pub use association_repo::{JoinTableSpec, PgAssociationRepository};
pub use database::{Database, DatabaseConfig};
pub use project_repo::{PgProjectContributorRepository, PgProjectOutputRepository};
pub use search_repo::{PgSearchRepository, SearchRow, TableSpec};

use dmplan_core::models::{
    Affiliation, AssociationKind, License, MetadataStandard, Project, Repository, ResearchDomain,
    Section, Template, User, VersionedTemplate,
};
use dmplan_core::ports::{
    AssociationStore, PageFetcher, ProjectContributorRepository, ProjectOutputRepository,
    Repositories,
};

use association_repo::{CONTRIBUTOR_ROLES, OUTPUT_METADATA_STANDARDS, OUTPUT_REPOSITORIES};
use project_repo::ProjectRow;
use reference_repo::{
    AffiliationRow, LicenseRow, MetadataStandardRow, RepositoryRow, ResearchDomainRow,
};
use template_repo::{SectionRow, TemplateRow, VersionedTemplateRow};
use user_repo::UserRow;

// =============================================================================
// Composite Repository
// =============================================================================

/// Aggregated PostgreSQL repositories implementing the `Repositories` trait.
///
/// All repositories share one connection pool.
pub struct PgRepositories {
    affiliations: PgSearchRepository<AffiliationRow>,
    templates: PgSearchRepository<TemplateRow>,
    published_templates: PgSearchRepository<VersionedTemplateRow>,
    licenses: PgSearchRepository<LicenseRow>,
    metadata_standards: PgSearchRepository<MetadataStandardRow>,
    projects: PgSearchRepository<ProjectRow>,
    repositories: PgSearchRepository<RepositoryRow>,
    research_domains: PgSearchRepository<ResearchDomainRow>,
    users: PgSearchRepository<UserRow>,
    sections: PgSearchRepository<SectionRow>,
    project_contributors: PgProjectContributorRepository,
    project_outputs: PgProjectOutputRepository,
    contributor_roles: PgAssociationRepository,
    output_repositories: PgAssociationRepository,
    output_metadata_standards: PgAssociationRepository,
}

impl PgRepositories {
    /// Create a new repository aggregate from a database connection.
    pub fn new(db: &Database) -> Self {
        let pool = db.pool();
        Self {
            affiliations: PgSearchRepository::new(pool.clone()),
            templates: PgSearchRepository::new(pool.clone()),
            published_templates: PgSearchRepository::new(pool.clone()),
            licenses: PgSearchRepository::new(pool.clone()),
            metadata_standards: PgSearchRepository::new(pool.clone()),
            projects: PgSearchRepository::new(pool.clone()),
            repositories: PgSearchRepository::new(pool.clone()),
            research_domains: PgSearchRepository::new(pool.clone()),
            users: PgSearchRepository::new(pool.clone()),
            sections: PgSearchRepository::new(pool.clone()),
            project_contributors: PgProjectContributorRepository::new(pool.clone()),
            project_outputs: PgProjectOutputRepository::new(pool.clone()),
            contributor_roles: PgAssociationRepository::new(pool.clone(), CONTRIBUTOR_ROLES),
            output_repositories: PgAssociationRepository::new(pool.clone(), OUTPUT_REPOSITORIES),
            output_metadata_standards: PgAssociationRepository::new(
                pool.clone(),
                OUTPUT_METADATA_STANDARDS,
            ),
        }
    }
}

impl Repositories for PgRepositories {
    fn affiliations(&self) -> &dyn PageFetcher<Affiliation> {
        &self.affiliations
    }

    fn templates(&self) -> &dyn PageFetcher<Template> {
        &self.templates
    }

    fn published_templates(&self) -> &dyn PageFetcher<VersionedTemplate> {
        &self.published_templates
    }

    fn licenses(&self) -> &dyn PageFetcher<License> {
        &self.licenses
    }

    fn metadata_standards(&self) -> &dyn PageFetcher<MetadataStandard> {
        &self.metadata_standards
    }

    fn projects(&self) -> &dyn PageFetcher<Project> {
        &self.projects
    }

    fn repositories(&self) -> &dyn PageFetcher<Repository> {
        &self.repositories
    }

    fn research_domains(&self) -> &dyn PageFetcher<ResearchDomain> {
        &self.research_domains
    }

    fn users(&self) -> &dyn PageFetcher<User> {
        &self.users
    }

    fn sections(&self) -> &dyn PageFetcher<Section> {
        &self.sections
    }

    fn project_contributors(&self) -> &dyn ProjectContributorRepository {
        &self.project_contributors
    }

    fn project_outputs(&self) -> &dyn ProjectOutputRepository {
        &self.project_outputs
    }

    fn associations(&self, kind: AssociationKind) -> &dyn AssociationStore {
        match kind {
            AssociationKind::ContributorRoles => &self.contributor_roles,
            AssociationKind::OutputRepositories => &self.output_repositories,
            AssociationKind::OutputMetadataStandards => &self.output_metadata_standards,
        }
    }
}
