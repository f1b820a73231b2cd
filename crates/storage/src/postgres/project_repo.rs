//! Project, contributor and output tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use dmplan_core::error::StorageResult;
use dmplan_core::models::{Project, ProjectContributor, ProjectOutput};
use dmplan_core::ports::{ProjectContributorRepository, ProjectOutputRepository};

use super::helpers::query_error;
use super::search_repo::{SearchRow, TableSpec};

// =============================================================================
// Projects
// =============================================================================

#[derive(sqlx::FromRow)]
pub struct ProjectRow {
    id: i64,
    title: String,
    abstract_text: Option<String>,
    is_test_project: bool,
    created_by_id: i64,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl SearchRow for ProjectRow {
    type Entity = Project;

    const TABLE: TableSpec = TableSpec {
        from: "projects p",
        select: "p.id, p.title, p.abstract_text, p.is_test_project, p.created_by_id, \
                 p.created, p.modified",
        id_column: "p.id",
        term_columns: &["p.title", "p.abstract_text"],
        owner_column: None,
        best_practice_column: None,
        affiliation_column: None,
        creator_column: Some("p.created_by_id"),
        parent_column: None,
        fixed_predicate: None,
        sort_columns: &[
            ("created", "p.created"),
            ("title", "p.title"),
            ("modified", "p.modified"),
        ],
    };

    fn into_entity(self) -> StorageResult<Project> {
        Ok(Project {
            id: self.id,
            title: self.title,
            abstract_text: self.abstract_text,
            is_test_project: self.is_test_project,
            created_by_id: self.created_by_id,
            created: self.created,
            modified: self.modified,
        })
    }
}

// =============================================================================
// Contributors
// =============================================================================

/// PostgreSQL implementation of ProjectContributorRepository.
pub struct PgProjectContributorRepository {
    pool: PgPool,
}

impl PgProjectContributorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectContributorRepository for PgProjectContributorRepository {
    #[instrument(skip(self))]
    async fn get_project_contributor(&self, id: i64) -> StorageResult<Option<ProjectContributor>> {
        let row = sqlx::query_as::<_, ContributorRow>(
            r#"
            SELECT pc.id, pc.project_id, pc.given_name, pc.sur_name, pc.email, pc.modified,
                   ARRAY(
                       SELECT pcr.contributor_role_id
                       FROM project_contributor_roles pcr
                       WHERE pcr.project_contributor_id = pc.id
                       ORDER BY pcr.created, pcr.contributor_role_id
                   ) AS role_ids
            FROM project_contributors pc
            WHERE pc.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.map(ContributorRow::into_contributor))
    }
}

#[derive(sqlx::FromRow)]
struct ContributorRow {
    id: i64,
    project_id: i64,
    given_name: Option<String>,
    sur_name: Option<String>,
    email: Option<String>,
    modified: DateTime<Utc>,
    role_ids: Vec<i64>,
}

impl ContributorRow {
    fn into_contributor(self) -> ProjectContributor {
        ProjectContributor {
            id: self.id,
            project_id: self.project_id,
            given_name: self.given_name,
            sur_name: self.sur_name,
            email: self.email,
            role_ids: self.role_ids,
            modified: self.modified,
        }
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// PostgreSQL implementation of ProjectOutputRepository.
pub struct PgProjectOutputRepository {
    pool: PgPool,
}

impl PgProjectOutputRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectOutputRepository for PgProjectOutputRepository {
    #[instrument(skip(self))]
    async fn get_project_output(&self, id: i64) -> StorageResult<Option<ProjectOutput>> {
        let row = sqlx::query_as::<_, OutputRow>(
            r#"
            SELECT po.id, po.project_id, po.title, po.modified,
                   ARRAY(
                       SELECT por.repository_id
                       FROM project_output_repositories por
                       WHERE por.project_output_id = po.id
                       ORDER BY por.created, por.repository_id
                   ) AS repository_ids,
                   ARRAY(
                       SELECT pom.metadata_standard_id
                       FROM project_output_metadata_standards pom
                       WHERE pom.project_output_id = po.id
                       ORDER BY pom.created, pom.metadata_standard_id
                   ) AS metadata_standard_ids
            FROM project_outputs po
            WHERE po.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.map(OutputRow::into_output))
    }
}

#[derive(sqlx::FromRow)]
struct OutputRow {
    id: i64,
    project_id: i64,
    title: String,
    modified: DateTime<Utc>,
    repository_ids: Vec<i64>,
    metadata_standard_ids: Vec<i64>,
}

impl OutputRow {
    fn into_output(self) -> ProjectOutput {
        ProjectOutput {
            id: self.id,
            project_id: self.project_id,
            title: self.title,
            repository_ids: self.repository_ids,
            metadata_standard_ids: self.metadata_standard_ids,
            modified: self.modified,
        }
    }
}
