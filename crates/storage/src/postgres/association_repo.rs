//! Join-table repositories for many-to-many relationships.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use dmplan_core::error::StorageResult;
use dmplan_core::models::AssociationKind;
use dmplan_core::ports::AssociationStore;

use super::helpers::query_error;

/// How one relationship maps onto its join table.
///
/// SAFETY: table and column names are compile-time constants; ids are
/// always bound as parameters.
#[derive(Debug, Clone, Copy)]
pub struct JoinTableSpec {
    pub kind: AssociationKind,
    /// The join table.
    pub table: &'static str,
    /// Join-table column referencing the parent.
    pub parent_column: &'static str,
    /// Join-table column referencing the related row.
    pub related_column: &'static str,
    /// Table of the related rows.
    pub related_table: &'static str,
    /// Human-readable column of the related rows.
    pub label_column: &'static str,
}

pub const CONTRIBUTOR_ROLES: JoinTableSpec = JoinTableSpec {
    kind: AssociationKind::ContributorRoles,
    table: "project_contributor_roles",
    parent_column: "project_contributor_id",
    related_column: "contributor_role_id",
    related_table: "contributor_roles",
    label_column: "label",
};

pub const OUTPUT_REPOSITORIES: JoinTableSpec = JoinTableSpec {
    kind: AssociationKind::OutputRepositories,
    table: "project_output_repositories",
    parent_column: "project_output_id",
    related_column: "repository_id",
    related_table: "repositories",
    label_column: "name",
};

pub const OUTPUT_METADATA_STANDARDS: JoinTableSpec = JoinTableSpec {
    kind: AssociationKind::OutputMetadataStandards,
    table: "project_output_metadata_standards",
    parent_column: "project_output_id",
    related_column: "metadata_standard_id",
    related_table: "metadata_standards",
    label_column: "name",
};

impl JoinTableSpec {
    fn exists_sql(&self) -> String {
        format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)",
            self.related_table
        )
    }

    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {table} ({parent}, {related}) VALUES ($1, $2) \
             ON CONFLICT ({parent}, {related}) DO NOTHING",
            table = self.table,
            parent = self.parent_column,
            related = self.related_column,
        )
    }

    fn delete_sql(&self) -> String {
        format!(
            "DELETE FROM {} WHERE {} = $1 AND {} = $2",
            self.table, self.parent_column, self.related_column
        )
    }

    fn labels_sql(&self) -> String {
        format!(
            "SELECT id, {} FROM {} WHERE id = ANY($1) ORDER BY id",
            self.label_column, self.related_table
        )
    }
}

/// PostgreSQL implementation of AssociationStore over one join table.
pub struct PgAssociationRepository {
    pool: PgPool,
    spec: JoinTableSpec,
}

impl PgAssociationRepository {
    pub fn new(pool: PgPool, spec: JoinTableSpec) -> Self {
        Self { pool, spec }
    }
}

#[async_trait]
impl AssociationStore for PgAssociationRepository {
    fn kind(&self) -> AssociationKind {
        self.spec.kind
    }

    #[instrument(skip(self), fields(table = self.spec.table))]
    async fn add_to(&self, parent_id: i64, id: i64) -> StorageResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(&self.spec.exists_sql())
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;

        if !exists {
            debug!("Related row not found");
            return Ok(false);
        }

        // An existing link already satisfies the request
        sqlx::query(&self.spec.insert_sql())
            .bind(parent_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(true)
    }

    #[instrument(skip(self), fields(table = self.spec.table))]
    async fn remove_from(&self, parent_id: i64, id: i64) -> StorageResult<bool> {
        let result = sqlx::query(&self.spec.delete_sql())
            .bind(parent_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn labels(&self, ids: &[i64]) -> StorageResult<Vec<(i64, String)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, (i64, String)>(&self.spec.labels_sql())
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)
    }
}
