//! GraphQL schema definition.
//!
//! Every search query goes through the shared [`PaginationEngine`]; every
//! relationship mutation goes through [`AssociationSyncCoordinator`] and
//! reports partial failures in the returned object's `errors` field.

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::{
    Context, EmptySubscription, ErrorExtensions, Object, Result, Schema, SchemaBuilder,
};
use tracing::{error, warn};

use dmplan_core::error::{DomainError, PaginationError};
use dmplan_core::models::{AssociationKind, Caller, HasAssociationIds, UserRole};
use dmplan_core::ports::{
    AssociationStore, PageFetcher, PaginatedResult, Repositories, SearchFilter, Searchable,
};
use dmplan_core::services::{AssociationSyncCoordinator, PaginationEngine, SyncOutcome};

use crate::types::{
    AffiliationSearchResults, DmplanSchema, LicenseSearchResults, MetadataStandardSearchResults,
    PaginationOptionsInput, ProjectContributor, ProjectOutput, ProjectSearchResults,
    RepositorySearchResults, ResearchDomainSearchResults, SectionSearchResults,
    TemplateSearchResults, UserSearchResults, VersionedTemplateSearchResults,
};

// -----------------------------------------------------------------------------
// Schema Configuration
// -----------------------------------------------------------------------------

/// Maximum query depth to prevent deeply nested queries (DoS protection).
/// Note: GraphQL introspection requires depth ~13, so we use 15 to allow it.
pub const MAX_QUERY_DEPTH: usize = 15;

/// Maximum query complexity score (DoS protection).
/// Each field has a default complexity of 1, nested objects multiply.
pub const MAX_QUERY_COMPLEXITY: usize = 500;

/// Maximum length for search terms.
const MAX_TERM_LENGTH: usize = 128;

// -----------------------------------------------------------------------------
// Schema Builder
// -----------------------------------------------------------------------------

/// Create a schema builder with repositories and the pagination engine.
///
/// Remember to call `.limit_depth()` and `.limit_complexity()` before `.finish()`.
pub fn schema_builder<R: Repositories + 'static>(
    repositories: Arc<R>,
    engine: PaginationEngine,
) -> SchemaBuilder<QueryRoot, MutationRoot, EmptySubscription> {
    let repos: Arc<dyn Repositories> = repositories;
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(repos)
        .data(engine)
}

/// Build the schema.
///
/// Includes query depth and complexity limits for DoS protection.
pub fn build_schema<R: Repositories + 'static>(
    repositories: Arc<R>,
    engine: PaginationEngine,
) -> DmplanSchema {
    schema_builder(repositories, engine)
        .limit_depth(MAX_QUERY_DEPTH)
        .limit_complexity(MAX_QUERY_COMPLEXITY)
        .finish()
}

// -----------------------------------------------------------------------------
// Query Root
// -----------------------------------------------------------------------------

/// Search queries.
#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Search active affiliations by name.
    async fn affiliations<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        term: Option<String>,
        options: Option<PaginationOptionsInput>,
    ) -> Result<AffiliationSearchResults> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let filter = search_filter(term)?;
        Ok(paginate(ctx, repos.affiliations(), &filter, options).await?.into())
    }

    /// Search editable templates.
    async fn templates<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        term: Option<String>,
        options: Option<PaginationOptionsInput>,
    ) -> Result<TemplateSearchResults> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let filter = template_filter(term, options.as_ref())?;
        Ok(paginate(ctx, repos.templates(), &filter, options).await?.into())
    }

    /// Search published templates.
    async fn published_templates<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        term: Option<String>,
        options: Option<PaginationOptionsInput>,
    ) -> Result<VersionedTemplateSearchResults> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let filter = template_filter(term, options.as_ref())?;
        Ok(paginate(ctx, repos.published_templates(), &filter, options)
            .await?
            .into())
    }

    /// Search licenses.
    async fn licenses<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        term: Option<String>,
        options: Option<PaginationOptionsInput>,
    ) -> Result<LicenseSearchResults> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let filter = search_filter(term)?;
        Ok(paginate(ctx, repos.licenses(), &filter, options).await?.into())
    }

    /// Search metadata standards.
    async fn metadata_standards<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        term: Option<String>,
        options: Option<PaginationOptionsInput>,
    ) -> Result<MetadataStandardSearchResults> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let filter = search_filter(term)?;
        Ok(paginate(ctx, repos.metadata_standards(), &filter, options)
            .await?
            .into())
    }

    /// Search the caller's projects. Admins see every project.
    async fn my_projects<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        term: Option<String>,
        options: Option<PaginationOptionsInput>,
    ) -> Result<ProjectSearchResults> {
        let caller = require_caller(ctx)?;
        let repos = ctx.data::<Arc<dyn Repositories>>()?;

        let mut filter = search_filter(term)?;
        if !caller.role.is_admin() {
            filter.created_by = Some(caller.user_id);
        }

        Ok(paginate(ctx, repos.projects(), &filter, options).await?.into())
    }

    /// Search data repositories.
    async fn repositories<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        term: Option<String>,
        options: Option<PaginationOptionsInput>,
    ) -> Result<RepositorySearchResults> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let filter = search_filter(term)?;
        Ok(paginate(ctx, repos.repositories(), &filter, options)
            .await?
            .into())
    }

    /// Search research domains, optionally under one parent domain.
    async fn research_domains<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        term: Option<String>,
        parent_research_domain_id: Option<i64>,
        options: Option<PaginationOptionsInput>,
    ) -> Result<ResearchDomainSearchResults> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let mut filter = search_filter(term)?;
        filter.parent_id = parent_research_domain_id;
        Ok(paginate(ctx, repos.research_domains(), &filter, options)
            .await?
            .into())
    }

    /// Search users of the caller's affiliation. Super admins see every user.
    async fn users<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        term: Option<String>,
        options: Option<PaginationOptionsInput>,
    ) -> Result<UserSearchResults> {
        let caller = require_caller(ctx)?;
        let repos = ctx.data::<Arc<dyn Repositories>>()?;

        let mut filter = search_filter(term)?;
        if caller.role != UserRole::SuperAdmin {
            let uri = caller.affiliation_uri.clone().ok_or_else(|| {
                gql_error(DomainError::Forbidden(
                    "caller has no affiliation".to_string(),
                ))
            })?;
            filter.affiliation_uri = Some(uri);
        }

        Ok(paginate(ctx, repos.users(), &filter, options).await?.into())
    }

    /// Search the sections of a template.
    async fn sections<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        template_id: i64,
        term: Option<String>,
        options: Option<PaginationOptionsInput>,
    ) -> Result<SectionSearchResults> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let mut filter = search_filter(term)?;
        filter.parent_id = Some(template_id);
        Ok(paginate(ctx, repos.sections(), &filter, options).await?.into())
    }
}

// -----------------------------------------------------------------------------
// Mutation Root
// -----------------------------------------------------------------------------

/// Relationship edits.
#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Replace the roles of a project contributor.
    async fn update_project_contributor_roles<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        project_contributor_id: i64,
        role_ids: Vec<i64>,
    ) -> Result<ProjectContributor> {
        require_caller(ctx)?;
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let contributors = repos.project_contributors();

        let contributor = contributors
            .get_project_contributor(project_contributor_id)
            .await
            .map_err(gql_error)?
            .ok_or_else(|| not_found("ProjectContributor", project_contributor_id))?;

        let store = repos.associations(AssociationKind::ContributorRoles);
        let errors = sync_associations(store, &contributor.roles(), &role_ids).await;

        let refreshed = contributors
            .get_project_contributor(project_contributor_id)
            .await
            .map_err(gql_error)?
            .ok_or_else(|| not_found("ProjectContributor", project_contributor_id))?;

        Ok(ProjectContributor::new(refreshed, errors))
    }

    /// Replace the repositories selected for a project output.
    async fn update_project_output_repositories<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        project_output_id: i64,
        repository_ids: Vec<i64>,
    ) -> Result<ProjectOutput> {
        require_caller(ctx)?;
        let repos = ctx.data::<Arc<dyn Repositories>>()?;

        let output = load_output(repos.as_ref(), project_output_id).await?;
        let store = repos.associations(AssociationKind::OutputRepositories);
        let errors = sync_associations(store, &output.repositories(), &repository_ids).await;

        let refreshed = load_output(repos.as_ref(), project_output_id).await?;
        Ok(ProjectOutput::new(refreshed, errors))
    }

    /// Replace the metadata standards selected for a project output.
    async fn update_project_output_metadata_standards<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        project_output_id: i64,
        metadata_standard_ids: Vec<i64>,
    ) -> Result<ProjectOutput> {
        require_caller(ctx)?;
        let repos = ctx.data::<Arc<dyn Repositories>>()?;

        let output = load_output(repos.as_ref(), project_output_id).await?;
        let store = repos.associations(AssociationKind::OutputMetadataStandards);
        let errors =
            sync_associations(store, &output.metadata_standards(), &metadata_standard_ids).await;

        let refreshed = load_output(repos.as_ref(), project_output_id).await?;
        Ok(ProjectOutput::new(refreshed, errors))
    }
}

// -----------------------------------------------------------------------------
// Resolver Helpers
// -----------------------------------------------------------------------------

async fn paginate<T: Searchable>(
    ctx: &Context<'_>,
    fetcher: &dyn PageFetcher<T>,
    filter: &SearchFilter,
    options: Option<PaginationOptionsInput>,
) -> Result<PaginatedResult<T>> {
    let engine = ctx.data::<PaginationEngine>()?;
    let options = options.map(|o| o.to_options()).unwrap_or_default();

    engine
        .paginate(fetcher, filter, &options)
        .await
        .map_err(gql_error)
}

async fn load_output(
    repos: &dyn Repositories,
    id: i64,
) -> Result<dmplan_core::models::ProjectOutput> {
    repos
        .project_outputs()
        .get_project_output(id)
        .await
        .map_err(gql_error)?
        .ok_or_else(|| not_found("ProjectOutput", id))
}

/// Apply the requested ids and describe what could not be applied.
async fn sync_associations<P>(
    store: &dyn AssociationStore,
    parent: &P,
    desired: &[i64],
) -> Option<String>
where
    P: HasAssociationIds + Sync,
{
    let outcome = AssociationSyncCoordinator::new(store)
        .sync(parent, desired)
        .await;

    if outcome.is_fully_applied() {
        return None;
    }

    let mut failed = outcome.failed_removal_ids();
    failed.extend(outcome.failed_addition_ids());

    // Fall back to raw ids when labels cannot be loaded
    let labels: HashMap<i64, String> = match store.labels(&failed).await {
        Ok(labels) => labels.into_iter().collect(),
        Err(e) => {
            warn!(error = %e, kind = store.kind().as_str(), "Failed to load labels");
            HashMap::new()
        }
    };

    format_sync_warning(store.kind(), &outcome, &labels)
}

/// User-facing summary of the failed part of a sync.
fn format_sync_warning(
    kind: AssociationKind,
    outcome: &SyncOutcome,
    labels: &HashMap<i64, String>,
) -> Option<String> {
    let describe = |ids: Vec<i64>| {
        ids.into_iter()
            .map(|id| labels.get(&id).cloned().unwrap_or_else(|| id.to_string()))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut parts = Vec::new();
    if !outcome.failed_additions.is_empty() {
        parts.push(format!(
            "unable to assign {}: {}",
            kind.related_label(),
            describe(outcome.failed_addition_ids())
        ));
    }
    if !outcome.failed_removals.is_empty() {
        parts.push(format!(
            "unable to remove {}: {}",
            kind.related_label(),
            describe(outcome.failed_removal_ids())
        ));
    }

    if parts.is_empty() {
        None
    } else {
        Some(format!("Updated but {}", parts.join("; ")))
    }
}

fn require_caller<'a>(ctx: &Context<'a>) -> Result<&'a Caller> {
    ctx.data_opt::<Caller>().ok_or_else(|| {
        gql_error(DomainError::Unauthorized(
            "authentication required".to_string(),
        ))
    })
}

fn search_filter(term: Option<String>) -> Result<SearchFilter> {
    if let Some(value) = &term {
        if value.len() > MAX_TERM_LENGTH {
            return Err(gql_error(DomainError::ValidationError(format!(
                "term too long: maximum {} characters allowed",
                MAX_TERM_LENGTH
            ))));
        }
    }

    Ok(SearchFilter {
        term,
        ..Default::default()
    })
}

fn template_filter(
    term: Option<String>,
    options: Option<&PaginationOptionsInput>,
) -> Result<SearchFilter> {
    let mut filter = search_filter(term)?;
    if let Some(options) = options {
        filter.best_practice = options.best_practice;
        filter.owner_uris = options.select_owner_uris.clone().unwrap_or_default();
    }
    Ok(filter)
}

fn not_found(entity: &'static str, id: i64) -> async_graphql::Error {
    gql_error(DomainError::NotFound { entity, id })
}

// -----------------------------------------------------------------------------
// Error Mapping
// -----------------------------------------------------------------------------

/// `extensions.code` for a domain error.
fn error_code(err: &DomainError) -> &'static str {
    match err {
        DomainError::ValidationError(_)
        | DomainError::Pagination(PaginationError::InvalidOptions(_)) => "BAD_USER_INPUT",
        DomainError::Pagination(PaginationError::InvalidCursor(_)) => "INVALID_CURSOR",
        DomainError::Unauthorized(_) => "UNAUTHENTICATED",
        DomainError::Forbidden(_) => "FORBIDDEN",
        DomainError::NotFound { .. } => "NOT_FOUND",
        DomainError::Pagination(PaginationError::Storage(_)) | DomainError::Storage(_) => {
            "INTERNAL_SERVER_ERROR"
        }
    }
}

/// Convert a domain error into a GraphQL error with an `extensions.code`.
///
/// Internal failures are logged and reported without details.
fn gql_error(err: impl Into<DomainError>) -> async_graphql::Error {
    let err = err.into();
    let code = error_code(&err);

    let message = if code == "INTERNAL_SERVER_ERROR" {
        error!(error = %err, "Request failed");
        "Internal server error".to_string()
    } else {
        err.to_string()
    };

    async_graphql::Error::new(message).extend_with(|_, e| e.set("code", code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::{Request, Value as ConstValue};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use dmplan_core::error::{StorageError, StorageResult};
    use dmplan_core::models::{self, License};
    use dmplan_core::ports::memory::{MemoryAssociationStore, MemoryPageFetcher};
    use dmplan_core::ports::{ProjectContributorRepository, ProjectOutputRepository};
    use dmplan_core::services::{AssociationFailure, CursorCodec, PaginationConfig};
    use serde_json::{Value, json};

    fn at(day: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn license(id: i64, name: &str) -> License {
        License {
            id,
            name: name.into(),
            uri: format!("https://licenses.example/{id}"),
            description: None,
            recommended: false,
            created: at(1),
            modified: at(1),
        }
    }

    fn user(id: i64, sur_name: &str, affiliation: &str) -> models::User {
        models::User {
            id,
            email: format!("{sur_name}@example.org"),
            given_name: None,
            sur_name: Some(sur_name.into()),
            role: UserRole::Researcher,
            affiliation_id: Some(affiliation.into()),
            created: at(1),
            modified: at(1),
        }
    }

    fn project(id: i64, title: &str, created_by_id: i64) -> models::Project {
        models::Project {
            id,
            title: title.into(),
            abstract_text: None,
            is_test_project: false,
            created_by_id,
            created: at(id as u32),
            modified: at(id as u32),
        }
    }

    /// Contributors whose roles live in the shared role store.
    struct Contributors {
        roles: Arc<MemoryAssociationStore>,
    }

    #[async_trait]
    impl ProjectContributorRepository for Contributors {
        async fn get_project_contributor(
            &self,
            id: i64,
        ) -> StorageResult<Option<models::ProjectContributor>> {
            if id != 10 {
                return Ok(None);
            }
            Ok(Some(models::ProjectContributor {
                id,
                project_id: 1,
                given_name: Some("Ada".into()),
                sur_name: Some("Lovelace".into()),
                email: None,
                role_ids: self.roles.links(id),
                modified: at(1),
            }))
        }
    }

    struct NoOutputs;

    #[async_trait]
    impl ProjectOutputRepository for NoOutputs {
        async fn get_project_output(&self, _: i64) -> StorageResult<Option<models::ProjectOutput>> {
            Ok(None)
        }
    }

    struct TestRepos {
        affiliations: MemoryPageFetcher<models::Affiliation>,
        templates: MemoryPageFetcher<models::Template>,
        published_templates: MemoryPageFetcher<models::VersionedTemplate>,
        licenses: MemoryPageFetcher<License>,
        metadata_standards: MemoryPageFetcher<models::MetadataStandard>,
        projects: MemoryPageFetcher<models::Project>,
        repositories: MemoryPageFetcher<models::Repository>,
        research_domains: MemoryPageFetcher<models::ResearchDomain>,
        users: MemoryPageFetcher<models::User>,
        sections: MemoryPageFetcher<models::Section>,
        contributors: Contributors,
        outputs: NoOutputs,
        roles: Arc<MemoryAssociationStore>,
        output_repositories: MemoryAssociationStore,
        output_metadata_standards: MemoryAssociationStore,
    }

    impl TestRepos {
        fn new() -> Self {
            let roles = Arc::new(
                MemoryAssociationStore::new(AssociationKind::ContributorRoles)
                    .with_links(10, &[1])
                    .with_known(&[1, 2])
                    .with_label(1, "Data Manager")
                    .with_label(2, "Investigator"),
            );
            Self {
                affiliations: MemoryPageFetcher::new(vec![]),
                templates: MemoryPageFetcher::new(vec![]),
                published_templates: MemoryPageFetcher::new(vec![]),
                licenses: MemoryPageFetcher::new(vec![
                    license(3, "C"),
                    license(1, "A"),
                    license(2, "B"),
                ]),
                metadata_standards: MemoryPageFetcher::new(vec![]),
                projects: MemoryPageFetcher::new(vec![
                    project(1, "Mine", 7),
                    project(2, "Theirs", 8),
                ])
                .with_matcher(|p: &models::Project, f: &SearchFilter| {
                    f.created_by.is_none_or(|id| p.created_by_id == id)
                }),
                repositories: MemoryPageFetcher::new(vec![]),
                research_domains: MemoryPageFetcher::new(vec![]),
                users: MemoryPageFetcher::new(vec![
                    user(1, "Curie", "https://ror.org/a"),
                    user(2, "Noether", "https://ror.org/b"),
                ])
                .with_matcher(|u: &models::User, f: &SearchFilter| {
                    f.affiliation_uri.is_none() || u.affiliation_id == f.affiliation_uri
                }),
                sections: MemoryPageFetcher::new(vec![]),
                contributors: Contributors {
                    roles: roles.clone(),
                },
                outputs: NoOutputs,
                roles,
                output_repositories: MemoryAssociationStore::new(
                    AssociationKind::OutputRepositories,
                ),
                output_metadata_standards: MemoryAssociationStore::new(
                    AssociationKind::OutputMetadataStandards,
                ),
            }
        }
    }

    impl Repositories for TestRepos {
        fn affiliations(&self) -> &dyn PageFetcher<models::Affiliation> {
            &self.affiliations
        }
        fn templates(&self) -> &dyn PageFetcher<models::Template> {
            &self.templates
        }
        fn published_templates(&self) -> &dyn PageFetcher<models::VersionedTemplate> {
            &self.published_templates
        }
        fn licenses(&self) -> &dyn PageFetcher<License> {
            &self.licenses
        }
        fn metadata_standards(&self) -> &dyn PageFetcher<models::MetadataStandard> {
            &self.metadata_standards
        }
        fn projects(&self) -> &dyn PageFetcher<models::Project> {
            &self.projects
        }
        fn repositories(&self) -> &dyn PageFetcher<models::Repository> {
            &self.repositories
        }
        fn research_domains(&self) -> &dyn PageFetcher<models::ResearchDomain> {
            &self.research_domains
        }
        fn users(&self) -> &dyn PageFetcher<models::User> {
            &self.users
        }
        fn sections(&self) -> &dyn PageFetcher<models::Section> {
            &self.sections
        }
        fn project_contributors(&self) -> &dyn ProjectContributorRepository {
            &self.contributors
        }
        fn project_outputs(&self) -> &dyn ProjectOutputRepository {
            &self.outputs
        }
        fn associations(&self, kind: AssociationKind) -> &dyn AssociationStore {
            match kind {
                AssociationKind::ContributorRoles => self.roles.as_ref(),
                AssociationKind::OutputRepositories => &self.output_repositories,
                AssociationKind::OutputMetadataStandards => &self.output_metadata_standards,
            }
        }
    }

    fn schema() -> DmplanSchema {
        let engine = PaginationEngine::new(CursorCodec::new("test"), PaginationConfig::default());
        build_schema(Arc::new(TestRepos::new()), engine)
    }

    fn researcher(user_id: i64) -> Caller {
        Caller {
            user_id,
            role: UserRole::Researcher,
            affiliation_uri: Some("https://ror.org/a".into()),
        }
    }

    async fn run(schema: &DmplanSchema, request: impl Into<Request>) -> (Value, Vec<String>) {
        let response = schema.execute(request).await;
        let codes = response
            .errors
            .iter()
            .filter_map(|e| match e.extensions.as_ref()?.get("code")? {
                ConstValue::String(code) => Some(code.clone()),
                _ => None,
            })
            .collect();
        (response.data.into_json().unwrap(), codes)
    }

    // Test critique: parcours curseur de bout en bout via GraphQL
    #[tokio::test]
    async fn test_cursor_search_over_graphql() {
        let schema = schema();
        let (data, codes) = run(
            &schema,
            r#"{ licenses(options: { type: CURSOR, limit: 2 }) {
                items { name } totalCount nextCursor hasNextPage hasPreviousPage availableSortFields
            } }"#,
        )
        .await;
        assert!(codes.is_empty());

        let page = &data["licenses"];
        assert_eq!(page["items"], json!([{ "name": "A" }, { "name": "B" }]));
        assert_eq!(page["totalCount"], 3);
        assert_eq!(page["hasNextPage"], true);
        assert_eq!(page["hasPreviousPage"], false);
        assert_eq!(page["availableSortFields"], json!(["name", "created"]));

        let cursor = page["nextCursor"].as_str().unwrap().to_string();
        let query = format!(
            r#"{{ licenses(options: {{ cursor: "{cursor}", limit: 2 }}) {{
                items {{ name }} nextCursor hasNextPage hasPreviousPage
            }} }}"#
        );
        let (data, _) = run(&schema, query).await;
        let page = &data["licenses"];
        assert_eq!(page["items"], json!([{ "name": "C" }]));
        assert_eq!(page["nextCursor"], Value::Null);
        assert_eq!(page["hasPreviousPage"], true);
    }

    #[tokio::test]
    async fn test_offset_search_over_graphql() {
        let (data, _) = run(
            &schema(),
            r#"{ licenses(options: { offset: 1, limit: 1, sortField: "name", sortDir: "DESC" }) {
                items { name } currentOffset hasNextPage hasPreviousPage nextCursor
            } }"#,
        )
        .await;
        let page = &data["licenses"];
        assert_eq!(page["items"], json!([{ "name": "B" }]));
        assert_eq!(page["currentOffset"], 1);
        assert_eq!(page["hasNextPage"], true);
        assert_eq!(page["hasPreviousPage"], true);
        assert_eq!(page["nextCursor"], Value::Null);
    }

    #[tokio::test]
    async fn test_validation_errors_carry_codes() {
        let schema = schema();

        let (_, codes) = run(&schema, r#"{ licenses(options: { limit: 0 }) { totalCount } }"#).await;
        assert_eq!(codes, vec!["BAD_USER_INPUT"]);

        let (_, codes) = run(
            &schema,
            r#"{ licenses(options: { cursor: "garbage" }) { totalCount } }"#,
        )
        .await;
        assert_eq!(codes, vec!["INVALID_CURSOR"]);

        let (_, codes) = run(&schema, r#"{ myProjects { totalCount } }"#).await;
        assert_eq!(codes, vec!["UNAUTHENTICATED"]);
    }

    #[tokio::test]
    async fn test_scoped_searches() {
        let schema = schema();

        let request = Request::new(r#"{ myProjects { items { title } } }"#).data(researcher(7));
        let (data, _) = run(&schema, request).await;
        assert_eq!(data["myProjects"]["items"], json!([{ "title": "Mine" }]));

        let request = Request::new(r#"{ users { items { surName } } }"#).data(researcher(7));
        let (data, _) = run(&schema, request).await;
        assert_eq!(data["users"]["items"], json!([{ "surName": "Curie" }]));

        let admin = Caller {
            role: UserRole::SuperAdmin,
            ..researcher(1)
        };
        let request = Request::new(r#"{ users { totalCount } }"#).data(admin);
        let (data, _) = run(&schema, request).await;
        assert_eq!(data["users"]["totalCount"], 2);
    }

    // Test critique: un appelant authentifié sans affiliation est refusé, pas anonyme
    #[tokio::test]
    async fn test_users_without_affiliation_is_forbidden() {
        let caller = Caller {
            affiliation_uri: None,
            ..researcher(7)
        };
        let request = Request::new(r#"{ users { totalCount } }"#).data(caller);
        let (_, codes) = run(&schema(), request).await;
        assert_eq!(codes, vec!["FORBIDDEN"]);
    }

    // Test critique: succès partiel signalé dans `errors`, pas comme une erreur GraphQL
    #[tokio::test]
    async fn test_role_update_reports_partial_success() {
        let request = Request::new(
            r#"mutation { updateProjectContributorRoles(projectContributorId: 10, roleIds: [2, 99]) {
                roleIds errors
            } }"#,
        )
        .data(researcher(7));
        let (data, codes) = run(&schema(), request).await;

        assert!(codes.is_empty());
        let contributor = &data["updateProjectContributorRoles"];
        assert_eq!(contributor["roleIds"], json!([2]));
        assert_eq!(
            contributor["errors"],
            "Updated but unable to assign roles: 99"
        );
    }

    #[tokio::test]
    async fn test_mutation_on_missing_parent_is_not_found() {
        let request = Request::new(
            r#"mutation { updateProjectOutputRepositories(projectOutputId: 5, repositoryIds: [1]) { id } }"#,
        )
        .data(researcher(7));
        let (_, codes) = run(&schema(), request).await;
        assert_eq!(codes, vec!["NOT_FOUND"]);
    }

    #[test]
    fn test_warning_uses_labels_and_lists_both_directions() {
        let outcome = SyncOutcome {
            failed_additions: vec![AssociationFailure {
                id: 2,
                reason: "related record not found".into(),
            }],
            failed_removals: vec![AssociationFailure {
                id: 5,
                reason: "timeout".into(),
            }],
            ..Default::default()
        };
        let labels = HashMap::from([(2, "Zenodo".to_string())]);

        assert_eq!(
            format_sync_warning(AssociationKind::OutputRepositories, &outcome, &labels).unwrap(),
            "Updated but unable to assign repositories: Zenodo; unable to remove repositories: 5"
        );
        assert_eq!(
            format_sync_warning(
                AssociationKind::ContributorRoles,
                &SyncOutcome::default(),
                &labels
            ),
            None
        );
    }

    #[test]
    fn test_storage_errors_hide_details() {
        let err = gql_error(StorageError::ConnectionError("password=secret".into()));
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn test_term_length_is_bounded() {
        assert!(search_filter(Some("x".repeat(MAX_TERM_LENGTH + 1))).is_err());
        assert!(search_filter(Some("dmp".into())).is_ok());
        assert!(search_filter(None).is_ok());
    }
}
