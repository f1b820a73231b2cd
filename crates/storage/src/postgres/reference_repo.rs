//! Reference data tables: affiliations, licenses, metadata standards,
//! repositories and research domains.

use chrono::{DateTime, Utc};

use dmplan_core::error::StorageResult;
use dmplan_core::models::{Affiliation, License, MetadataStandard, Repository, ResearchDomain};

use super::search_repo::{SearchRow, TableSpec};

// =============================================================================
// Affiliations
// =============================================================================

#[derive(sqlx::FromRow)]
pub struct AffiliationRow {
    id: i64,
    uri: String,
    name: String,
    display_name: String,
    funder: bool,
    active: bool,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl SearchRow for AffiliationRow {
    type Entity = Affiliation;

    const TABLE: TableSpec = TableSpec {
        from: "affiliations a",
        select: "a.id, a.uri, a.name, a.display_name, a.funder, a.active, a.created, a.modified",
        id_column: "a.id",
        term_columns: &["a.name", "a.display_name"],
        owner_column: None,
        best_practice_column: None,
        affiliation_column: None,
        creator_column: None,
        parent_column: None,
        fixed_predicate: Some("a.active = TRUE"),
        sort_columns: &[
            ("name", "a.name"),
            ("displayName", "a.display_name"),
            ("created", "a.created"),
        ],
    };

    fn into_entity(self) -> StorageResult<Affiliation> {
        Ok(Affiliation {
            id: self.id,
            uri: self.uri,
            name: self.name,
            display_name: self.display_name,
            funder: self.funder,
            active: self.active,
            created: self.created,
            modified: self.modified,
        })
    }
}

// =============================================================================
// Licenses
// =============================================================================

#[derive(sqlx::FromRow)]
pub struct LicenseRow {
    id: i64,
    name: String,
    uri: String,
    description: Option<String>,
    recommended: bool,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl SearchRow for LicenseRow {
    type Entity = License;

    const TABLE: TableSpec = TableSpec {
        from: "licenses l",
        select: "l.id, l.name, l.uri, l.description, l.recommended, l.created, l.modified",
        id_column: "l.id",
        term_columns: &["l.name", "l.description"],
        owner_column: None,
        best_practice_column: None,
        affiliation_column: None,
        creator_column: None,
        parent_column: None,
        fixed_predicate: None,
        sort_columns: &[("name", "l.name"), ("created", "l.created")],
    };

    fn into_entity(self) -> StorageResult<License> {
        Ok(License {
            id: self.id,
            name: self.name,
            uri: self.uri,
            description: self.description,
            recommended: self.recommended,
            created: self.created,
            modified: self.modified,
        })
    }
}

// =============================================================================
// Metadata Standards
// =============================================================================

#[derive(sqlx::FromRow)]
pub struct MetadataStandardRow {
    id: i64,
    name: String,
    uri: String,
    description: Option<String>,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl SearchRow for MetadataStandardRow {
    type Entity = MetadataStandard;

    const TABLE: TableSpec = TableSpec {
        from: "metadata_standards ms",
        select: "ms.id, ms.name, ms.uri, ms.description, ms.created, ms.modified",
        id_column: "ms.id",
        term_columns: &["ms.name", "ms.description"],
        owner_column: None,
        best_practice_column: None,
        affiliation_column: None,
        creator_column: None,
        parent_column: None,
        fixed_predicate: None,
        sort_columns: &[("name", "ms.name"), ("created", "ms.created")],
    };

    fn into_entity(self) -> StorageResult<MetadataStandard> {
        Ok(MetadataStandard {
            id: self.id,
            name: self.name,
            uri: self.uri,
            description: self.description,
            created: self.created,
            modified: self.modified,
        })
    }
}

// =============================================================================
// Repositories
// =============================================================================

#[derive(sqlx::FromRow)]
pub struct RepositoryRow {
    id: i64,
    name: String,
    uri: String,
    description: Option<String>,
    website: Option<String>,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl SearchRow for RepositoryRow {
    type Entity = Repository;

    const TABLE: TableSpec = TableSpec {
        from: "repositories r",
        select: "r.id, r.name, r.uri, r.description, r.website, r.created, r.modified",
        id_column: "r.id",
        term_columns: &["r.name", "r.description", "r.website"],
        owner_column: None,
        best_practice_column: None,
        affiliation_column: None,
        creator_column: None,
        parent_column: None,
        fixed_predicate: None,
        sort_columns: &[("name", "r.name"), ("created", "r.created")],
    };

    fn into_entity(self) -> StorageResult<Repository> {
        Ok(Repository {
            id: self.id,
            name: self.name,
            uri: self.uri,
            description: self.description,
            website: self.website,
            created: self.created,
            modified: self.modified,
        })
    }
}

// =============================================================================
// Research Domains
// =============================================================================

#[derive(sqlx::FromRow)]
pub struct ResearchDomainRow {
    id: i64,
    name: String,
    uri: String,
    description: Option<String>,
    parent_research_domain_id: Option<i64>,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl SearchRow for ResearchDomainRow {
    type Entity = ResearchDomain;

    const TABLE: TableSpec = TableSpec {
        from: "research_domains rd",
        select: "rd.id, rd.name, rd.uri, rd.description, rd.parent_research_domain_id, \
                 rd.created, rd.modified",
        id_column: "rd.id",
        term_columns: &["rd.name", "rd.description"],
        owner_column: None,
        best_practice_column: None,
        affiliation_column: None,
        creator_column: None,
        parent_column: Some("rd.parent_research_domain_id"),
        fixed_predicate: None,
        sort_columns: &[("name", "rd.name"), ("created", "rd.created")],
    };

    fn into_entity(self) -> StorageResult<ResearchDomain> {
        Ok(ResearchDomain {
            id: self.id,
            name: self.name,
            uri: self.uri,
            description: self.description,
            parent_research_domain_id: self.parent_research_domain_id,
            created: self.created,
            modified: self.modified,
        })
    }
}
