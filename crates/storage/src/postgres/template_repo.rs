//! Template, published template and section tables.

use chrono::{DateTime, Utc};

use dmplan_core::error::StorageResult;
use dmplan_core::models::{Section, Template, VersionedTemplate};

use super::search_repo::{SearchRow, TableSpec};

// =============================================================================
// Templates
// =============================================================================

#[derive(sqlx::FromRow)]
pub struct TemplateRow {
    id: i64,
    name: String,
    description: Option<String>,
    owner_id: String,
    visibility: String,
    best_practice: bool,
    latest_published_version: Option<String>,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl SearchRow for TemplateRow {
    type Entity = Template;

    const TABLE: TableSpec = TableSpec {
        from: "templates t",
        select: "t.id, t.name, t.description, t.owner_id, t.visibility, t.best_practice, \
                 t.latest_published_version, t.created, t.modified",
        id_column: "t.id",
        term_columns: &["t.name", "t.description"],
        owner_column: Some("t.owner_id"),
        best_practice_column: Some("t.best_practice"),
        affiliation_column: None,
        creator_column: None,
        parent_column: None,
        fixed_predicate: Some("t.archived = FALSE"),
        sort_columns: &[
            ("name", "t.name"),
            ("created", "t.created"),
            ("modified", "t.modified"),
        ],
    };

    fn into_entity(self) -> StorageResult<Template> {
        Ok(Template {
            id: self.id,
            name: self.name,
            description: self.description,
            owner_id: self.owner_id,
            visibility: self.visibility,
            best_practice: self.best_practice,
            latest_published_version: self.latest_published_version,
            created: self.created,
            modified: self.modified,
        })
    }
}

// =============================================================================
// Published Templates
// =============================================================================

#[derive(sqlx::FromRow)]
pub struct VersionedTemplateRow {
    id: i64,
    template_id: i64,
    name: String,
    description: Option<String>,
    version: String,
    owner_id: String,
    best_practice: bool,
    active: bool,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl SearchRow for VersionedTemplateRow {
    type Entity = VersionedTemplate;

    // Only the active version of each template is published
    const TABLE: TableSpec = TableSpec {
        from: "versioned_templates vt",
        select: "vt.id, vt.template_id, vt.name, vt.description, vt.version, vt.owner_id, \
                 vt.best_practice, vt.active, vt.created, vt.modified",
        id_column: "vt.id",
        term_columns: &["vt.name", "vt.description"],
        owner_column: Some("vt.owner_id"),
        best_practice_column: Some("vt.best_practice"),
        affiliation_column: None,
        creator_column: None,
        parent_column: Some("vt.template_id"),
        fixed_predicate: Some("vt.active = TRUE"),
        sort_columns: &[
            ("name", "vt.name"),
            ("version", "vt.version"),
            ("created", "vt.created"),
            ("modified", "vt.modified"),
        ],
    };

    fn into_entity(self) -> StorageResult<VersionedTemplate> {
        Ok(VersionedTemplate {
            id: self.id,
            template_id: self.template_id,
            name: self.name,
            description: self.description,
            version: self.version,
            owner_id: self.owner_id,
            best_practice: self.best_practice,
            active: self.active,
            created: self.created,
            modified: self.modified,
        })
    }
}

// =============================================================================
// Sections
// =============================================================================

#[derive(sqlx::FromRow)]
pub struct SectionRow {
    id: i64,
    template_id: i64,
    name: String,
    introduction: Option<String>,
    display_order: i32,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl SearchRow for SectionRow {
    type Entity = Section;

    const TABLE: TableSpec = TableSpec {
        from: "sections s",
        select: "s.id, s.template_id, s.name, s.introduction, s.display_order, s.created, s.modified",
        id_column: "s.id",
        term_columns: &["s.name", "s.introduction"],
        owner_column: None,
        best_practice_column: None,
        affiliation_column: None,
        creator_column: None,
        parent_column: Some("s.template_id"),
        fixed_predicate: None,
        sort_columns: &[
            ("displayOrder", "s.display_order"),
            ("name", "s.name"),
            ("created", "s.created"),
        ],
    };

    fn into_entity(self) -> StorageResult<Section> {
        Ok(Section {
            id: self.id,
            template_id: self.template_id,
            name: self.name,
            introduction: self.introduction,
            display_order: self.display_order,
            created: self.created,
            modified: self.modified,
        })
    }
}
