//! Domain models of the data-management-plan backend.
//!
//! These models are storage-agnostic and represent the canonical
//! form of records within the domain layer. Every searchable entity
//! implements [`Searchable`] so the pagination engine can order and
//! position its rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::{OrderDirection, Searchable, SortSpec, SortValue};

/// Implement [`Searchable`] from a sort allow-list mapped to struct members.
///
/// The first field listed is the default ordering.
macro_rules! searchable {
    ($ty:ty, $dir:ident, { $first:literal => $first_member:ident $(, $name:literal => $member:ident)* $(,)? }) => {
        impl Searchable for $ty {
            const SORT: SortSpec = SortSpec {
                allowed: &[$first $(, $name)*],
                default_field: $first,
                default_direction: OrderDirection::$dir,
            };

            fn id(&self) -> i64 {
                self.id
            }

            fn sort_value(&self, field: &str) -> SortValue {
                match field {
                    $first => SortValue::from(&self.$first_member),
                    $($name => SortValue::from(&self.$member),)*
                    _ => SortValue::Null,
                }
            }
        }
    };
}

// =============================================================================
// Callers
// =============================================================================

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    #[default]
    Researcher,
    Admin,
    SuperAdmin,
}

impl UserRole {
    /// Parse the stored/header representation (`RESEARCHER`, `ADMIN`, `SUPERADMIN`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RESEARCHER" => Some(Self::Researcher),
            "ADMIN" => Some(Self::Admin),
            "SUPERADMIN" => Some(Self::SuperAdmin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Researcher => "RESEARCHER",
            Self::Admin => "ADMIN",
            Self::SuperAdmin => "SUPERADMIN",
        }
    }

    /// Admins and super admins.
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

/// The authenticated caller, as resolved by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub role: UserRole,
    pub affiliation_uri: Option<String>,
}

// =============================================================================
// Searchable Entities
// =============================================================================

/// Research organization or funder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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

searchable!(Affiliation, Asc, {
    "name" => name,
    "displayName" => display_name,
    "created" => created,
});

/// Editable DMP template owned by an affiliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// URI of the owning affiliation.
    pub owner_id: String,
    pub visibility: String,
    pub best_practice: bool,
    pub latest_published_version: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

searchable!(Template, Asc, {
    "name" => name,
    "created" => created,
    "modified" => modified,
});

/// Published snapshot of a [`Template`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedTemplate {
    pub id: i64,
    pub template_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    /// URI of the owning affiliation.
    pub owner_id: String,
    pub best_practice: bool,
    pub active: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

searchable!(VersionedTemplate, Asc, {
    "name" => name,
    "version" => version,
    "created" => created,
    "modified" => modified,
});

/// Output license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub id: i64,
    pub name: String,
    pub uri: String,
    pub description: Option<String>,
    pub recommended: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

searchable!(License, Asc, {
    "name" => name,
    "created" => created,
});

/// Metadata standard an output can conform to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataStandard {
    pub id: i64,
    pub name: String,
    pub uri: String,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

searchable!(MetadataStandard, Asc, {
    "name" => name,
    "created" => created,
});

/// Research project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub abstract_text: Option<String>,
    pub is_test_project: bool,
    pub created_by_id: i64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

searchable!(Project, Desc, {
    "created" => created,
    "title" => title,
    "modified" => modified,
});

/// Data repository an output can be deposited in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub uri: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

searchable!(Repository, Asc, {
    "name" => name,
    "created" => created,
});

/// Research domain taxonomy entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchDomain {
    pub id: i64,
    pub name: String,
    pub uri: String,
    pub description: Option<String>,
    pub parent_research_domain_id: Option<i64>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

searchable!(ResearchDomain, Asc, {
    "name" => name,
    "created" => created,
});

/// Registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub given_name: Option<String>,
    pub sur_name: Option<String>,
    pub role: UserRole,
    pub affiliation_id: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Searchable for User {
    const SORT: SortSpec = SortSpec {
        allowed: &["surName", "email", "created"],
        default_field: "surName",
        default_direction: OrderDirection::Asc,
    };

    fn id(&self) -> i64 {
        self.id
    }

    // Storage orders by COALESCE(sur_name, ''), so a missing surname sorts as empty text.
    fn sort_value(&self, field: &str) -> SortValue {
        match field {
            "surName" => SortValue::Text(self.sur_name.clone().unwrap_or_default()),
            "email" => SortValue::from(&self.email),
            "created" => SortValue::from(&self.created),
            _ => SortValue::Null,
        }
    }
}

/// Section of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub template_id: i64,
    pub name: String,
    pub introduction: Option<String>,
    pub display_order: i32,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

searchable!(Section, Asc, {
    "displayOrder" => display_order,
    "name" => name,
    "created" => created,
});

// =============================================================================
// Association Parents
// =============================================================================

/// Many-to-many relationships edited through association sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    /// Contributor ↔ contributor role.
    ContributorRoles,
    /// Output ↔ repository.
    OutputRepositories,
    /// Output ↔ metadata standard.
    OutputMetadataStandards,
}

impl AssociationKind {
    /// Stable identifier for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContributorRoles => "contributor_roles",
            Self::OutputRepositories => "output_repositories",
            Self::OutputMetadataStandards => "output_metadata_standards",
        }
    }

    /// Plural noun of the related entity, for user-facing warnings.
    pub fn related_label(self) -> &'static str {
        match self {
            Self::ContributorRoles => "roles",
            Self::OutputRepositories => "repositories",
            Self::OutputMetadataStandards => "metadata standards",
        }
    }
}

/// A parent record exposing the ids of one of its relationships.
pub trait HasAssociationIds {
    /// Relationship the ids belong to.
    fn kind(&self) -> AssociationKind;

    /// Id of the parent record.
    fn parent_id(&self) -> i64;

    /// Ids currently linked to the parent.
    fn association_ids(&self) -> &[i64];
}

macro_rules! association_parent {
    ($(#[$meta:meta])* $name:ident, $kind:ident, $parent:ident, $ids:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub $parent: i64,
            pub $ids: Vec<i64>,
        }

        impl HasAssociationIds for $name {
            fn kind(&self) -> AssociationKind {
                AssociationKind::$kind
            }

            fn parent_id(&self) -> i64 {
                self.$parent
            }

            fn association_ids(&self) -> &[i64] {
                &self.$ids
            }
        }
    };
}

association_parent!(
    /// Roles held by a project contributor.
    ContributorRoles,
    ContributorRoles,
    project_contributor_id,
    role_ids
);

association_parent!(
    /// Repositories selected for a project output.
    OutputRepositories,
    OutputRepositories,
    project_output_id,
    repository_ids
);

association_parent!(
    /// Metadata standards selected for a project output.
    OutputMetadataStandards,
    OutputMetadataStandards,
    project_output_id,
    metadata_standard_ids
);

/// Person contributing to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContributor {
    pub id: i64,
    pub project_id: i64,
    pub given_name: Option<String>,
    pub sur_name: Option<String>,
    pub email: Option<String>,
    pub role_ids: Vec<i64>,
    pub modified: DateTime<Utc>,
}

impl ProjectContributor {
    /// The contributor's role relationship.
    pub fn roles(&self) -> ContributorRoles {
        ContributorRoles {
            project_contributor_id: self.id,
            role_ids: self.role_ids.clone(),
        }
    }
}

/// Research output planned for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectOutput {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub repository_ids: Vec<i64>,
    pub metadata_standard_ids: Vec<i64>,
    pub modified: DateTime<Utc>,
}

impl ProjectOutput {
    /// The output's repository relationship.
    pub fn repositories(&self) -> OutputRepositories {
        OutputRepositories {
            project_output_id: self.id,
            repository_ids: self.repository_ids.clone(),
        }
    }

    /// The output's metadata standard relationship.
    pub fn metadata_standards(&self) -> OutputMetadataStandards {
        OutputMetadataStandards {
            project_output_id: self.id,
            metadata_standard_ids: self.metadata_standard_ids.clone(),
        }
    }
}
