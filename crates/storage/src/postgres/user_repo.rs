//! User table.

use chrono::{DateTime, Utc};

use dmplan_core::error::StorageResult;
use dmplan_core::models::User;

use super::helpers::str_to_role;
use super::search_repo::{SearchRow, TableSpec};

#[derive(sqlx::FromRow)]
pub struct UserRow {
    id: i64,
    email: String,
    given_name: Option<String>,
    sur_name: Option<String>,
    role: String,
    affiliation_id: Option<String>,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl SearchRow for UserRow {
    type Entity = User;

    // A missing surname sorts as empty text, matching `User::sort_value`
    const TABLE: TableSpec = TableSpec {
        from: "users u",
        select: "u.id, u.email, u.given_name, u.sur_name, u.role, u.affiliation_id, \
                 u.created, u.modified",
        id_column: "u.id",
        term_columns: &["u.email", "u.given_name", "u.sur_name"],
        owner_column: None,
        best_practice_column: None,
        affiliation_column: Some("u.affiliation_id"),
        creator_column: None,
        parent_column: None,
        fixed_predicate: None,
        sort_columns: &[
            ("surName", "COALESCE(u.sur_name, '')"),
            ("email", "u.email"),
            ("created", "u.created"),
        ],
    };

    fn into_entity(self) -> StorageResult<User> {
        Ok(User {
            id: self.id,
            email: self.email,
            given_name: self.given_name,
            sur_name: self.sur_name,
            role: str_to_role(&self.role, "user.role")?,
            affiliation_id: self.affiliation_id,
            created: self.created,
            modified: self.modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postgres::search_repo::assert_sort_columns_cover;
    use dmplan_core::models::UserRole;

    fn row(role: &str) -> UserRow {
        UserRow {
            id: 1,
            email: "ada@example.org".into(),
            given_name: Some("Ada".into()),
            sur_name: None,
            role: role.into(),
            affiliation_id: None,
            created: Utc::now(),
            modified: Utc::now(),
        }
    }

    #[test]
    fn test_sort_columns_cover_allowed_fields() {
        assert_sort_columns_cover::<UserRow>();
    }

    #[test]
    fn test_row_conversion() {
        assert_eq!(row("SUPERADMIN").into_entity().unwrap().role, UserRole::SuperAdmin);
        assert!(row("GUEST").into_entity().is_err());
    }
}
