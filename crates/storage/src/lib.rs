//! Storage layer for the dmplan API.
//!
//! This crate provides PostgreSQL implementations of the port traits
//! defined in `dmplan-core`: connection pooling, migrations, paginated
//! searches and join-table edits.
//!
//! # Architecture
//!
//! The storage layer follows the repository pattern:
//!
//! - [`postgres::Database`] - Connection pool management
//! - [`postgres::PgRepositories`] - Composite repository for all entity types
//! - [`postgres::PgSearchRepository`] - Generic keyset/offset search over one table
//! - [`postgres::PgAssociationRepository`] - Join-table store for one relationship
//!
//! # Usage
//!
//! ```ignore
//! use dmplan_storage::{Database, DatabaseConfig, PgRepositories};
//!
//! // Connect to the database
//! let config = DatabaseConfig::for_api(&database_url);
//! let db = Database::connect(&config).await?;
//!
//! // Run migrations
//! db.migrate().await?;
//!
//! // Create repositories
//! let repositories = Arc::new(PgRepositories::new(&db));
//! ```

pub mod postgres;

pub use postgres::{Database, DatabaseConfig, PgRepositories};
