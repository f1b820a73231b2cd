//! GraphQL API for dmplan.
//!
//! Exposes paginated searches over the planning catalog and mutations
//! that edit project relationships.
//!
//! ```ignore
//! use dmplan_graphql::{build_schema, serve_with_shutdown, ServerConfig};
//!
//! let schema = build_schema(repositories, engine);
//! serve_with_shutdown(schema, ServerConfig::default(), shutdown).await?;
//! ```

mod schema;
mod server;
mod types;

pub use schema::{
    MAX_QUERY_COMPLEXITY, MAX_QUERY_DEPTH, MutationRoot, QueryRoot, build_schema, schema_builder,
};
pub use server::{
    AFFILIATION_HEADER, ServerConfig, USER_ID_HEADER, USER_ROLE_HEADER, caller_from_headers,
    serve_with_shutdown,
};
pub use types::{DmplanSchema, PaginationOptionsInput, PaginationType};
