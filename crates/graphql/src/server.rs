//! GraphQL HTTP server.

use std::future::Future;

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Router,
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse},
    routing::get,
};
use tracing::{debug, info};

use dmplan_core::models::{Caller, UserRole};

use crate::types::DmplanSchema;

/// Header carrying the authenticated user id, set by the identity proxy.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated user's role.
pub const USER_ROLE_HEADER: &str = "x-user-role";
/// Header carrying the URI of the user's affiliation.
pub const AFFILIATION_HEADER: &str = "x-affiliation-uri";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_playground: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            enable_playground: true,
        }
    }
}

/// Start the GraphQL server with graceful shutdown support.
pub async fn serve_with_shutdown<F>(
    schema: DmplanSchema,
    config: ServerConfig,
    shutdown_signal: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let mut app = Router::new()
        .route("/graphql", get(graphql_playground).post(graphql_handler))
        .route("/health", get(health_check))
        .with_state(schema);

    if config.enable_playground {
        app = app.route("/", get(graphql_playground));
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("⚡ GraphQL server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
}

/// GraphQL query handler.
async fn graphql_handler(
    State(schema): State<DmplanSchema>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let mut req = req.into_inner();
    if let Some(caller) = caller_from_headers(&headers) {
        debug!(user_id = caller.user_id, role = caller.role.as_str(), "Authenticated request");
        req = req.data(caller);
    }
    schema.execute(req).await.into()
}

/// Resolve the caller from identity headers.
///
/// Without a valid user id the request is anonymous. An unknown role
/// falls back to the least privileged one.
pub fn caller_from_headers(headers: &HeaderMap) -> Option<Caller> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let user_id = header(USER_ID_HEADER)?.parse::<i64>().ok()?;
    let role = header(USER_ROLE_HEADER)
        .and_then(UserRole::parse)
        .unwrap_or_default();

    Some(Caller {
        user_id,
        role,
        affiliation_uri: header(AFFILIATION_HEADER).map(str::to_string),
    })
}

/// GraphQL Playground UI.
async fn graphql_playground() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_full_identity() {
        let caller = caller_from_headers(&headers(&[
            (USER_ID_HEADER, "42"),
            (USER_ROLE_HEADER, "admin"),
            (AFFILIATION_HEADER, "https://ror.org/03yrm5c26"),
        ]))
        .unwrap();

        assert_eq!(caller.user_id, 42);
        assert_eq!(caller.role, UserRole::Admin);
        assert_eq!(caller.affiliation_uri.as_deref(), Some("https://ror.org/03yrm5c26"));
    }

    // Test critique: un rôle inconnu ne donne jamais plus que RESEARCHER
    #[test]
    fn test_unknown_role_is_least_privileged() {
        let caller =
            caller_from_headers(&headers(&[(USER_ID_HEADER, "7"), (USER_ROLE_HEADER, "root")]))
                .unwrap();
        assert_eq!(caller.role, UserRole::Researcher);
        assert_eq!(caller.affiliation_uri, None);
    }

    #[test]
    fn test_missing_or_invalid_user_id_is_anonymous() {
        assert_eq!(caller_from_headers(&HeaderMap::new()), None);
        assert_eq!(caller_from_headers(&headers(&[(USER_ID_HEADER, "abc")])), None);
        assert_eq!(
            caller_from_headers(&headers(&[(USER_ID_HEADER, "  "), (USER_ROLE_HEADER, "ADMIN")])),
            None
        );
    }

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, "OK");
    }
}
