use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use super::auth::AuthManager;
use crate::catalog::{Catalog, Clock, Identity, ImageStore, Language};
use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::storage::StorageBackend;

/// Application state shared across handlers
pub struct AppState {
    pub catalog: Catalog,
    pub auth: AuthManager,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        db: Arc<DatabaseConnection>,
        storage: Arc<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let images = ImageStore::new(storage, config.max_image_bytes);
        Self {
            catalog: Catalog::new(db.clone(), images, clock.clone()),
            auth: AuthManager::new(db, clock, config.session_ttl),
            config,
        }
    }
}

fn auth_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// The caller, if the request carries valid credentials.
///
/// Bad credentials on a read are treated like none at all.
pub async fn current_identity(state: &AppState, headers: &HeaderMap) -> Result<Option<Identity>> {
    let Some(value) = auth_header(headers) else {
        return Ok(None);
    };
    match state.auth.identify(value).await {
        Ok(identity) => Ok(Some(identity)),
        Err(ServerError::AuthFailed) => Ok(None),
        Err(e) => Err(e),
    }
}

/// The caller of a mutating request.
pub async fn require_identity(state: &AppState, headers: &HeaderMap) -> Result<Identity> {
    let value = auth_header(headers).ok_or(ServerError::AuthRequired)?;
    state.auth.identify(value).await
}

/// Raw session token of a Bearer request.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    auth_header(headers)?.strip_prefix("Bearer ").map(str::trim)
}

#[derive(Debug, Default, Deserialize)]
pub struct LangQuery {
    pub lang: Option<String>,
}

pub fn request_language(query: &LangQuery, headers: &HeaderMap) -> Language {
    let accept = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok());
    Language::negotiate(query.lang.as_deref(), accept)
}

pub fn created<T: Serialize>(body: T) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

/// GET /media/:namespace/:key - serve a stored image
pub async fn media(
    State(state): State<Arc<AppState>>,
    Path((namespace, key)): Path<(String, String)>,
) -> Result<Response> {
    let (bytes, content_type) = state.catalog.images().open(&namespace, &key).await?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400")),
        ],
        bytes,
    )
        .into_response())
}

/// Health check endpoint
pub async fn health() -> Response {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_language() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_language(&LangQuery::default(), &headers), Language::French);

        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-GB,en;q=0.8"));
        assert_eq!(request_language(&LangQuery::default(), &headers), Language::English);

        let explicit = LangQuery {
            lang: Some("fr".into()),
        };
        assert_eq!(request_language(&explicit, &headers), Language::French);
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer rc_abc"));
        assert_eq!(bearer_token(&headers), Some("rc_abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);
    }
}
