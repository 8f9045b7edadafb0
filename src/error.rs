use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

use crate::storage::StorageError;

/// A single user-facing problem with one input field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every field error found in one submission, in the order they were found.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.message.as_str())
    }

    /// `Ok(())` when nothing was collected, otherwise the whole list as one error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServerError::Validation(self))
        }
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(e: FieldError) -> Self {
        Self(vec![e])
    }
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Validation failed")]
    Validation(ValidationErrors),

    #[error("{}", .0.message)]
    Conflict(FieldError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Authentication failed")]
    AuthFailed,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::AuthRequired => StatusCode::UNAUTHORIZED,
            ServerError::AuthFailed => StatusCode::UNAUTHORIZED,
            ServerError::PermissionDenied => StatusCode::FORBIDDEN,
            ServerError::Storage(_)
            | ServerError::Database(_)
            | ServerError::Internal(_)
            | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ServerError::Validation(errors) => ErrorBody {
                error: self.to_string(),
                errors: Some(&errors.0),
            },
            ServerError::Conflict(e) => ErrorBody {
                error: self.to_string(),
                errors: Some(std::slice::from_ref(e)),
            },
            ServerError::Storage(_)
            | ServerError::Database(_)
            | ServerError::Internal(_)
            | ServerError::Config(_) => {
                tracing::error!("{}", self);
                ErrorBody {
                    error: "Internal server error".to_string(),
                    errors: None,
                }
            }
            _ => ErrorBody {
                error: self.to_string(),
                errors: None,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, ServerError::AuthRequired) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"Recipe Catalog\""),
            );
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_errors_pass() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_collected_errors_keep_order() {
        let mut errors = ValidationErrors::new();
        errors.push("title", "Title is required.");
        errors.push("ingredients", "At least one ingredient is required.");

        match errors.into_result() {
            Err(ServerError::Validation(errors)) => {
                let messages: Vec<_> = errors.messages().collect();
                assert_eq!(
                    messages,
                    vec!["Title is required.", "At least one ingredient is required."]
                );
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServerError::Validation(ValidationErrors::new()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServerError::Conflict(FieldError::new("name", "dup")).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ServerError::NotFound("Recipe 3".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ServerError::PermissionDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(ServerError::AuthRequired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ServerError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_conflict_display_is_message() {
        let err = ServerError::Conflict(FieldError::new("name", "A unit named \"g\" already exists."));
        assert_eq!(err.to_string(), "A unit named \"g\" already exists.");
    }
}
