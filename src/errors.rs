// src/errors.rs
// DOCUMENTATION: Custom error types and HTTP responses
// PURPOSE: Centralized error handling for entire application

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

/// Application-specific error types
/// DOCUMENTATION: Every failure the service can surface to a caller.
/// Repository-level failures are wrapped into one of these at the service
/// boundary; sqlx's native error type never leaks out of this crate.
#[derive(Error, Debug)]
pub enum ListingsError {
    /// Malformed or missing required input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity absent. First field is the entity kind ("place", "user",
    /// "places") so each kind gets a distinct error code.
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// Requester is not the creator of the place being mutated
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Address could not be resolved to coordinates
    #[error("Geocoding failed: {0}")]
    Geocode(String),

    /// Multi-record write could not complete atomically; the caller must
    /// retry the whole operation, never resume partially
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Wrapped storage failure
    #[error("Database error: {0}")]
    Database(String),
}

/// Convert ListingsError to HTTP response
/// DOCUMENTATION: Maps error types to HTTP status codes and JSON responses
impl ResponseError for ListingsError {
    fn error_response(&self) -> HttpResponse {
        let error_code = match self {
            ListingsError::Validation(_) => "VALIDATION_ERROR".to_string(),
            ListingsError::NotFound(entity, _) => {
                format!("{}_NOT_FOUND", entity.to_uppercase())
            }
            ListingsError::Forbidden(_) => "FORBIDDEN".to_string(),
            ListingsError::Geocode(_) => "GEOCODE_FAILED".to_string(),
            ListingsError::Transaction(_) => "TRANSACTION_FAILED".to_string(),
            ListingsError::Database(_) => "DATABASE_ERROR".to_string(),
        };

        let body = json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        });

        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ListingsError::Validation(_) => StatusCode::BAD_REQUEST,
            ListingsError::NotFound(_, _) => StatusCode::NOT_FOUND,
            ListingsError::Forbidden(_) => StatusCode::FORBIDDEN,
            // Bad input in substance, even though an external dependency
            // does the resolving
            ListingsError::Geocode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ListingsError::Transaction(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ListingsError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_codes_are_distinct_per_entity() {
        let place = ListingsError::NotFound("place", "p1".into());
        let user = ListingsError::NotFound("user", "u1".into());

        assert_eq!(place.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(user.status_code(), StatusCode::NOT_FOUND);
        assert!(place.to_string().contains("place"));
        assert!(user.to_string().contains("user"));
    }

    #[test]
    fn geocode_maps_to_unprocessable_entity() {
        let err = ListingsError::Geocode("no results".into());
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
