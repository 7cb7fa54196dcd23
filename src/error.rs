// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::convert::ConversionError;
use crate::database::DatabaseError;
use crate::entity::ValidationErrors;
use crate::models::{ChangeTypeError, PrivLevelError, RequestStatusError};
use crate::tenancy::{StoreError, TenancyError};

/// Who is at fault for a failure.
///
/// User errors are safe to show to the caller. System errors are logged and
/// replaced by a generic message before they leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    User,
    System,
}

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        if self.status_code() >= 500 {
            ErrorKind::System
        } else {
            ErrorKind::User
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError {
                message,
                field_errors,
            } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });

                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }

                response
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

const GENERIC_MESSAGE: &str = "An error occurred while processing your request";

impl From<TenancyError> for ApiError {
    fn from(err: TenancyError) -> Self {
        match err {
            TenancyError::Forbidden { .. } => ApiError::forbidden(err.to_string()),
            TenancyError::ResourceNotFound { .. } => ApiError::not_found(err.to_string()),
            TenancyError::NoSuchDeliveryService(_) => ApiError::bad_request(err.to_string()),
            TenancyError::Store(store_err) => store_err.into(),
            TenancyError::UserTenantMissing(_) | TenancyError::TenantUnassigned { .. } => {
                // Log the real error but return generic message
                tracing::error!("Tenancy error: {}", err);
                ApiError::internal_server_error(GENERIC_MESSAGE)
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Tenant store error: {}", err);
        ApiError::internal_server_error(GENERIC_MESSAGE)
    }
}

impl From<ConversionError> for ApiError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::InvalidBody { .. } => ApiError::invalid_json(err.to_string()),
            ConversionError::UnsupportedVersion { .. } => ApiError::not_found(err.to_string()),
            ConversionError::Structural { field, .. } | ConversionError::InvalidField { field, .. } => {
                let mut field_errors = HashMap::new();
                field_errors.insert(field.to_string(), err.to_string());
                ApiError::validation_error("Invalid field format", Some(field_errors))
            }
            ConversionError::Encode { .. } => {
                tracing::error!("Conversion error: {}", err);
                ApiError::internal_server_error("Failed to format response")
            }
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        let field_errors = err
            .fields()
            .iter()
            .map(|(field, msg)| (field.to_string(), msg.clone()))
            .collect();
        ApiError::validation_error(err.to_string(), Some(field_errors))
    }
}

impl From<RequestStatusError> for ApiError {
    fn from(err: RequestStatusError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<ChangeTypeError> for ApiError {
    fn from(err: ChangeTypeError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<PrivLevelError> for ApiError {
    fn from(err: PrivLevelError) -> Self {
        ApiError::forbidden(err.to_string())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
            other => {
                tracing::error!("Database configuration error: {}", other);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::EntityKind;
    use crate::types::ApiVersion;

    #[test]
    fn denial_is_a_403_with_its_message() {
        let err: ApiError = TenancyError::Forbidden {
            user_tenant_id: 2,
            resource_tenant_id: 9,
        }
        .into();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.kind(), ErrorKind::User);
        assert_eq!(err.message(), "Access to this resource is not authorized");
    }

    #[test]
    fn system_errors_are_masked() {
        let err: ApiError = TenancyError::Store(StoreError::Corrupt("cycle at 7".into())).into();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.kind(), ErrorKind::System);
        assert!(!err.message().contains("cycle"));

        let err: ApiError = TenancyError::UserTenantMissing(4).into();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn structural_conversion_names_the_field() {
        let err: ApiError = ConversionError::structural("server", "interfaceName").into();
        assert_eq!(err.status_code(), 400);
        let body = err.to_json();
        assert!(body["field_errors"]["interfaceName"].is_string());
    }

    #[test]
    fn unsupported_version_is_not_found() {
        let err: ApiError = ConversionError::UnsupportedVersion {
            kind: EntityKind::Role,
            version: ApiVersion::new(7, 0),
        }
        .into();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn validation_errors_keep_fields() {
        let mut errs = ValidationErrors::new();
        errs.add("name", "cannot be blank");
        let err: ApiError = errs.into();
        assert_eq!(err.to_json()["field_errors"]["name"], "cannot be blank");
    }

    #[test]
    fn responds_with_matching_status() {
        let response = ApiError::from(PrivLevelError { requested: 30, acting: 20 }).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = ApiError::invalid_json("bad body").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
