//! Error types for the registry API layer.
//!
//! [`ApiError`] folds registry, sequencing and storage failures into the
//! outcome kinds a caller sees, and converts into an Axum HTTP response
//! via its [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use simdeck_core::{RegistryError, SequenceError};
use simdeck_store::StoreError;
use tracing::{error, warn};

/// Errors that can occur in the registry API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Required input is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// No simulation carries the requested name.
    #[error("{0}")]
    NotFound(String),

    /// The requested type has no bucket.
    #[error("{0}")]
    TypeNotFound(String),

    /// The name is already used by another simulation.
    #[error("{0}")]
    DuplicateName(String),

    /// The start index of a file range is after its end index.
    #[error("{0}")]
    InvalidRange(String),

    /// A file name carries no numeric index.
    #[error("{0}")]
    MalformedFilename(String),

    /// A file expected in the store is absent.
    #[error("{0}")]
    FileNotFound(String),

    /// The request body exceeds the configured limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// The registry document or file store cannot be read or written.
    #[error("{0}")]
    StorageUnavailable(String),

    /// An unexpected internal failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Outcome kind reported in the response body.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::NotFound(_) => "NotFound",
            Self::TypeNotFound(_) => "TypeNotFound",
            Self::DuplicateName(_) => "DuplicateName",
            Self::InvalidRange(_) => "InvalidRange",
            Self::MalformedFilename(_) => "MalformedFilename",
            Self::FileNotFound(_) => "FileNotFound",
            Self::PayloadTooLarge(_) => "PayloadTooLarge",
            Self::StorageUnavailable(_) => "StorageUnavailable",
            Self::Internal(_) => "Internal",
        }
    }

    /// HTTP status for this outcome.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidRange(_) | Self::MalformedFilename(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) | Self::FileNotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateName(_) => StatusCode::CONFLICT,
            Self::TypeNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SequenceError> for ApiError {
    fn from(e: SequenceError) -> Self {
        match e {
            SequenceError::MalformedFilename(_) => Self::MalformedFilename(e.to_string()),
            SequenceError::InvalidRange { .. } => Self::InvalidRange(e.to_string()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::MissingField(field) => {
                Self::Validation(format!("Simulation {field} is required."))
            }
            RegistryError::TypeNotFound(sim_type) => {
                Self::TypeNotFound(format!("Simulation type '{sim_type}' not found."))
            }
            RegistryError::NotFound(name) => {
                Self::NotFound(format!("Simulation '{name}' not found."))
            }
            RegistryError::DuplicateName(name) => {
                Self::DuplicateName(format!("Simulation '{name}' already exists."))
            }
            RegistryError::Sequence(e) => e.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::StorageUnavailable { .. } | StoreError::MalformedDocument { .. } => {
                Self::StorageUnavailable(e.to_string())
            }
            StoreError::FileNotFound(_) => Self::FileNotFound(e.to_string()),
            StoreError::InvalidFileName(_) => Self::Validation(e.to_string()),
            StoreError::Encode(_) | StoreError::Unreadable { .. } => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!(kind = self.kind(), status = status.as_u16(), error = %message, "Request failed");
        } else {
            warn!(kind = self.kind(), status = status.as_u16(), error = %message, "Request rejected");
        }

        let body = serde_json::json!({
            "error": message,
            "kind": self.kind(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_errors_map_to_outcome_kinds() {
        let cases = [
            (RegistryError::MissingField("name"), StatusCode::BAD_REQUEST),
            (RegistryError::NotFound("a".to_owned()), StatusCode::NOT_FOUND),
            (RegistryError::TypeNotFound("wind".to_owned()), StatusCode::UNPROCESSABLE_ENTITY),
            (RegistryError::DuplicateName("a".to_owned()), StatusCode::CONFLICT),
            (
                RegistryError::Sequence(SequenceError::InvalidRange { start: 7, end: 3 }),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = ApiError::from(StoreError::FileNotFound("temp-4.json".to_owned()));
        assert_eq!(err.kind(), "FileNotFound");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn storage_failure_is_service_unavailable() {
        let err = ApiError::from(StoreError::unavailable(
            "db.json",
            std::io::Error::other("disk gone"),
        ));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn not_found_message_names_the_simulation() {
        let err = ApiError::from(RegistryError::NotFound("heat-run".to_owned()));
        assert_eq!(err.to_string(), "Simulation 'heat-run' not found.");
    }
}
