// src/errors.rs
// DOCUMENTATION: Custom error types and HTTP responses
// PURPOSE: Centralized error handling for entire application

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

/// Application-specific error types
/// DOCUMENTATION: Comprehensive error enum for all possible failures
/// Each variant maps to appropriate HTTP status code and error response
#[derive(Error, Debug)]
pub enum RentalError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Storage error: {0}")]
    IoError(String),

    #[error("No images were ingested for this rental")]
    NoImagesIngested,

    #[error("Address not found: {0}")]
    UpstreamResolutionFailed(String),

    #[error("Address not found in {0}")]
    NoResultsInTargetCountry(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Internal server error")]
    InternalError,
}

impl RentalError {
    /// Machine-readable code included in every error body
    fn code(&self) -> &'static str {
        match self {
            RentalError::NotFound(_) => "NOT_FOUND",
            RentalError::DatabaseError(_) => "DATABASE_ERROR",
            RentalError::InvalidInput(_) => "INVALID_INPUT",
            RentalError::ValidationError(_) => "VALIDATION_ERROR",
            RentalError::Unauthorized => "UNAUTHORIZED",
            RentalError::DecodeError(_) => "IMAGE_DECODE_ERROR",
            RentalError::UnsupportedFormat(_) => "UNSUPPORTED_IMAGE_FORMAT",
            RentalError::IoError(_) => "STORAGE_ERROR",
            RentalError::NoImagesIngested => "NO_IMAGES_INGESTED",
            RentalError::UpstreamResolutionFailed(_) => "ADDRESS_NOT_FOUND",
            RentalError::NoResultsInTargetCountry(_) => "ADDRESS_NOT_FOUND",
            RentalError::ExternalApiError(_) => "EXTERNAL_API_ERROR",
            RentalError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            RentalError::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether the geocoder simply had no usable answer (as opposed to a
    /// transport or quota failure)
    pub fn is_address_not_found(&self) -> bool {
        matches!(
            self,
            RentalError::UpstreamResolutionFailed(_) | RentalError::NoResultsInTargetCountry(_)
        )
    }
}

/// Convert RentalError to HTTP response
/// DOCUMENTATION: Maps error types to HTTP status codes and JSON responses
impl ResponseError for RentalError {
    fn error_response(&self) -> HttpResponse {
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        });

        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            RentalError::NotFound(_) => StatusCode::NOT_FOUND,
            RentalError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RentalError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RentalError::ValidationError(_) => StatusCode::BAD_REQUEST,
            RentalError::Unauthorized => StatusCode::UNAUTHORIZED,
            RentalError::DecodeError(_) => StatusCode::BAD_REQUEST,
            RentalError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            RentalError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RentalError::NoImagesIngested => StatusCode::BAD_REQUEST,
            RentalError::UpstreamResolutionFailed(_) => StatusCode::NOT_FOUND,
            RentalError::NoResultsInTargetCountry(_) => StatusCode::NOT_FOUND,
            RentalError::ExternalApiError(_) => StatusCode::BAD_GATEWAY,
            RentalError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            RentalError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for RentalError {
    fn from(err: std::io::Error) -> Self {
        RentalError::IoError(err.to_string())
    }
}

impl From<image::ImageError> for RentalError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => RentalError::UnsupportedFormat(e.to_string()),
            image::ImageError::IoError(e) => RentalError::IoError(e.to_string()),
            other => RentalError::DecodeError(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for RentalError {
    fn from(err: validator::ValidationErrors) -> Self {
        RentalError::ValidationError(err.to_string())
    }
}

impl From<sqlx::Error> for RentalError {
    fn from(err: sqlx::Error) -> Self {
        RentalError::DatabaseError(err.to_string())
    }
}
