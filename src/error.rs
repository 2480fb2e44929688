//! Error types shared by the color model and the file-update endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building colors and ramps.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    /// Not a `#rrggbb` string.
    #[error("Invalid hex color: {0}")]
    InvalidHex(String),

    /// A ramp needs at least two anchors to interpolate between.
    #[error("Color ramp needs at least 2 anchors, got {0}")]
    RampTooShort(usize),
}

/// Rejections of the dataset update endpoint.
///
/// Every variant maps to exactly one HTTP status; the message is what the
/// caller sees in the `error` field of the JSON body.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Authorization header missing or invalid.")]
    MissingAuthorization,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("Method Not Allowed. Only POST is accepted.")]
    MethodNotAllowed,

    #[error("Invalid file key specified. Allowed keys: {}", allowed.join(", "))]
    UnknownFile { allowed: Vec<String> },

    #[error("Invalid JSON provided. {0}")]
    InvalidJson(String),

    #[error("Validation template file not found: {}", .0.display())]
    TemplateMissing(PathBuf),

    #[error("Could not parse validation template JSON: {}", .0.display())]
    TemplateUnparseable(PathBuf),

    #[error("JSON structure does not match the expected template.")]
    StructureMismatch,

    #[error("Failed to write to file: {}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UpdateError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingAuthorization | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnknownFile { .. } | Self::InvalidJson(_) | Self::StructureMismatch => {
                StatusCode::BAD_REQUEST
            }
            Self::TemplateMissing(_) | Self::TemplateUnparseable(_) | Self::WriteFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for UpdateError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
