//! Taxonomía de errores del flujo de subida y su traducción a respuestas HTTP.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Failed to download PDF from URL: {0}")]
    Download(String),

    #[error("DOI not found in the PDF.")]
    DoiNotFound,

    #[error("Failed to extract text from the PDF.")]
    TextExtraction,

    #[error("Failed to fetch metadata for DOI {doi}.")]
    MetadataUnavailable { doi: String },

    #[error("An error occurred: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
