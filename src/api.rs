use axum::{
    extract::{
        multipart::MultipartError, rejection::JsonRejection, DefaultBodyLimit, Json, Multipart, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::{
    app_state::{AppState, Status},
    error::PipelineError,
    models::ArticleRecord,
    pipeline::{self, ProcessedArticle, Submission},
};

/// Tamaño máximo aceptado para la subida de un PDF.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    let uploads = ServeDir::new(&app_state.config.upload_dir);
    let wordclouds = ServeDir::new(&app_state.config.wordcloud_dir);

    Router::new()
        .route("/upload", post(upload_handler))
        .route("/add_article", post(add_article_handler))
        .route("/api/articles", get(list_articles_handler))
        .route("/api/status", get(status_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .nest_service("/uploads", uploads)
        .nest_service("/wordclouds", wordclouds)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(app_state)
}

// --- Handlers ---

/// Recibe un PDF (campo `file`) o una URL (campo `url`) y lo procesa entero
/// antes de responder.
#[axum::debug_handler]
async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessedArticle>, PipelineError> {
    let mut submission: Option<Submission> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                if filename.is_empty() {
                    continue;
                }
                let bytes = field.bytes().await.map_err(multipart_error)?;
                submission = Some(Submission::Upload { filename, bytes });
            }
            "url" => {
                let url = field.text().await.map_err(multipart_error)?;
                // El fichero tiene prioridad sobre la URL.
                if !url.trim().is_empty() && submission.is_none() {
                    submission = Some(Submission::Url(url));
                }
            }
            _ => {}
        }
    }

    let submission = submission
        .ok_or_else(|| PipelineError::InvalidInput("No file or URL provided.".to_string()))?;

    pipeline::process_submission(&state, submission).await.map(Json)
}

/// Añade un artículo ya formado, sólo si su DOI no existe todavía.
#[axum::debug_handler]
async fn add_article_handler(
    State(state): State<AppState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let Json(payload) = payload.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("Failed to add article: {}", rejection.body_text())})),
        )
    })?;
    let article: ArticleRecord = serde_json::from_value(payload).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("Failed to add article: {}", e)})),
        )
    })?;

    let store = state.store.clone();
    let added = tokio::task::spawn_blocking(move || store.append_if_new(article))
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .and_then(|r| r)
        .map_err(|e| {
            error!("Error añadiendo artículo: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Failed to add article: {}", e)})),
            )
        })?;

    Ok(Json(json!({ "status": "success", "added": added })))
}

#[axum::debug_handler]
async fn list_articles_handler(State(state): State<AppState>) -> Json<Vec<ArticleRecord>> {
    Json(state.store.load())
}

#[axum::debug_handler]
async fn status_handler(State(state): State<AppState>) -> Json<Status> {
    let status = state
        .status
        .lock()
        .map(|s| s.clone())
        .unwrap_or_else(|poisoned| poisoned.into_inner().clone());
    Json(status)
}

#[axum::debug_handler]
async fn shutdown_handler(State(state): State<AppState>) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    if let Ok(mut sender) = state.shutdown_sender.lock() {
        if let Some(sender) = sender.take() {
            let _ = sender.send(());
        }
    }
    StatusCode::OK
}

fn multipart_error(error: MultipartError) -> PipelineError {
    PipelineError::InvalidInput(format!("Invalid upload: {}", error.body_text()))
}
