//! Orquestación de una subida: obtener el PDF, extraer el DOI, resolver los
//! metadatos, resumir, puntuar y guardar el artículo.
//!
//! Si cualquier paso falla después de guardar el PDF, el fichero se borra y
//! no se persiste ningún registro parcial.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use axum::body::Bytes;
use serde::Serialize;
use serde_json::Map;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    app_state::AppState,
    doi,
    error::PipelineError,
    models::{ArticleRecord, MetadataRecord},
    pdf, scoring,
};

const DEFAULT_DOWNLOAD_NAME: &str = "downloaded.pdf";
const TOTAL_STEPS: f32 = 6.0;

/// Origen del PDF.
#[derive(Debug)]
pub enum Submission {
    Upload { filename: String, bytes: Bytes },
    Url(String),
}

/// Respuesta de una subida correcta.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedArticle {
    pub doi: String,
    pub metadata: MetadataRecord,
    pub summary: String,
    pub summary_status: String,
    pub pdf_path: String,
    pub engagement_score: f64,
}

/// Procesa una subida completa de forma secuencial.
pub async fn process_submission(
    state: &AppState,
    submission: Submission,
) -> Result<ProcessedArticle, PipelineError> {
    state.set_status(true, "Obteniendo el PDF...", 0.0);

    let result = match store_pdf(state, submission).await {
        Ok(pdf_path) => {
            let analyzed = analyze(state, &pdf_path).await;
            if analyzed.is_err() {
                discard_pdf(&pdf_path).await;
            }
            analyzed
        }
        Err(e) => Err(e),
    };

    match &result {
        Ok(article) => state.set_status(false, format!("¡Artículo {} procesado!", article.doi), 0.0),
        Err(e) => {
            error!("Error en la subida: {}", e);
            state.set_status(false, format!("Error: {e}"), 0.0);
        }
    }
    result
}

async fn analyze(state: &AppState, pdf_path: &Path) -> Result<ProcessedArticle, PipelineError> {
    let pdf_display = pdf_path.display().to_string();

    // 1) DOI
    step(state, 1.0, format!("Extrayendo DOI de {pdf_display}..."));
    let doi = pdf::run_blocking(pdf_path.to_path_buf(), |path| Ok(doi::extract_doi(path)))
        .await?
        .ok_or(PipelineError::DoiNotFound)?;
    info!("DOI extraído de {}: {}", pdf_display, doi);

    // 2) Metadatos
    step(state, 2.0, format!("Obteniendo metadatos para el DOI {doi}..."));
    let metadata = state
        .resolver
        .resolve(&doi, pdf_path)
        .await
        .map_err(|e| {
            warn!("Sin metadatos para {}: {}", doi, e);
            PipelineError::MetadataUnavailable { doi: doi.clone() }
        })?;

    // 3) Texto completo
    step(state, 3.0, "Extrayendo texto para el resumen...");
    let text = pdf::run_blocking(pdf_path.to_path_buf(), pdf::extract_full_text)
        .await
        .map_err(|e| {
            warn!("No se pudo extraer el texto de {}: {}", pdf_display, e);
            PipelineError::TextExtraction
        })?
        .ok_or(PipelineError::TextExtraction)?;

    // 4) Resumen (nunca falla la petición)
    step(state, 4.0, "Generando resumen...");
    let summary = state.summarizer.summarize(&text).await;

    // 5) Puntuación
    step(state, 5.0, "Calculando puntuación...");
    let engagement_score = scoring::engagement_score(&metadata);

    // 6) Persistencia
    step(state, 6.0, "Guardando artículo...");
    let pdf_path_str = pdf_path.to_string_lossy().to_string();
    let record = ArticleRecord {
        doi: doi.clone(),
        metadata: metadata.clone(),
        summary: summary.summary.clone(),
        pdf_path: Some(pdf_path_str.clone()),
        engagement_score: Some(engagement_score),
        extra: Map::new(),
    };
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || store.append_unconditional(record))
        .await
        .map_err(|e| anyhow!("La tarea de guardado terminó de forma abrupta: {e}"))??;

    info!("Artículo {} guardado (puntuación {})", doi, engagement_score);
    Ok(ProcessedArticle {
        doi,
        metadata,
        summary: summary.summary,
        summary_status: summary.status,
        pdf_path: pdf_path_str,
        engagement_score,
    })
}

fn step(state: &AppState, n: f32, message: impl Into<String>) {
    state.set_status(true, message, n / TOTAL_STEPS);
}

/// Guarda el PDF subido o descargado en `upload_dir` y devuelve su ruta.
async fn store_pdf(state: &AppState, submission: Submission) -> Result<PathBuf, PipelineError> {
    let (filename, bytes) = match submission {
        Submission::Upload { filename, bytes } => {
            if !has_pdf_extension(&filename) {
                return Err(PipelineError::InvalidInput(
                    "Invalid file format. Please upload a PDF.".to_string(),
                ));
            }
            (filename, bytes)
        }
        Submission::Url(url) => download_pdf(state, &url).await?,
    };

    let upload_dir = &state.config.upload_dir;
    tokio::fs::create_dir_all(upload_dir)
        .await
        .with_context(|| format!("No se pudo crear {}", upload_dir.display()))?;

    let path = unique_upload_path(upload_dir, &filename);
    if let Err(e) = tokio::fs::write(&path, &bytes).await {
        discard_pdf(&path).await;
        return Err(anyhow!("No se pudo guardar {}: {}", path.display(), e).into());
    }
    info!("PDF guardado en {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

async fn download_pdf(state: &AppState, raw_url: &str) -> Result<(String, Bytes), PipelineError> {
    let url = Url::parse(raw_url.trim()).map_err(|e| PipelineError::Download(e.to_string()))?;
    info!("Descargando PDF desde {}", url);

    let response = state
        .downloader
        .get(url.clone())
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| PipelineError::Download(e.to_string()))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| PipelineError::Download(e.to_string()))?;

    Ok((filename_from_url(&url), bytes))
}

/// Último segmento de la ruta de la URL, o `downloaded.pdf`.
pub fn filename_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(String::from)
        .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string())
}

pub fn has_pdf_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Ruta dentro de `upload_dir` usando sólo el nombre base; si ya existe un
/// fichero con ese nombre se añade un sufijo aleatorio.
pub fn unique_upload_path(upload_dir: &Path, filename: &str) -> PathBuf {
    let base = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty() && n != "." && n != "..")
        .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string());

    let candidate = upload_dir.join(&base);
    if !candidate.exists() {
        return candidate;
    }

    let stem = Path::new(&base)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    let suffix = Uuid::new_v4().simple().to_string();
    let extension = Path::new(&base)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    upload_dir.join(format!("{stem}-{}{extension}", &suffix[..8]))
}

async fn discard_pdf(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!("PDF eliminado tras el error: {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("No se pudo eliminar {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(has_pdf_extension("paper.pdf"));
        assert!(has_pdf_extension("PAPER.PDF"));
        assert!(!has_pdf_extension("paper.docx"));
        assert!(!has_pdf_extension("pdf"));
    }

    #[test]
    fn url_filenames() {
        let url = Url::parse("https://host.org/files/paper%201.pdf?x=1").unwrap();
        assert_eq!(filename_from_url(&url), "paper%201.pdf");
        let bare = Url::parse("https://host.org/").unwrap();
        assert_eq!(filename_from_url(&bare), DEFAULT_DOWNLOAD_NAME);
    }

    #[test]
    fn upload_paths_stay_inside_the_directory_and_do_not_clobber() {
        let dir = tempdir().unwrap();
        let path = unique_upload_path(dir.path(), "../../etc/evil.pdf");
        assert_eq!(path, dir.path().join("evil.pdf"));

        std::fs::write(&path, b"x").unwrap();
        let second = unique_upload_path(dir.path(), "evil.pdf");
        assert_ne!(second, path);
        assert_eq!(second.parent(), Some(dir.path()));
        assert!(second.to_string_lossy().ends_with(".pdf"));
    }
}
