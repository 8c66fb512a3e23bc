use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use reqwest::Client;
use tokio::sync::oneshot;

use crate::{
    config::AppConfig, metadata::MetadataResolver, store::ArticleStore, summarizer::SummarizeText,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: ArticleStore,
    pub resolver: MetadataResolver,
    pub summarizer: Arc<dyn SummarizeText>,
    /// Cliente para descargar PDFs desde una URL (con su propio timeout).
    pub downloader: Client,
    pub status: Arc<Mutex<Status>>,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl AppState {
    pub fn new(config: AppConfig, summarizer: Arc<dyn SummarizeText>) -> Result<Self> {
        let downloader = Client::builder()
            .timeout(config.download_timeout)
            .user_agent(config.user_agent())
            .build()?;

        Ok(Self {
            store: ArticleStore::new(config.store_path.clone()),
            resolver: MetadataResolver::from_config(&config)?,
            summarizer,
            downloader,
            status: Arc::new(Mutex::new(Status::ready())),
            shutdown_sender: Arc::new(Mutex::new(None)),
            config,
        })
    }

    /// Actualiza el estado visible en `/api/status`.
    pub fn set_status(&self, is_busy: bool, message: impl Into<String>, progress: f32) {
        if let Ok(mut status) = self.status.lock() {
            status.is_busy = is_busy;
            status.message = message.into();
            status.progress = progress;
            status.updated_at = Utc::now().to_rfc3339();
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Status {
    pub is_busy: bool,
    pub message: String,
    pub progress: f32, // Valor entre 0.0 y 1.0
    pub updated_at: String,
}

impl Status {
    pub fn ready() -> Self {
        Self {
            is_busy: false,
            message: "Servidor listo.".to_string(),
            progress: 0.0,
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}
