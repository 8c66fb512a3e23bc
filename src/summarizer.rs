//! Generación del resumen del artículo.
//!
//! El texto se corta en trozos fijos de 500 caracteres y sólo se resumen los
//! dos primeros; los resúmenes parciales se concatenan con un espacio. Un
//! fallo nunca detiene la petición: se devuelve un texto de reserva y un
//! estado de error.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::llm::LlmManager;

pub const CHUNK_SIZE: usize = 500;
pub const MAX_CHUNKS: usize = 2;
pub const FALLBACK_SUMMARY: &str = "Summary could not be generated.";
pub const SUCCESS_STATUS: &str = "Summarization completed";

/// Resultado del resumen: texto + estado legible.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOutcome {
    pub summary: String,
    pub status: String,
}

impl SummaryOutcome {
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            summary: FALLBACK_SUMMARY.to_string(),
            status: format!("Error: {reason}"),
        }
    }
}

/// Modelo capaz de resumir un fragmento.
#[async_trait]
pub trait ChunkSummarizer: Send + Sync {
    async fn summarize_chunk(&self, chunk: &str, max_length: usize, min_length: usize) -> Result<String>;
}

#[async_trait]
impl ChunkSummarizer for LlmManager {
    async fn summarize_chunk(&self, chunk: &str, max_length: usize, min_length: usize) -> Result<String> {
        LlmManager::summarize_chunk(self, chunk, max_length, min_length).await
    }
}

/// Resumidor configurado: modelo + longitudes + timeout global.
#[derive(Clone)]
pub struct Summarizer<M> {
    model: M,
    max_length: usize,
    min_length: usize,
    timeout: Duration,
}

impl<M: ChunkSummarizer> Summarizer<M> {
    pub fn new(model: M, max_length: usize, min_length: usize, timeout: Duration) -> Self {
        Self { model, max_length, min_length, timeout }
    }

    /// Resume `text`. Nunca falla: los errores degradan a [`SummaryOutcome::failed`].
    pub async fn summarize(&self, text: &str) -> SummaryOutcome {
        match tokio::time::timeout(self.timeout, self.summarize_chunks(text)).await {
            Ok(Ok(summary)) => {
                info!("Resumen generado ({} caracteres)", summary.len());
                SummaryOutcome { summary, status: SUCCESS_STATUS.to_string() }
            }
            Ok(Err(e)) => {
                warn!("Error generando el resumen: {}", e);
                SummaryOutcome::failed(e)
            }
            Err(_) => {
                warn!("El resumen superó el tiempo máximo de {:?}", self.timeout);
                SummaryOutcome::failed(format!("summarization timed out after {:?}", self.timeout))
            }
        }
    }

    async fn summarize_chunks(&self, text: &str) -> Result<String> {
        let mut summaries = Vec::new();
        for chunk in split_chunks(text, CHUNK_SIZE).into_iter().take(MAX_CHUNKS) {
            let summary = self
                .model
                .summarize_chunk(&chunk, self.max_length, self.min_length)
                .await?;
            summaries.push(summary);
        }
        Ok(summaries.join(" "))
    }
}

/// Trozos consecutivos de `size` caracteres (no bytes).
pub fn split_chunks(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size.max(1)).map(|c| c.iter().collect()).collect()
}

/// Resumidor con despacho dinámico, para guardarlo en el estado compartido.
#[async_trait]
pub trait SummarizeText: Send + Sync {
    async fn summarize(&self, text: &str) -> SummaryOutcome;
}

#[async_trait]
impl<M: ChunkSummarizer> SummarizeText for Summarizer<M> {
    async fn summarize(&self, text: &str) -> SummaryOutcome {
        Summarizer::summarize(self, text).await
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::EchoModel;
    use super::*;
    use std::sync::atomic::Ordering;

    fn summarizer(model: EchoModel) -> Summarizer<EchoModel> {
        Summarizer::new(model, 150, 50, Duration::from_secs(5))
    }

    #[test]
    fn chunks_are_character_based() {
        let text = "é".repeat(1001);
        let chunks = split_chunks(&text, CHUNK_SIZE);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 500);
        assert_eq!(chunks[2].chars().count(), 1);
        assert!(split_chunks("", CHUNK_SIZE).is_empty());
    }

    #[tokio::test]
    async fn only_first_two_chunks_are_summarized() {
        let model = EchoModel::default();
        let text = format!("{}{}{}", "a".repeat(500), "b".repeat(500), "c".repeat(500));
        let outcome = summarizer(model.clone()).summarize(&text).await;

        assert_eq!(outcome.summary, "<aaaaa> <bbbbb>");
        assert_eq!(outcome.status, SUCCESS_STATUS);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn model_failure_degrades_to_placeholder() {
        let model = EchoModel { fail: true, ..Default::default() };
        let outcome = summarizer(model).summarize("some text").await;

        assert_eq!(outcome.summary, FALLBACK_SUMMARY);
        assert_eq!(outcome.status, "Error: model not loaded");
    }

    #[tokio::test]
    async fn unsupported_provider_degrades_too() {
        let mut cfg = crate::config::AppConfig::from_lookup(|_| None).unwrap();
        cfg.llm_provider = crate::config::LlmProvider::Gemini;
        let llm = LlmManager::from_config(&cfg).unwrap();
        let outcome = Summarizer::new(llm, 150, 50, Duration::from_secs(5))
            .summarize("text")
            .await;

        assert_eq!(outcome.summary, FALLBACK_SUMMARY);
        assert!(outcome.status.starts_with("Error: "));
    }
}
