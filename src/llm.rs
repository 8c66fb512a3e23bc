//! Abstracción sobre Rig para trabajar con distintos proveedores de LLM.
//! De momento se implementa OpenAI; Gemini/Ollama quedan preparados para el futuro.

use std::env;

use crate::config::{AppConfig, LlmProvider};
use anyhow::{anyhow, Result};
use rig::completion::Prompt;

/// Gestor de LLMs usado para generar resúmenes.
#[derive(Debug, Clone)]
pub struct LlmManager {
    pub provider: LlmProvider,
    pub chat_model: String,
}

impl LlmManager {
    /// Construye el manager a partir de la configuración.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        Ok(Self {
            provider: cfg.llm_provider.clone(),
            chat_model: cfg.llm_chat_model.clone(),
        })
    }

    /// Resume un fragmento de texto con una longitud orientativa en palabras.
    pub async fn summarize_chunk(
        &self,
        text: &str,
        max_length: usize,
        min_length: usize,
    ) -> Result<String> {
        match self.provider {
            LlmProvider::OpenAI => self.summarize_with_openai(text, max_length, min_length).await,
            ref other => Err(anyhow!(
                "Proveedor LLM {:?} aún no implementado para resúmenes",
                other
            )),
        }
    }

    async fn summarize_with_openai(
        &self,
        text: &str,
        max_length: usize,
        min_length: usize,
    ) -> Result<String> {
        use rig::providers::openai;
        // Trait para client.agent(...)
        use rig::client::CompletionClient as _;

        // `Client::from_env` aborta si falta la clave; lo comprobamos antes.
        if env::var("OPENAI_API_KEY").map(|k| k.trim().is_empty()).unwrap_or(true) {
            return Err(anyhow!("Falta OPENAI_API_KEY en el entorno"));
        }

        let preamble = format!(
            "You summarize fragments of scientific articles.\n\
             Write a single abstractive summary in English of between {min_length} and {max_length} words.\n\
             Use only the information in the fragment. Return only the summary text."
        );

        let client = openai::Client::from_env();

        // Modelo de chat por defecto si no se ha configurado otro
        let model_name = if self.chat_model.is_empty() {
            "gpt-4o-mini"
        } else {
            self.chat_model.as_str()
        };

        let agent = client
            .agent(model_name)
            .preamble(&preamble)
            .max_tokens((max_length * 2) as u64)
            .build();

        let summary = agent.prompt(text).await?;
        let summary = summary.trim().to_string();
        if summary.is_empty() {
            return Err(anyhow!("El modelo devolvió un resumen vacío"));
        }
        Ok(summary)
    }
}
