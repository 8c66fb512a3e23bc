//! Carga y gestión de configuración de la aplicación (rutas, fuentes de
//! metadatos y LLM).

use std::{env, path::PathBuf, str::FromStr, time::Duration};
use anyhow::{anyhow, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum LlmProvider {
    OpenAI,
    Gemini,
    Ollama,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(anyhow!("Proveedor LLM no soportado: {other}")),
        }
    }
}

/// Configuración completa de la aplicación.
///
/// Todas las rutas se inyectan desde aquí a cada componente; ningún módulo
/// usa constantes globales para carpetas o ficheros.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,
    pub open_browser: bool,

    pub upload_dir: PathBuf,
    pub store_path: PathBuf,
    pub wordcloud_dir: PathBuf,

    pub contact_email: String,
    pub unpaywall_base_url: String,
    pub crossref_base_url: String,
    pub http_timeout: Duration,
    pub download_timeout: Duration,

    pub llm_provider: LlmProvider,
    pub llm_chat_model: String,
    pub summary_max_length: usize,
    pub summary_min_length: usize,
    pub summary_timeout: Duration,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración a partir de una función clave → valor.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let llm_provider = LlmProvider::from_str(&get("LLM_PROVIDER", "openai"))?;

        let summary_max_length = parse_var(&lookup, "SUMMARY_MAX_LENGTH", 150usize)?;
        let summary_min_length = parse_var(&lookup, "SUMMARY_MIN_LENGTH", 50usize)?;
        if summary_min_length > summary_max_length {
            return Err(anyhow!(
                "SUMMARY_MIN_LENGTH ({summary_min_length}) no puede superar SUMMARY_MAX_LENGTH ({summary_max_length})"
            ));
        }

        Ok(Self {
            server_addr: get("SERVER_ADDR", "127.0.0.1:5000"),
            open_browser: parse_var(&lookup, "OPEN_BROWSER", true)?,
            upload_dir: PathBuf::from(get("UPLOAD_DIR", "uploads")),
            store_path: PathBuf::from(get("ARTICLES_FILE", "articles.json")),
            wordcloud_dir: PathBuf::from(get("WORDCLOUD_DIR", "wordclouds")),
            contact_email: get("CONTACT_EMAIL", "pdf-analyzer@example.com"),
            unpaywall_base_url: get("UNPAYWALL_BASE_URL", "https://api.unpaywall.org"),
            crossref_base_url: get("CROSSREF_BASE_URL", "https://api.crossref.org"),
            http_timeout: Duration::from_secs(parse_var(&lookup, "HTTP_TIMEOUT_SECS", 10u64)?),
            download_timeout: Duration::from_secs(parse_var(&lookup, "DOWNLOAD_TIMEOUT_SECS", 10u64)?),
            llm_provider,
            llm_chat_model: get("LLM_CHAT_MODEL", "gpt-4o-mini"),
            summary_max_length,
            summary_min_length,
            summary_timeout: Duration::from_secs(parse_var(&lookup, "SUMMARY_TIMEOUT_SECS", 120u64)?),
        })
    }

    /// User-Agent educado para las APIs bibliográficas.
    pub fn user_agent(&self) -> String {
        format!("PDFAnalyzer/1.0 (mailto:{})", self.contact_email)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("Valor inválido para {key} ('{raw}'): {e}")),
        None => Ok(default),
    }
}
