//! Metadatos obtenidos directamente del PDF: resumen (abstract), palabras
//! clave, secciones, recuentos de figuras/tablas/referencias, legibilidad y
//! nube de palabras.
//!
//! Cada campo se extrae de forma independiente y devuelve un [`Extracted`]:
//! así se distingue "no había nada" de "la extracción falló". Los centinelas
//! (`"Unknown"`, `["None"]`, 0) sólo se aplican al construir el registro final.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use tracing::warn;

use crate::{
    keywords,
    models::{ReadabilityScore, NO_SECTIONS, UNKNOWN},
    pdf, readability, wordcloud,
};

/// Número de frases clave que se conservan.
pub const TOP_KEYWORDS: usize = 5;

/// Cabeceras de sección reconocidas, en orden canónico.
pub const SECTION_VOCABULARY: &[&str] =
    &["Abstract", "Introduction", "Methods", "Results", "Discussion", "Conclusion"];

static ABSTRACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)abstract\s*[:\n](.*?)(?:\n\s*(?:introduction|methods|keywords)|\z)")
        .expect("regex de abstract válida")
});
static FIGURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)figure\s*\d+").expect("regex de figuras válida"));
static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)table\s*\d+").expect("regex de tablas válida"));
static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]").expect("regex de referencias válida"));
static SECTION_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    // "Introduction", "1. Introduction", "II. RESULTS", "4 Discussion:"
    Regex::new(r"(?i)^(?:(?:\d+|[ivx]+)\.?\s+)?(abstract|introduction|methods|results|discussion|conclusions?)\s*:?$")
        .expect("regex de secciones válida")
});

/// Resultado parcial de la extracción de un campo.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
    Found(T),
    /// La extracción funcionó pero no había nada que extraer.
    Empty,
    /// La extracción falló; el motivo se conserva para el log.
    Failed(String),
}

impl<T> Extracted<T> {
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Self::Found)
    }

    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Found(value),
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    pub fn found(&self) -> Option<&T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    /// Valor encontrado o el centinela indicado.
    pub fn or_sentinel(self, sentinel: T) -> T {
        match self {
            Self::Found(value) => value,
            _ => sentinel,
        }
    }
}

/// Metadatos del PDF, campo a campo.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfMetadata {
    pub abstract_text: Extracted<String>,
    pub keywords: Extracted<Vec<String>>,
    pub sections: Extracted<Vec<String>>,
    pub figures_count: Extracted<u32>,
    pub tables_count: Extracted<u32>,
    pub references_count: Extracted<u32>,
    pub readability: Extracted<f64>,
    pub wordcloud_path: Extracted<PathBuf>,
}

impl PdfMetadata {
    /// Todos los campos marcados como fallidos por el mismo motivo.
    pub fn failed(reason: &str) -> Self {
        let failed = || reason.to_string();
        Self {
            abstract_text: Extracted::Failed(failed()),
            keywords: Extracted::Failed(failed()),
            sections: Extracted::Failed(failed()),
            figures_count: Extracted::Failed(failed()),
            tables_count: Extracted::Failed(failed()),
            references_count: Extracted::Failed(failed()),
            readability: Extracted::Failed(failed()),
            wordcloud_path: Extracted::Failed(failed()),
        }
    }

    /// Valores con centinela, listos para el registro final.
    pub fn resolved(&self) -> ResolvedPdfFields {
        ResolvedPdfFields {
            abstract_text: self.abstract_text.clone().or_sentinel(UNKNOWN.to_string()),
            keywords: self.keywords.clone().or_sentinel(vec![UNKNOWN.to_string()]),
            sections: self.sections.clone().or_sentinel(vec![NO_SECTIONS.to_string()]),
            figures_count: self.figures_count.clone().or_sentinel(0),
            tables_count: self.tables_count.clone().or_sentinel(0),
            references_count: self.references_count.clone().or_sentinel(0),
            readability_score: self
                .readability
                .found()
                .map_or(ReadabilityScore::Unknown, |g| ReadabilityScore::Grade(*g)),
            wordcloud_path: self
                .wordcloud_path
                .found()
                .map(|p| p.to_string_lossy().to_string()),
        }
    }
}

/// Campos del PDF tras aplicar los centinelas.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPdfFields {
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub sections: Vec<String>,
    pub figures_count: u32,
    pub tables_count: u32,
    pub references_count: u32,
    pub readability_score: ReadabilityScore,
    pub wordcloud_path: Option<String>,
}

/// Extrae todos los metadatos locales del PDF. Nunca falla: si el PDF no se
/// puede leer, todos los campos quedan como `Failed`.
pub fn extract_pdf_metadata(pdf_path: &Path, wordcloud_dir: &Path) -> PdfMetadata {
    let pages = match pdf::extract_pages(pdf_path) {
        Ok(pages) => pages,
        Err(e) => {
            warn!("Error extrayendo metadatos del PDF {}: {}", pdf_path.display(), e);
            return PdfMetadata::failed(&e.to_string());
        }
    };
    let text = pages.join("\n");

    let wordcloud_output = wordcloud::wordcloud_path_for(wordcloud_dir, pdf_path);
    let wordcloud_path = Extracted::from_result(wordcloud::write_wordcloud(&text, &wordcloud_output));
    if let Extracted::Failed(reason) = &wordcloud_path {
        warn!("No se generó la nube de palabras para {}: {}", pdf_path.display(), reason);
    }

    PdfMetadata {
        abstract_text: Extracted::from_option(extract_abstract(&text)),
        keywords: non_empty(keywords::extract_keywords(&text, TOP_KEYWORDS)),
        sections: non_empty(detect_sections(&pages)),
        figures_count: Extracted::Found(count_matches(&FIGURE_RE, &text)),
        tables_count: Extracted::Found(count_matches(&TABLE_RE, &text)),
        references_count: Extracted::Found(count_matches(&REFERENCE_RE, &text)),
        readability: Extracted::from_option(readability::flesch_kincaid_grade(&text)),
        wordcloud_path,
    }
}

/// Texto entre la cabecera "Abstract" y la siguiente sección conocida.
pub fn extract_abstract(text: &str) -> Option<String> {
    ABSTRACT_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Cabeceras del vocabulario presentes en alguna línea, en orden de aparición.
pub fn detect_sections(pages: &[String]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for page in pages {
        for line in page.lines() {
            let Some(caps) = SECTION_LINE_RE.captures(line.trim()) else {
                continue;
            };
            let matched = caps[1].to_lowercase();
            let canonical = SECTION_VOCABULARY
                .iter()
                .find(|name| matched.starts_with(&name.to_lowercase()))
                .map(|name| name.to_string());
            if let Some(name) = canonical {
                if !found.contains(&name) {
                    found.push(name);
                }
            }
        }
    }
    found
}

fn count_matches(re: &Regex, text: &str) -> u32 {
    re.find_iter(text).count() as u32
}

fn non_empty(values: Vec<String>) -> Extracted<Vec<String>> {
    if values.is_empty() {
        Extracted::Empty
    } else {
        Extracted::Found(values)
    }
}
