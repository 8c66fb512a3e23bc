//! Resolución de metadatos bibliográficos a partir de un DOI.
//!
//! Flujo:
//!   1. Normalizar el DOI (espacios y puntos finales).
//!   2. Extraer los metadatos locales del PDF (nunca falla, ver `pdf_metadata`).
//!   3. Consultar Unpaywall (fuente primaria).
//!   4. Si Unpaywall responde con un estado HTTP de error, consultar Crossref
//!      una única vez. Cualquier otro fallo termina la resolución.
//!
//! Sin reintentos ni caché: cada llamada vuelve a leer el PDF y a consultar
//! las fuentes.

use std::path::{Path, PathBuf};

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    models::{MetadataRecord, UNKNOWN},
    pdf,
    pdf_metadata::{self, ResolvedPdfFields},
};

/// Error al consultar una fuente de metadatos.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_name} devolvió el estado {status}")]
    Status { source_name: &'static str, status: StatusCode },

    #[error("error de red consultando {source_name}: {error}")]
    Transport { source_name: &'static str, error: reqwest::Error },

    #[error("respuesta inválida de {source_name}: {detail}")]
    Decode { source_name: &'static str, detail: String },
}

/// Cliente de las dos fuentes bibliográficas.
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    client: Client,
    unpaywall_base_url: String,
    crossref_base_url: String,
    contact_email: String,
    wordcloud_dir: PathBuf,
}

impl MetadataResolver {
    /// Construye el resolver a partir de la configuración; ambas fuentes
    /// comparten el timeout configurado.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.http_timeout)
            .user_agent(cfg.user_agent())
            .build()?;

        Ok(Self {
            client,
            unpaywall_base_url: cfg.unpaywall_base_url.trim_end_matches('/').to_string(),
            crossref_base_url: cfg.crossref_base_url.trim_end_matches('/').to_string(),
            contact_email: cfg.contact_email.clone(),
            wordcloud_dir: cfg.wordcloud_dir.clone(),
        })
    }

    /// Resuelve los metadatos completos de un DOI; `Err` sólo si ninguna de
    /// las dos fuentes pudo responder.
    pub async fn resolve(&self, doi: &str, pdf_path: &Path) -> Result<MetadataRecord, SourceError> {
        let doi = normalize_doi(doi);
        info!("DOI normalizado: {}", doi);

        let wordcloud_dir = self.wordcloud_dir.clone();
        let pdf_fields = match pdf::run_blocking(pdf_path.to_path_buf(), move |path| {
            Ok(pdf_metadata::extract_pdf_metadata(path, &wordcloud_dir))
        })
        .await
        {
            Ok(meta) => meta.resolved(),
            Err(e) => {
                warn!("Metadatos del PDF no disponibles: {}", e);
                pdf_metadata::PdfMetadata::failed(&e.to_string()).resolved()
            }
        };

        match self.fetch_unpaywall(&doi).await {
            Ok(data) => {
                info!("Metadatos obtenidos de Unpaywall para {}", doi);
                Ok(from_unpaywall(&data, &doi, &pdf_fields))
            }
            Err(SourceError::Status { status, .. }) => {
                warn!("Unpaywall respondió {}; probando Crossref...", status);
                let data = self.fetch_crossref(&doi).await.inspect_err(|e| {
                    warn!("Crossref también falló para {}: {}", doi, e);
                })?;
                info!("Metadatos obtenidos de Crossref para {}", doi);
                Ok(from_crossref(&data, &doi, &pdf_fields))
            }
            Err(e) => {
                warn!("Error consultando Unpaywall para {}: {}", doi, e);
                Err(e)
            }
        }
    }

    async fn fetch_unpaywall(&self, doi: &str) -> Result<Value, SourceError> {
        let url = format!("{}/v2/{}", self.unpaywall_base_url, doi);
        let request = self
            .client
            .get(&url)
            .query(&[("email", self.contact_email.as_str())]);
        fetch_json("Unpaywall", request).await
    }

    async fn fetch_crossref(&self, doi: &str) -> Result<Value, SourceError> {
        let url = format!("{}/works/{}", self.crossref_base_url, doi);
        let body = fetch_json("Crossref", self.client.get(&url)).await?;
        match body.get("message") {
            Some(message) if message.is_object() => Ok(message.clone()),
            _ => Err(SourceError::Decode {
                source_name: "Crossref",
                detail: "falta el objeto 'message'".to_string(),
            }),
        }
    }
}

async fn fetch_json(
    source_name: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<Value, SourceError> {
    let response = request
        .send()
        .await
        .map_err(|error| SourceError::Transport { source_name, error })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status { source_name, status });
    }

    response.json::<Value>().await.map_err(|e| SourceError::Decode {
        source_name,
        detail: e.to_string(),
    })
}

/// Quita espacios y puntos finales del DOI.
pub fn normalize_doi(doi: &str) -> String {
    doi.trim().trim_end_matches('.').trim_end().to_string()
}

// ── Conversión ─────────────────────────────────────────────────────────────

fn from_unpaywall(data: &Value, doi: &str, pdf: &ResolvedPdfFields) -> MetadataRecord {
    let authors = data["z_authors"].as_array().cloned().unwrap_or_default();

    let names: Vec<String> = authors
        .iter()
        .filter_map(|a| {
            text(&a["raw_author_name"]).or_else(|| join_name(&a["given"], &a["family"]))
        })
        .collect();

    let affiliations: Vec<String> = authors
        .iter()
        .map(|a| {
            a["raw_affiliation_strings"]
                .as_array()
                .and_then(|list| list.first())
                .and_then(text)
                .unwrap_or_else(|| UNKNOWN.to_string())
        })
        .collect();

    MetadataRecord {
        title: text_or_unknown(&data["title"]),
        authors: join_or_unknown(&names),
        affiliations: affiliations_or_unknown(affiliations),
        abstract_text: text(&data["abstract"]).unwrap_or_else(|| pdf.abstract_text.clone()),
        publisher: text_or_unknown(&data["publisher"]),
        publication_date: text_or_unknown(&data["published_date"]),
        journal: text_or_unknown(&data["journal_name"]),
        open_access: data["is_oa"].as_bool().unwrap_or(false),
        citation_count: data["cited_by_count"].as_u64().unwrap_or(0),
        ..with_pdf_fields(doi, pdf)
    }
}

fn from_crossref(work: &Value, doi: &str, pdf: &ResolvedPdfFields) -> MetadataRecord {
    let authors = work["author"].as_array().cloned().unwrap_or_default();

    let names: Vec<String> = authors
        .iter()
        .filter_map(|a| join_name(&a["given"], &a["family"]))
        .collect();

    let affiliations: Vec<String> = authors
        .iter()
        .map(|a| {
            a["affiliation"]
                .as_array()
                .and_then(|list| list.first())
                .and_then(|aff| text(&aff["name"]))
                .unwrap_or_else(|| UNKNOWN.to_string())
        })
        .collect();

    MetadataRecord {
        title: first_text(&work["title"]).unwrap_or_else(|| UNKNOWN.to_string()),
        authors: join_or_unknown(&names),
        affiliations: affiliations_or_unknown(affiliations),
        abstract_text: text(&work["abstract"])
            .map(|a| strip_jats(&a))
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| pdf.abstract_text.clone()),
        publisher: text_or_unknown(&work["publisher"]),
        publication_date: published_year(&work["published"]["date-parts"])
            .unwrap_or_else(|| UNKNOWN.to_string()),
        journal: first_text(&work["container-title"]).unwrap_or_else(|| UNKNOWN.to_string()),
        // Crossref no informa del acceso abierto; se aproxima con "tiene citas".
        open_access: work["is-referenced-by-count"].as_u64().is_some_and(|n| n > 0),
        citation_count: work["reference-count"].as_u64().unwrap_or(0),
        ..with_pdf_fields(doi, pdf)
    }
}

/// Registro base: DOI + campos del PDF. Las palabras clave del PDF siempre
/// prevalecen sobre las de la fuente externa.
fn with_pdf_fields(doi: &str, pdf: &ResolvedPdfFields) -> MetadataRecord {
    MetadataRecord {
        doi: doi.to_string(),
        abstract_text: pdf.abstract_text.clone(),
        keywords: pdf.keywords.clone(),
        figures_count: pdf.figures_count,
        tables_count: pdf.tables_count,
        references_count: pdf.references_count,
        sections: pdf.sections.clone(),
        readability_score: pdf.readability_score,
        wordcloud_path: pdf.wordcloud_path.clone(),
        ..MetadataRecord::default()
    }
}

fn text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn text_or_unknown(value: &Value) -> String {
    text(value).unwrap_or_else(|| UNKNOWN.to_string())
}

fn first_text(value: &Value) -> Option<String> {
    value.as_array().and_then(|list| list.first()).and_then(text)
}

fn join_name(given: &Value, family: &Value) -> Option<String> {
    let name = format!(
        "{} {}",
        given.as_str().unwrap_or("").trim(),
        family.as_str().unwrap_or("").trim()
    );
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn join_or_unknown(names: &[String]) -> String {
    if names.is_empty() {
        UNKNOWN.to_string()
    } else {
        names.join(", ")
    }
}

fn affiliations_or_unknown(affiliations: Vec<String>) -> Vec<String> {
    if affiliations.iter().any(|a| a != UNKNOWN) {
        affiliations
    } else {
        vec![UNKNOWN.to_string()]
    }
}

/// `[[2024, 6, 1]]` → `"2024"`: sólo el año.
fn published_year(value: &Value) -> Option<String> {
    let year = value.as_array()?.first()?.as_array()?.first()?.as_u64()?;
    Some(year.to_string())
}

/// Crossref devuelve el abstract como fragmentos JATS XML.
fn strip_jats(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut tag: Option<String> = None;
    for c in raw.chars() {
        if let Some(name) = tag.as_mut() {
            if c == '>' {
                // Los cierres de párrafo/título separan bloques de texto.
                if name.starts_with("/jats:p") || name.starts_with("/jats:title") {
                    out.push(' ');
                }
                tag = None;
            } else {
                name.push(c);
            }
        } else if c == '<' {
            tag = Some(String::new());
        } else {
            out.push(c);
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReadabilityScore;
    use crate::pdf::fixtures::write_pdf;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tempfile::tempdir;

    fn pdf_fields() -> ResolvedPdfFields {
        ResolvedPdfFields {
            abstract_text: "Abstract from the PDF.".to_string(),
            keywords: vec!["coral reef".to_string(), "bleaching".to_string()],
            sections: vec!["Introduction".to_string()],
            figures_count: 3,
            tables_count: 1,
            references_count: 20,
            readability_score: ReadabilityScore::Grade(14.2),
            wordcloud_path: Some("clouds/x_wordcloud.svg".to_string()),
        }
    }

    fn resolver_for(server_url: &str, wordcloud_dir: &Path) -> MetadataResolver {
        let mut cfg = AppConfig::from_lookup(|_| None).unwrap();
        cfg.unpaywall_base_url = server_url.to_string();
        cfg.crossref_base_url = server_url.to_string();
        cfg.contact_email = "tests@example.org".to_string();
        cfg.wordcloud_dir = wordcloud_dir.to_path_buf();
        MetadataResolver::from_config(&cfg).unwrap()
    }

    #[test]
    fn normalizes_whitespace_and_trailing_periods() {
        assert_eq!(normalize_doi("  10.1000/xyz123.. \n"), "10.1000/xyz123");
        assert_eq!(normalize_doi("10.1000/a.b"), "10.1000/a.b");
    }

    #[test]
    fn unpaywall_mapping_keeps_pdf_keywords_and_falls_back_for_abstract() {
        let data = json!({
            "title": "Reef Paper",
            "z_authors": [
                { "raw_author_name": "Ana Pérez", "raw_affiliation_strings": ["Univ. of Vigo"] },
                { "given": "Li", "family": "Wei" }
            ],
            "abstract": null,
            "keywords": ["ignored"],
            "publisher": "Elsevier",
            "published_date": "2021-05-04",
            "journal_name": "Marine Biology",
            "is_oa": true,
            "cited_by_count": 17
        });
        let record = from_unpaywall(&data, "10.1/reef", &pdf_fields());

        assert_eq!(record.title, "Reef Paper");
        assert_eq!(record.authors, "Ana Pérez, Li Wei");
        assert_eq!(record.affiliations, vec!["Univ. of Vigo".to_string(), UNKNOWN.to_string()]);
        assert_eq!(record.abstract_text, "Abstract from the PDF.");
        assert_eq!(record.keywords, pdf_fields().keywords);
        assert_eq!(record.publication_date, "2021-05-04");
        assert!(record.open_access);
        assert_eq!(record.citation_count, 17);
        assert_eq!(record.doi, "10.1/reef");
        assert_eq!(record.figures_count, 3);
        assert_eq!(record.wordcloud_path.as_deref(), Some("clouds/x_wordcloud.svg"));
    }

    #[test]
    fn crossref_mapping_uses_nested_structures() {
        let work = json!({
            "title": ["Crossref Title"],
            "author": [
                { "given": "Jane", "family": "Doe", "affiliation": [] },
                { "given": "John", "family": "Roe" }
            ],
            "abstract": "<jats:p>Hello <jats:italic>world</jats:italic>.</jats:p>",
            "publisher": "Springer",
            "published": { "date-parts": [[2020, 3, 5]] },
            "container-title": ["Nature"],
            "license": [{ "URL": "https://creativecommons.org/licenses/by/4.0/" }],
            "reference-count": 42,
            "is-referenced-by-count": 12
        });
        let record = from_crossref(&work, "10.1/cr", &pdf_fields());

        assert_eq!(record.title, "Crossref Title");
        assert_eq!(record.authors, "Jane Doe, John Roe");
        assert_eq!(record.affiliations, vec![UNKNOWN.to_string()]);
        assert_eq!(record.abstract_text, "Hello world.");
        assert_eq!(record.publication_date, "2020");
        assert_eq!(record.journal, "Nature");
        assert!(record.open_access);
        assert_eq!(record.citation_count, 42);
        assert_eq!(record.keywords, pdf_fields().keywords);
    }

    #[test]
    fn crossref_open_access_follows_citations_not_license() {
        let licensed = json!({
            "license": [{ "URL": "https://creativecommons.org/licenses/by/4.0/" }],
            "is-referenced-by-count": 0,
            "published": { "date-parts": [[1999]] }
        });
        let record = from_crossref(&licensed, "10.1/lic", &pdf_fields());
        assert!(!record.open_access);
        assert_eq!(record.publication_date, "1999");

        let cited = json!({ "is-referenced-by-count": 1 });
        assert!(from_crossref(&cited, "10.1/cited", &pdf_fields()).open_access);
    }

    #[test]
    fn empty_crossref_work_is_fully_shaped() {
        let record = from_crossref(&json!({}), "10.1/empty", &pdf_fields());
        assert_eq!(record.title, UNKNOWN);
        assert_eq!(record.authors, UNKNOWN);
        assert_eq!(record.journal, UNKNOWN);
        assert_eq!(record.publication_date, UNKNOWN);
        assert_eq!(record.abstract_text, "Abstract from the PDF.");
        assert!(!record.open_access);
        assert_eq!(record.citation_count, 0);
    }

    #[test]
    fn jats_paragraphs_become_spaces() {
        assert_eq!(
            strip_jats("<jats:title>Abstract</jats:title><jats:p>One.</jats:p><jats:p>Two.</jats:p>"),
            "Abstract One. Two."
        );
    }

    #[tokio::test]
    async fn primary_success_skips_secondary() {
        let mut server = Server::new_async().await;
        let dir = tempdir().unwrap();
        let pdf_path = dir.path().join("paper.pdf");
        write_pdf(&pdf_path, &["Abstract\nA tiny study.\nIntroduction\nText."], &[]);

        let unpaywall = server
            .mock("GET", "/v2/10.1000/xyz123")
            .match_query(Matcher::UrlEncoded("email".into(), "tests@example.org".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "title": "Tiny", "is_oa": false }).to_string())
            .expect(1)
            .create_async()
            .await;
        let crossref = server
            .mock("GET", "/works/10.1000/xyz123")
            .expect(0)
            .create_async()
            .await;

        let resolver = resolver_for(&server.url(), &dir.path().join("clouds"));
        let record = resolver.resolve(" 10.1000/xyz123. ", &pdf_path).await.unwrap();

        assert_eq!(record.title, "Tiny");
        assert_eq!(record.doi, "10.1000/xyz123");
        assert!(record.abstract_text.contains("A tiny study."));
        unpaywall.assert_async().await;
        crossref.assert_async().await;
    }

    #[tokio::test]
    async fn primary_404_queries_secondary_exactly_once() {
        let mut server = Server::new_async().await;
        let dir = tempdir().unwrap();
        let pdf_path = dir.path().join("paper.pdf");
        write_pdf(&pdf_path, &["Body text only"], &[]);

        let unpaywall = server
            .mock("GET", "/v2/10.1000/xyz123")
            .match_query(Matcher::Any)
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let crossref = server
            .mock("GET", "/works/10.1000/xyz123")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "message": { "title": ["From Crossref"] } }).to_string())
            .expect(1)
            .create_async()
            .await;

        let resolver = resolver_for(&server.url(), &dir.path().join("clouds"));
        let record = resolver.resolve("10.1000/xyz123", &pdf_path).await.unwrap();

        assert_eq!(record.title, "From Crossref");
        unpaywall.assert_async().await;
        crossref.assert_async().await;
    }

    #[tokio::test]
    async fn both_sources_failing_yields_no_metadata() {
        let mut server = Server::new_async().await;
        let dir = tempdir().unwrap();
        let pdf_path = dir.path().join("paper.pdf");
        write_pdf(&pdf_path, &["Body text only"], &[]);

        server
            .mock("GET", "/v2/10.1000/xyz123")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;
        let crossref = server
            .mock("GET", "/works/10.1000/xyz123")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let resolver = resolver_for(&server.url(), &dir.path().join("clouds"));
        let result = resolver.resolve("10.1000/xyz123", &pdf_path).await;

        assert!(matches!(result, Err(SourceError::Status { source_name: "Crossref", .. })));
        crossref.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_primary_body_does_not_fall_back() {
        let mut server = Server::new_async().await;
        let dir = tempdir().unwrap();
        let pdf_path = dir.path().join("paper.pdf");
        write_pdf(&pdf_path, &["Body text only"], &[]);

        server
            .mock("GET", "/v2/10.1000/xyz123")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;
        let crossref = server
            .mock("GET", "/works/10.1000/xyz123")
            .expect(0)
            .create_async()
            .await;

        let resolver = resolver_for(&server.url(), &dir.path().join("clouds"));
        let result = resolver.resolve("10.1000/xyz123", &pdf_path).await;

        assert!(matches!(result, Err(SourceError::Decode { source_name: "Unpaywall", .. })));
        crossref.assert_async().await;
    }
}
