//! Extracción del DOI de un PDF: primero el texto de las páginas, después el
//! diccionario de metadatos del documento.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::pdf;

static DOI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)10\.\d{4,9}/[-._;()/:A-Z0-9]+").expect("regex de DOI válida")
});

/// Primer DOI presente en `text`, sin normalizar.
pub fn find_doi(text: &str) -> Option<String> {
    DOI_RE.find(text).map(|m| m.as_str().to_string())
}

/// Busca el DOI en las páginas (en orden) y, si no aparece, en los valores
/// del diccionario `/Info`. Nunca devuelve error: `None` significa "no encontrado".
pub fn extract_doi(path: &Path) -> Option<String> {
    match pdf::extract_pages(path) {
        Ok(pages) => {
            if let Some(doi) = pages.iter().find_map(|page| find_doi(page)) {
                debug!("DOI encontrado en el texto: {}", doi);
                return Some(doi);
            }
        }
        Err(e) => warn!("No se pudo leer el texto de {}: {}", path.display(), e),
    }

    match pdf::extract_info_values(path) {
        Ok(values) => {
            let doi = values.iter().find_map(|value| find_doi(value));
            if let Some(doi) = &doi {
                debug!("DOI encontrado en los metadatos del PDF: {}", doi);
            }
            doi
        }
        Err(e) => {
            warn!("No se pudieron leer los metadatos de {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{write_pdf, write_pdf_with_encoding};
    use tempfile::tempdir;

    #[test]
    fn finds_first_match_unmodified() {
        assert_eq!(
            find_doi("see https://doi.org/10.1038/NATURE12373. and 10.1000/other"),
            Some("10.1038/NATURE12373.".to_string())
        );
        assert_eq!(find_doi("no identifier here, only 10.12/short"), None);
    }

    #[test]
    fn extracts_doi_from_body_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        write_pdf(&path, &["A study of things\nDOI 10.1000/xyz123\nIntroduction"], &[]);

        assert_eq!(extract_doi(&path), Some("10.1000/xyz123".to_string()));
    }

    #[test]
    fn earlier_page_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        write_pdf(
            &path,
            &["Cover page without identifiers", "Body cites 10.2000/first", "Later 10.3000/second"],
            &[("Subject", "10.9999/from-info")],
        );

        assert_eq!(extract_doi(&path), Some("10.2000/first".to_string()));
    }

    #[test]
    fn falls_back_to_document_info() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        write_pdf(&path, &["Nothing to see"], &[("Subject", "doi:10.5555/meta.42")]);

        assert_eq!(extract_doi(&path), Some("10.5555/meta.42".to_string()));
    }

    #[test]
    fn unparseable_text_still_reaches_document_info() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("odd-font.pdf");
        write_pdf_with_encoding(
            &path,
            &["Body text"],
            &[("Subject", "doi:10.5555/meta.42")],
            "BogusEncoding",
        );
        assert_eq!(extract_doi(&path), Some("10.5555/meta.42".to_string()));

        let bare = dir.path().join("odd-font-bare.pdf");
        write_pdf_with_encoding(&bare, &["Body text"], &[], "BogusEncoding");
        assert_eq!(extract_doi(&bare), None);
    }

    #[test]
    fn missing_or_broken_file_is_not_found() {
        let dir = tempdir().unwrap();
        assert_eq!(extract_doi(&dir.path().join("absent.pdf")), None);

        let broken = dir.path().join("broken.pdf");
        std::fs::write(&broken, b"garbage").unwrap();
        assert_eq!(extract_doi(&broken), None);
    }
}
