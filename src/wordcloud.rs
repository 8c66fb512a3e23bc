//! Generación de la nube de palabras como imagen SVG.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::keywords::{clean_text, is_stopword};

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 400.0;
const MAX_WORDS: usize = 40;
const PALETTE: &[&str] = &["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b"];

/// Ruta determinista de la nube de palabras para un PDF dado.
pub fn wordcloud_path_for(wordcloud_dir: &Path, pdf_path: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    wordcloud_dir.join(format!("{stem}_wordcloud.svg"))
}

/// Palabras más frecuentes (sin palabras vacías), de mayor a menor.
pub fn top_words(text: &str, limit: usize) -> Vec<(String, usize)> {
    let cleaned = clean_text(text).to_lowercase();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for raw in cleaned.split(|c: char| !c.is_alphanumeric()) {
        if raw.chars().count() < 3 || !raw.chars().any(|c| c.is_alphabetic()) || is_stopword(raw) {
            continue;
        }
        *counts.entry(raw.to_string()).or_default() += 1;
    }

    let mut words: Vec<(String, usize)> = counts.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(limit);
    words
}

/// Escribe la nube de palabras de `text` en `output` y devuelve la ruta.
pub fn write_wordcloud(text: &str, output: &Path) -> Result<PathBuf> {
    let words = top_words(text, MAX_WORDS);
    if words.is_empty() {
        anyhow::bail!("No hay palabras suficientes para generar la nube");
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("No se pudo crear {}", parent.display()))?;
    }
    fs::write(output, render_svg(&words))
        .with_context(|| format!("No se pudo escribir {}", output.display()))?;
    Ok(output.to_path_buf())
}

/// Maqueta las palabras en filas, con tamaño de fuente proporcional a la frecuencia.
fn render_svg(words: &[(String, usize)]) -> String {
    let max_count = words.first().map(|(_, c)| *c).unwrap_or(1) as f64;
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
    );
    svg.push_str(r#"<rect width="100%" height="100%" fill="white"/>"#);

    let (mut x, mut y, mut row_height) = (10.0_f64, 0.0_f64, 0.0_f64);
    for (i, (word, count)) in words.iter().enumerate() {
        let size = 12.0 + 36.0 * (*count as f64 / max_count);
        let width = size * 0.6 * word.chars().count() as f64;
        if x + width > WIDTH - 10.0 {
            x = 10.0;
            y += row_height + 6.0;
            row_height = 0.0;
        }
        row_height = row_height.max(size);
        if y + size > HEIGHT {
            break;
        }
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="{:.1}" fill="{}">{}</text>"#,
            x,
            y + size,
            size,
            PALETTE[i % PALETTE.len()],
            escape_xml(word)
        ));
        x += width + 12.0;
    }

    svg.push_str("</svg>");
    svg
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
