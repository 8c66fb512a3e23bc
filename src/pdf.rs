//! Lectura de PDFs: texto por página (pdf-extract) y valores del diccionario
//! de información del documento (lopdf).

use std::{
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use lopdf::{Document, Object};
use tracing::warn;

/// Extrae el texto de cada página, conservando el orden.
///
/// pdf-extract entra en pánico con algunas fuentes o codificaciones; ese
/// pánico se devuelve como un error más.
pub fn extract_pages(path: &Path) -> Result<Vec<String>> {
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_by_pages(path))) {
        Ok(result) => result
            .map_err(|e| anyhow!("No se pudo extraer texto de {}: {}", path.display(), e)),
        Err(payload) => Err(anyhow!(
            "El parser de PDF falló con {}: {}",
            path.display(),
            panic_message(payload.as_ref())
        )),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "pánico sin mensaje".to_string()
    }
}

/// Texto completo del documento (páginas unidas por saltos de línea).
///
/// Devuelve `None` si no hay texto útil.
pub fn extract_full_text(path: &Path) -> Result<Option<String>> {
    let pages = extract_pages(path)?;
    let text = pages.join("\n").trim().to_string();
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Valores de texto del diccionario `/Info` del PDF (Title, Subject, etc.).
pub fn extract_info_values(path: &Path) -> Result<Vec<String>> {
    let doc = Document::load(path)
        .with_context(|| format!("No se pudo abrir el PDF {}", path.display()))?;

    let info = match doc.trailer.get(b"Info") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()),
    };

    let dict = match info {
        Object::Reference(id) => doc.get_dictionary(*id)?,
        Object::Dictionary(dict) => dict,
        _ => return Ok(Vec::new()),
    };

    let mut values = Vec::new();
    for (_key, value) in dict.iter() {
        if let Object::String(bytes, _) = value {
            values.push(decode_pdf_string(bytes));
        }
    }
    Ok(values)
}

/// Ejecuta trabajo de PDF en el pool bloqueante de tokio; un pánico del parser
/// se convierte en error.
pub async fn run_blocking<T, F>(path: PathBuf, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Path) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || job(&path))
        .await
        .map_err(|e| {
            warn!("El procesamiento del PDF terminó de forma abrupta: {}", e);
            anyhow!("El procesamiento del PDF falló: {e}")
        })?
}

/// Decodifica una cadena PDF (UTF-16BE con BOM o bytes tipo Latin-1/UTF-8).
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    String::from_utf8_lossy(bytes).into_owned()
}
