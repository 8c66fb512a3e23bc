//! Almacén de artículos en un único fichero JSON.
//!
//! - `load` nunca falla: fichero ausente o corrupto → lista vacía (con log).
//! - `save` escribe a un fichero temporal en el mismo directorio y lo renombra,
//!   de modo que el fichero nunca se observa a medio escribir.
//! - Las operaciones leer-modificar-escribir se serializan dentro del proceso.
//! - Búsqueda por DOI: recorrido lineal, sin índices.

use std::{
    fs,
    io::Write,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::models::ArticleRecord;

#[derive(Debug, Clone)]
pub struct ArticleStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ArticleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Lee todos los artículos.
    pub fn load(&self) -> Vec<ArticleRecord> {
        debug!("Cargando artículos desde {}", self.path.display());
        if !self.path.exists() {
            return Vec::new();
        }
        match fs::read_to_string(&self.path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| serde_json::from_str::<Vec<ArticleRecord>>(&raw).map_err(Into::into))
        {
            Ok(articles) => articles,
            Err(e) => {
                error!("Error cargando artículos de {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Sobrescribe el fichero con la lista completa (JSON con sangría).
    /// No toma el cerrojo: las escrituras concurrentes deben pasar por `append_*`.
    pub fn save(&self, articles: &[ArticleRecord]) -> Result<()> {
        debug!("Guardando {} artículos en {}", articles.len(), self.path.display());
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("No se pudo crear el directorio {}", dir.display()))?;

        let json = serde_json::to_string_pretty(articles)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| anyhow!("No se pudo reemplazar {}: {}", self.path.display(), e))?;
        Ok(())
    }

    /// Añade el artículo sin comprobar duplicados (flujo de subida de PDFs).
    pub fn append_unconditional(&self, article: ArticleRecord) -> Result<()> {
        let _guard = self.lock()?;
        let mut articles = self.load();
        info!("Guardando artículo {} ({} existentes)", article.doi, articles.len());
        articles.push(article);
        self.save(&articles)
    }

    /// Añade el artículo sólo si ningún registro comparte su DOI.
    /// Devuelve `true` si se añadió.
    pub fn append_if_new(&self, article: ArticleRecord) -> Result<bool> {
        let _guard = self.lock()?;
        let mut articles = self.load();
        if articles.iter().any(|a| a.doi == article.doi) {
            info!("El artículo {} ya existe; no se añade", article.doi);
            return Ok(false);
        }
        articles.push(article);
        self.save(&articles)?;
        Ok(true)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| anyhow!("El cerrojo del almacén de artículos está envenenado"))
    }
}
