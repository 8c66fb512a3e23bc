//! Modelos de dominio: el artículo persistido y sus metadatos resueltos.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Valor centinela para cualquier campo que no se pudo determinar.
pub const UNKNOWN: &str = "Unknown";

/// Centinela de `sections` cuando no se detecta ninguna cabecera.
pub const NO_SECTIONS: &str = "None";

/// Unidad persistida en el almacén JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub doi: String,
    #[serde(default)]
    pub metadata: MetadataRecord,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_score: Option<f64>,
    /// Campos desconocidos enviados por clientes externos; se conservan tal cual.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Metadatos bibliográficos + derivados del PDF.
///
/// Siempre completamente formado: cada campo ausente toma su centinela.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataRecord {
    pub title: String,
    pub authors: String,
    pub affiliations: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub publisher: String,
    pub publication_date: String,
    pub journal: String,
    pub doi: String,
    pub open_access: bool,
    pub figures_count: u32,
    pub tables_count: u32,
    pub references_count: u32,
    pub sections: Vec<String>,
    pub readability_score: ReadabilityScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wordcloud_path: Option<String>,
    pub citation_count: u64,
}

impl Default for MetadataRecord {
    fn default() -> Self {
        Self {
            title: UNKNOWN.to_string(),
            authors: UNKNOWN.to_string(),
            affiliations: vec![UNKNOWN.to_string()],
            abstract_text: UNKNOWN.to_string(),
            keywords: vec![UNKNOWN.to_string()],
            publisher: UNKNOWN.to_string(),
            publication_date: UNKNOWN.to_string(),
            journal: UNKNOWN.to_string(),
            doi: UNKNOWN.to_string(),
            open_access: false,
            figures_count: 0,
            tables_count: 0,
            references_count: 0,
            sections: vec![NO_SECTIONS.to_string()],
            readability_score: ReadabilityScore::Unknown,
            wordcloud_path: None,
            citation_count: 0,
        }
    }
}

/// Nivel de lectura (grado escolar) o `"Unknown"`.
///
/// Se serializa como número o como la cadena centinela.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ReadabilityScore {
    Grade(f64),
    #[default]
    Unknown,
}

impl Serialize for ReadabilityScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Grade(grade) => serializer.serialize_f64(*grade),
            Self::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

impl<'de> Deserialize<'de> for ReadabilityScore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Other(Value),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(grade) => Self::Grade(grade),
            Raw::Other(_) => Self::Unknown,
        })
    }
}
