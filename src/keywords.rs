//! Extracción de frases clave con RAKE (Rapid Automatic Keyword Extraction).
//!
//! 1. El texto se parte en frases candidatas usando signos de puntuación y
//!    palabras vacías como delimitadores.
//! 2. Cada palabra puntúa `grado / frecuencia` dentro de las candidatas.
//! 3. Cada frase puntúa la suma de sus palabras; se devuelven las mejores.

use std::collections::{HashMap, HashSet};

/// Palabras vacías en inglés (los artículos procesados están en inglés).
pub const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "et",
    "etc", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "him", "his", "how", "however", "i", "if", "in", "into", "is", "it", "its", "itself",
    "may", "me", "might", "more", "most", "must", "my", "no", "nor", "not", "of", "off", "on",
    "once", "only", "or", "other", "our", "ours", "out", "over", "own", "same", "she", "should",
    "so", "some", "such", "than", "that", "the", "their", "them", "then", "there", "these",
    "they", "this", "those", "through", "thus", "to", "too", "under", "until", "up", "us",
    "using", "very", "was", "we", "were", "what", "when", "where", "which", "while", "who",
    "whom", "why", "will", "with", "within", "without", "would", "you", "your", "al", "fig",
    "figure", "table", "doi", "http", "https", "www",
];

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Normaliza el texto extraído del PDF: une guiones de fin de línea y colapsa
/// espacios.
pub fn clean_text(text: &str) -> String {
    text.replace("-\n", "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Devuelve hasta `top_n` frases clave ordenadas por puntuación descendente.
pub fn extract_keywords(text: &str, top_n: usize) -> Vec<String> {
    let cleaned = clean_text(text).to_lowercase();
    let phrases = candidate_phrases(&cleaned);
    if phrases.is_empty() {
        return Vec::new();
    }

    let mut frequency: HashMap<&str, f64> = HashMap::new();
    let mut degree: HashMap<&str, f64> = HashMap::new();
    for phrase in &phrases {
        let extra_degree = (phrase.len() - 1) as f64;
        for &word in phrase {
            *frequency.entry(word).or_default() += 1.0;
            *degree.entry(word).or_default() += 1.0 + extra_degree;
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut scored: Vec<(String, f64)> = Vec::new();
    for phrase in &phrases {
        let joined = phrase.join(" ");
        if !seen.insert(joined.clone()) {
            continue;
        }
        let score = phrase
            .iter()
            .map(|word| degree[word] / frequency[word])
            .sum();
        scored.push((joined, score));
    }

    // Orden estable: a igual puntuación gana la primera aparición.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(top_n).map(|(phrase, _)| phrase).collect()
}

fn candidate_phrases(text: &str) -> Vec<Vec<&str>> {
    let mut phrases = Vec::new();
    for fragment in text.split(|c: char| !(c.is_alphanumeric() || c == ' ' || c == '-' || c == '\'')) {
        let mut current: Vec<&str> = Vec::new();
        for word in fragment.split(' ') {
            let word = word.trim_matches(|c: char| c == '-' || c == '\'');
            if word.is_empty() {
                continue;
            }
            if is_stopword(word) || !is_content_word(word) {
                if !current.is_empty() {
                    phrases.push(std::mem::take(&mut current));
                }
            } else {
                current.push(word);
            }
        }
        if !current.is_empty() {
            phrases.push(current);
        }
    }
    // Frases demasiado largas suelen ser ruido de la extracción.
    phrases.retain(|p| p.len() <= 4);
    phrases
}

fn is_content_word(word: &str) -> bool {
    word.chars().count() > 2 && word.chars().any(|c| c.is_alphabetic())
}
