//! Puntuación de "engagement" de un artículo (0–100).
//!
//! | Término          | Tope | Saturación      |
//! |------------------|------|-----------------|
//! | palabras abstract| 30   | 100 palabras    |
//! | palabras clave   | 20   | 5 palabras      |
//! | citas            | 30   | 50 citas        |
//! | open access      | 20   | bonus fijo      |

use crate::models::{MetadataRecord, UNKNOWN};

const ABSTRACT_WEIGHT: f64 = 30.0;
const ABSTRACT_SATURATION: f64 = 100.0;
const KEYWORDS_WEIGHT: f64 = 20.0;
const KEYWORDS_SATURATION: f64 = 5.0;
const CITATIONS_WEIGHT: f64 = 30.0;
const CITATIONS_SATURATION: f64 = 50.0;
const OPEN_ACCESS_BONUS: f64 = 20.0;

/// Puntuación redondeada a un decimal.
pub fn engagement_score(metadata: &MetadataRecord) -> f64 {
    let abstract_words = if metadata.abstract_text == UNKNOWN {
        0
    } else {
        metadata.abstract_text.split_whitespace().count()
    };

    let keyword_count = if metadata.keywords.len() == 1 && metadata.keywords[0] == UNKNOWN {
        0
    } else {
        metadata.keywords.len()
    };

    let score = capped(abstract_words as f64, ABSTRACT_SATURATION) * ABSTRACT_WEIGHT
        + capped(keyword_count as f64, KEYWORDS_SATURATION) * KEYWORDS_WEIGHT
        + capped(metadata.citation_count as f64, CITATIONS_SATURATION) * CITATIONS_WEIGHT
        + if metadata.open_access { OPEN_ACCESS_BONUS } else { 0.0 };

    (score * 10.0).round() / 10.0
}

fn capped(value: f64, saturation: f64) -> f64 {
    (value / saturation).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(abstract_words: usize, keywords: usize, citations: u64, open_access: bool) -> MetadataRecord {
        MetadataRecord {
            abstract_text: if abstract_words == 0 {
                UNKNOWN.to_string()
            } else {
                vec!["word"; abstract_words].join(" ")
            },
            keywords: if keywords == 0 {
                vec![UNKNOWN.to_string()]
            } else {
                (0..keywords).map(|i| format!("kw{i}")).collect()
            },
            citation_count: citations,
            open_access,
            ..MetadataRecord::default()
        }
    }

    #[test]
    fn all_sentinels_score_zero() {
        assert_eq!(engagement_score(&MetadataRecord::default()), 0.0);
        assert_eq!(engagement_score(&record(0, 0, 0, false)), 0.0);
    }

    #[test]
    fn saturated_inputs_score_one_hundred() {
        assert_eq!(engagement_score(&record(100, 5, 50, true)), 100.0);
        assert_eq!(engagement_score(&record(500, 12, 9000, true)), 100.0);
    }

    #[test]
    fn partial_terms_are_linear_and_rounded() {
        // 50 palabras → 15, 2 palabras clave → 8, 10 citas → 6
        assert_eq!(engagement_score(&record(50, 2, 10, false)), 29.0);
        // 1 palabra → 0.3, 1 cita → 0.6
        assert_eq!(engagement_score(&record(1, 0, 1, false)), 0.9);
        // 33 palabras → 9.9
        assert_eq!(engagement_score(&record(33, 0, 0, false)), 9.9);
    }

    #[test]
    fn monotonic_in_each_term() {
        let mut previous = 0.0;
        for words in [0, 1, 10, 50, 99, 100, 150] {
            let score = engagement_score(&record(words, 2, 10, false));
            assert!(score >= previous, "words={words}");
            previous = score;
        }
        previous = 0.0;
        for keywords in 0..8 {
            let score = engagement_score(&record(40, keywords, 10, false));
            assert!(score >= previous, "keywords={keywords}");
            previous = score;
        }
        previous = 0.0;
        for citations in [0, 1, 25, 49, 50, 51, 1000] {
            let score = engagement_score(&record(40, 2, citations, false));
            assert!(score >= previous, "citations={citations}");
            previous = score;
        }
        assert!(
            engagement_score(&record(40, 2, 10, true)) >= engagement_score(&record(40, 2, 10, false))
        );
    }
}
