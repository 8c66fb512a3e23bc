//! Índice de legibilidad Flesch–Kincaid (nivel de grado escolar).

/// Grado Flesch–Kincaid redondeado a dos decimales, o `None` si el texto no
/// tiene palabras.
pub fn flesch_kincaid_grade(text: &str) -> Option<f64> {
    let words: Vec<&str> = text
        .split_whitespace()
        .filter(|w| w.chars().any(|c| c.is_alphabetic()))
        .collect();
    if words.is_empty() {
        return None;
    }

    let sentences = text
        .split(['.', '!', '?'])
        .filter(|s| s.chars().any(|c| c.is_alphabetic()))
        .count()
        .max(1);
    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();

    let words_per_sentence = words.len() as f64 / sentences as f64;
    let syllables_per_word = syllables as f64 / words.len() as f64;
    let grade = 0.39 * words_per_sentence + 11.8 * syllables_per_word - 15.59;
    Some((grade * 100.0).round() / 100.0)
}

/// Cuenta heurística de sílabas: grupos de vocales, descontando la `e` muda final.
pub fn count_syllables(word: &str) -> usize {
    let word: String = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();
    if word.is_empty() {
        return 0;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut count = 0;
    let mut previous_vowel = false;
    for c in word.chars() {
        let vowel = is_vowel(c);
        if vowel && !previous_vowel {
            count += 1;
        }
        previous_vowel = vowel;
    }

    if word.ends_with('e') && !word.ends_with("le") && count > 1 {
        count -= 1;
    }
    count.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syllable_heuristic() {
        assert_eq!(count_syllables("cat"), 1);
        assert_eq!(count_syllables("table"), 2);
        assert_eq!(count_syllables("make"), 1);
        assert_eq!(count_syllables("readability"), 5);
        assert_eq!(count_syllables("42"), 0);
    }

    #[test]
    fn simple_text_scores_lower_than_dense_text() {
        let simple = flesch_kincaid_grade("The cat sat. The dog ran. We had fun.").unwrap();
        let dense = flesch_kincaid_grade(
            "Heterogeneous computational methodologies substantially accelerate \
             probabilistic characterization of macromolecular conformational variability.",
        )
        .unwrap();
        assert!(simple < dense);
    }

    #[test]
    fn no_words_means_no_score() {
        assert_eq!(flesch_kincaid_grade(""), None);
        assert_eq!(flesch_kincaid_grade("12 34 . 56"), None);
    }
}
