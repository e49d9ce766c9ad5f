use querium_core::tokenizer::{Normalizer, StemmingNormalizer};

#[test]
fn it_normalizes_and_stems() {
    let words = StemmingNormalizer::default().normalize("Running Runners RUN! The café's menu.");
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    // Accented letters stay inside one token
    assert!(words.iter().any(|w| w.starts_with("café")));
}

#[test]
fn it_filters_stopwords() {
    let words = StemmingNormalizer::default().normalize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
}

#[test]
fn it_filters_portuguese_stopwords() {
    let words = StemmingNormalizer::default().normalize("O gato e o cachorro não são amigos");
    assert!(!words.contains(&"não".to_string()));
    assert!(!words.contains(&"o".to_string()));
    assert!(words.contains(&"gato".to_string()));
}

#[test]
fn it_drops_punctuation_only_tokens() {
    let words = StemmingNormalizer::default().normalize("--- ... !!! 42 cats");
    assert_eq!(words, vec!["42".to_string(), "cat".to_string()]);
}
