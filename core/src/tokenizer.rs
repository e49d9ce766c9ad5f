use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// Turns raw text into the ordered sequence of index terms.
///
/// The indexer and the ranking engine must share one implementation, otherwise
/// query terms will not line up with the indexed vocabulary.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, text: &str) -> Vec<String>;
}

/// Stop word lists that can be combined into one filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopwordLanguage {
    English,
    Portuguese,
}

impl StopwordLanguage {
    fn words(self) -> &'static [&'static str] {
        match self {
            StopwordLanguage::English => ENGLISH,
            StopwordLanguage::Portuguese => PORTUGUESE,
        }
    }
}

const ENGLISH: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","could","did","do","does","doing","down","during",
    "each","few","for","from","further",
    "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
    "i","if","in","into","is","it","its","itself",
    "me","more","most","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "same","she","should","so","some","such",
    "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
    "under","until","up","very",
    "was","we","were","what","when","where","which","while","who","whom","why","with","would",
    "you","your","yours","yourself","yourselves",
];

const PORTUGUESE: &[&str] = &[
    "a","ao","aos","aquela","aquelas","aquele","aqueles","aquilo","as","até",
    "com","como","da","das","de","dela","delas","dele","deles","depois","do","dos",
    "e","ela","elas","ele","eles","em","entre","era","eram","essa","essas","esse","esses","esta","estas","este","estes","eu",
    "foi","foram","há","isso","isto","já","lhe","lhes","mais","mas","me","mesmo","meu","meus","minha","minhas",
    "muito","na","nas","nem","no","nos","nossa","nossas","nosso","nossos","num","numa","não",
    "o","os","ou","para","pela","pelas","pelo","pelos","por","qual","quando","que","quem",
    "se","sem","seu","seus","sua","suas","são","só","também","te","tem","teu","tu","tua",
    "um","uma","você","vocês","vos","à","às","é",
];

lazy_static! {
    static ref RE: Regex = Regex::new(r"[\p{L}\p{N}]+").expect("valid regex");
}

/// Default normalizer: NFKC, lowercase, alphanumeric runs, stop word removal, English stemming.
pub struct StemmingNormalizer {
    stemmer: Stemmer,
    stopwords: HashSet<String>,
}

impl StemmingNormalizer {
    pub fn new(languages: &[StopwordLanguage]) -> Self {
        let stopwords = languages
            .iter()
            .flat_map(|lang| lang.words().iter())
            .map(|w| w.nfkc().collect::<String>())
            .collect();
        Self { stemmer: Stemmer::create(Algorithm::English), stopwords }
    }

    fn is_stopword(&self, token: &str) -> bool { self.stopwords.contains(token) }
}

impl Default for StemmingNormalizer {
    fn default() -> Self {
        Self::new(&[StopwordLanguage::English, StopwordLanguage::Portuguese])
    }
}

impl Normalizer for StemmingNormalizer {
    fn normalize(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        RE.find_iter(&normalized)
            .map(|mat| mat.as_str())
            .filter(|token| !self.is_stopword(token))
            .map(|token| self.stemmer.stem(token).into_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_normalize() {
        let t = StemmingNormalizer::default().normalize("Running, runner's run!");
        assert!(t.iter().any(|w| w == "run"));
    }

    #[test]
    fn keeps_order_and_duplicates() {
        let t = StemmingNormalizer::default().normalize("cat dog cat");
        assert_eq!(t, vec!["cat", "dog", "cat"]);
    }

    #[test]
    fn language_set_is_configurable() {
        let english_only = StemmingNormalizer::new(&[StopwordLanguage::English]);
        assert!(english_only.normalize("uma").contains(&"uma".to_string()));
        assert!(StemmingNormalizer::default().normalize("uma").is_empty());
    }
}
