use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Maps raw text to an ordered sequence of normalized tokens
pub trait Normalizer: Send + Sync {
    /// Normalize raw text into tokens, preserving document order
    fn normalize(&self, text: &str) -> Vec<String>;

    /// Stop words removed by this normalizer
    fn stop_words(&self) -> &HashSet<String>;
}

/// English stop words removed before classification
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will",
    "just", "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren",
    "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn",
    "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("valid URL regex"));
static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@[A-Za-z0-9_]+").expect("valid mention regex"));
static DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s?]").expect("valid character class regex"));

/// Default normalizer: lowercase, strip URLs, mentions and punctuation,
/// split on whitespace and drop stop words.
///
/// `?` survives cleaning so questions keep a distinguishing token.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    stop_words: HashSet<String>,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self::with_stop_words(ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()))
    }

    pub fn with_stop_words(stop_words: impl IntoIterator<Item = String>) -> Self {
        Self {
            stop_words: stop_words.into_iter().collect(),
        }
    }

    /// Remove URLs, mentions, hashtags and characters outside `[a-z0-9\s?]`
    pub fn clean(text: &str) -> String {
        let text = text.to_lowercase();
        let text = URL_RE.replace_all(&text, "");
        let text = MENTION_RE.replace_all(&text, "");
        let text = text.replace('#', "");
        DISALLOWED_RE.replace_all(&text, "").into_owned()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer for TextNormalizer {
    fn normalize(&self, text: &str) -> Vec<String> {
        Self::clean(text)
            .split_whitespace()
            .filter(|token| !self.stop_words.contains(*token))
            .map(str::to_string)
            .collect()
    }

    fn stop_words(&self) -> &HashSet<String> {
        &self.stop_words
    }
}
