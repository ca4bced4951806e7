use crate::ml::models::ImportanceEntry;
use std::collections::{HashMap, HashSet};

/// Frequency-based token importance for a single document.
///
/// The document is its own corpus, so inverse document frequency is constant
/// and the score degenerates to the L2-normalised term frequency.
#[derive(Debug, Clone, Default)]
pub struct TokenImportanceRanker {
    stop_words: HashSet<String>,
}

impl TokenImportanceRanker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ranker that ignores the given stop words
    pub fn with_stop_words(stop_words: &HashSet<String>) -> Self {
        Self {
            stop_words: stop_words.clone(),
        }
    }

    /// Top `k` tokens by descending score, ties broken by first occurrence.
    ///
    /// An empty document yields an empty ranking.
    pub fn rank(&self, tokens: &[String], k: usize) -> Vec<ImportanceEntry> {
        if k == 0 {
            return Vec::new();
        }

        // token -> (first occurrence, count)
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (position, token) in tokens.iter().enumerate() {
            if token.is_empty() || self.stop_words.contains(token) {
                continue;
            }
            counts.entry(token.as_str()).or_insert((position, 0)).1 += 1;
        }

        if counts.is_empty() {
            return Vec::new();
        }

        let norm = counts
            .values()
            .map(|&(_, c)| (c * c) as f64)
            .sum::<f64>()
            .sqrt();

        let mut ranked: Vec<(&str, usize, usize)> = counts
            .into_iter()
            .map(|(token, (first, count))| (token, first, count))
            .collect();
        ranked.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)));

        ranked
            .into_iter()
            .take(k)
            .map(|(token, _, count)| ImportanceEntry::new(token, count as f64 / norm))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_rank_orders_by_frequency() {
        let ranker = TokenImportanceRanker::new();
        let ranked = ranker.rank(
            &tokens("database connection timeout database error connection database"),
            3,
        );

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].feature_name, "database");
        assert_eq!(ranked[1].feature_name, "connection");
        assert_eq!(ranked[2].feature_name, "timeout");
        assert!(ranked[0].importance_score > ranked[1].importance_score);
    }

    #[test]
    fn test_ties_follow_first_occurrence() {
        let ranker = TokenImportanceRanker::new();
        let ranked = ranker.rank(&tokens("submit click app"), 10);
        let names: Vec<&str> = ranked.iter().map(|e| e.feature_name.as_str()).collect();
        assert_eq!(names, vec!["submit", "click", "app"]);
    }

    #[test]
    fn test_scores_are_l2_normalised() {
        let ranker = TokenImportanceRanker::new();
        let ranked = ranker.rank(&tokens("crash crash click"), 10);
        let norm: f64 = ranked.iter().map(|e| e.importance_score.powi(2)).sum();
        assert!((norm - 1.0).abs() < 1e-9);
        assert!((ranked[0].importance_score - 2.0 / 5f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_fewer_unique_tokens_than_k() {
        let ranker = TokenImportanceRanker::new();
        let ranked = ranker.rank(&tokens("crash crash"), 10);
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].importance_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_document_and_zero_k() {
        let ranker = TokenImportanceRanker::new();
        assert!(ranker.rank(&[], 5).is_empty());
        assert!(ranker.rank(&tokens("crash"), 0).is_empty());
    }

    #[test]
    fn test_stop_words_are_filtered() {
        let stop_words: HashSet<String> = ["the".to_string()].into_iter().collect();
        let ranker = TokenImportanceRanker::with_stop_words(&stop_words);
        let ranked = ranker.rank(&tokens("the the the crash"), 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].feature_name, "crash");

        assert!(ranker.rank(&tokens("the the"), 10).is_empty());
    }
}
