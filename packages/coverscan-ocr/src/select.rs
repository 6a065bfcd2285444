//! Picking the best of several OCR attempts on the same image.
//!
//! Score = 2 × words + characters + 100 × expected keywords present.
//! Keyword matching is a case-insensitive substring test on the linear text.
//! The highest score wins; ties go to the earliest candidate.
use serde::{Deserialize, Serialize};

use crate::engine::OcrOutput;

pub const WORD_WEIGHT: usize = 2;
pub const KEYWORD_BONUS: usize = 100;

/// Anything that exposes the linear text to be scored.
pub trait Candidate {
    fn text(&self) -> &str;
}

impl Candidate for OcrOutput {
    fn text(&self) -> &str {
        &self.text
    }
}

impl Candidate for String {
    fn text(&self) -> &str {
        self
    }
}

impl Candidate for &str {
    fn text(&self) -> &str {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub total: usize,
    pub word_count: usize,
    pub char_count: usize,
    pub keywords_found: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordScorer {
    keywords: Vec<String>,
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self::new(["PRIVATE", "EYE", "ANDREW", "1642"])
    }
}

impl KeywordScorer {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_uppercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Expected keywords that a score did not find, in configured order.
    pub fn missing(&self, score: &Score) -> Vec<String> {
        self.keywords
            .iter()
            .filter(|k| !score.keywords_found.contains(k))
            .cloned()
            .collect()
    }

    pub fn score(&self, text: &str) -> Score {
        let upper = text.to_uppercase();
        let keywords_found: Vec<String> = self
            .keywords
            .iter()
            .filter(|k| upper.contains(k.as_str()))
            .cloned()
            .collect();
        let word_count = text.split_whitespace().count();
        let char_count = text.chars().count();
        Score {
            total: WORD_WEIGHT * word_count + char_count + KEYWORD_BONUS * keywords_found.len(),
            word_count,
            char_count,
            keywords_found,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scored<T> {
    pub candidate: T,
    pub score: Score,
}

/// All candidates, best first. Equal scores keep their input order.
pub fn rank<T: Candidate>(candidates: Vec<T>, scorer: &KeywordScorer) -> Vec<Scored<T>> {
    let mut scored: Vec<Scored<T>> = candidates
        .into_iter()
        .map(|candidate| {
            let score = scorer.score(candidate.text());
            Scored { candidate, score }
        })
        .collect();
    scored.sort_by(|a, b| b.score.total.cmp(&a.score.total));
    scored
}

pub fn select_best<T: Candidate>(candidates: Vec<T>, scorer: &KeywordScorer) -> Option<Scored<T>> {
    rank(candidates, scorer).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_rule() {
        let scorer = KeywordScorer::default();
        let score = scorer.score("Private Eye No 1642");
        assert_eq!(score.word_count, 4);
        assert_eq!(score.char_count, 19);
        assert_eq!(score.keywords_found, vec!["PRIVATE", "EYE", "1642"]);
        assert_eq!(score.total, 8 + 19 + 300);
    }

    #[test]
    fn test_missing_keywords() {
        let scorer = KeywordScorer::default();
        let score = scorer.score("andrew denies being chinese spy");
        assert_eq!(score.keywords_found, vec!["ANDREW"]);
        assert_eq!(scorer.missing(&score), vec!["PRIVATE", "EYE", "1642"]);
    }

    #[test]
    fn test_keywords_beat_length() {
        let scorer = KeywordScorer::default();
        let best = select_best(
            vec!["lorem ipsum dolor sit amet consectetur", "PRIVATE EYE"],
            &scorer,
        )
        .unwrap();
        assert_eq!(best.candidate, "PRIVATE EYE");
    }

    #[test]
    fn test_ties_go_to_earliest() {
        let scorer = KeywordScorer::new(["SPY"]);
        let ranked = rank(vec!["abcd", "efgh", "ijkl"], &scorer);
        let order: Vec<&str> = ranked.iter().map(|s| s.candidate).collect();
        assert_eq!(order, vec!["abcd", "efgh", "ijkl"]);
    }

    #[test]
    fn test_empty_candidates() {
        let scorer = KeywordScorer::default();
        assert!(select_best(Vec::<String>::new(), &scorer).is_none());
    }

    #[test]
    fn test_blank_keywords_dropped() {
        let scorer = KeywordScorer::new([" spy ", "", "  "]);
        assert_eq!(scorer.keywords(), &["SPY".to_string()]);
    }
}
