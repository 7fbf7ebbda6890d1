//! Pairwise similarity scoring between a candidate mark and an existing one.
//!
//! The `SimilarityScorer` trait keeps the string-matching algorithm
//! swappable without touching risk classification.

use markscreen_features::{code_similarity, edit_similarity, token_overlap};
use markscreen_model::{Mark, SimilarityResult};

/// Scores one candidate/existing pair.
///
/// Implementations must be pure and return scores in [0, 1]; the risk
/// classifier rejects anything else as a contract violation.
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, candidate: &Mark, existing: &Mark) -> SimilarityResult;

    /// Scorer name for logging.
    fn name(&self) -> &'static str;
}

/// Largest textual score for texts that are not identical.
const NEAR_IDENTICAL: f32 = 1.0 - f32::EPSILON;

/// Default scorer: edit distance and token overlap for spelling,
/// phonetic-code agreement for sound.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditPhoneticScorer;

impl EditPhoneticScorer {
    /// Spelling similarity of two normalized texts.
    ///
    /// Best of whole-string edit similarity and word overlap, so that
    /// "acme labs" still scores against "labs acme". Only identical texts
    /// reach 1.0.
    pub fn textual_score(candidate: &str, existing: &str) -> f32 {
        if candidate.is_empty() || existing.is_empty() {
            return 0.0;
        }
        if candidate == existing {
            return 1.0;
        }
        // Equal word sets ("acme acme" vs "acme") still differ as text.
        let overlap = token_overlap(candidate, existing).min(NEAR_IDENTICAL);
        edit_similarity(candidate, existing).max(overlap)
    }

    pub fn phonetic_score(candidate: &str, existing: &str) -> f32 {
        code_similarity(candidate, existing)
    }
}

impl SimilarityScorer for EditPhoneticScorer {
    fn score(&self, candidate: &Mark, existing: &Mark) -> SimilarityResult {
        SimilarityResult {
            candidate: candidate.clone(),
            existing: existing.clone(),
            textual_score: Self::textual_score(candidate.normalized_text(), existing.normalized_text()),
            phonetic_score: Self::phonetic_score(candidate.phonetic_code(), existing.phonetic_code()),
            class_match: candidate.nice_class() == existing.nice_class(),
        }
    }

    fn name(&self) -> &'static str {
        "edit-phonetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markscreen_features::{build_mark, SoundexEncoder};
    use markscreen_model::NiceClass;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn mark(text: &str, class: u16) -> Mark {
        build_mark(text, NiceClass::new(class).unwrap(), &SoundexEncoder::default())
    }

    #[test]
    fn test_one_letter_variant() {
        let result = EditPhoneticScorer.score(&mark("ACME", 9), &mark("AKME", 9));
        assert_eq!(result.textual_score, 0.75);
        assert_eq!(result.phonetic_score, 1.0);
        assert!(result.class_match);
    }

    #[test]
    fn test_identical_text_across_classes() {
        let result = EditPhoneticScorer.score(&mark("ACME", 9), &mark("Acme.", 43));
        assert_eq!(result.textual_score, 1.0);
        assert!(!result.class_match);
    }

    #[test]
    fn test_unrelated_marks() {
        let result = EditPhoneticScorer.score(&mark("ZENTRA", 9), &mark("BLOOMFIELD", 9));
        assert!(result.textual_score < 0.3);
        assert_eq!(result.phonetic_score, 0.0);
    }

    #[test]
    fn test_reordered_words_score_near_but_below_identical() {
        let result = EditPhoneticScorer.score(&mark("Acme Labs", 5), &mark("Labs Acme", 5));
        assert!(result.textual_score < 1.0);
        assert!(result.textual_score > 0.99);
    }

    #[test]
    fn test_repeated_word_is_not_identical() {
        let result = EditPhoneticScorer.score(&mark("Acme Acme", 5), &mark("ACME", 5));
        assert!(result.textual_score < 1.0);
    }

    #[test]
    fn test_only_identical_text_scores_one() {
        assert_eq!(EditPhoneticScorer::textual_score("acme labs", "acme labs"), 1.0);
        assert!(EditPhoneticScorer::textual_score("acme labs", "acme lab") < 1.0);
    }

    #[test]
    fn test_empty_text_scores_zero() {
        let result = EditPhoneticScorer.score(&mark("...", 9), &mark("ACME", 9));
        assert_eq!(result.textual_score, 0.0);
        assert_eq!(result.phonetic_score, 0.0);
    }

    proptest! {
        #[test]
        fn score_is_deterministic_and_bounded(a in "[A-Za-z ]{0,16}", b in "[A-Za-z ]{0,16}") {
            let (a, b) = (mark(&a, 9), mark(&b, 9));
            let first = EditPhoneticScorer.score(&a, &b);
            let second = EditPhoneticScorer.score(&a, &b);
            prop_assert_eq!(&first, &second);
            prop_assert!((0.0..=1.0).contains(&first.textual_score));
            prop_assert!((0.0..=1.0).contains(&first.phonetic_score));
            prop_assert_eq!(first.textual_score == 1.0, a.normalized_text() == b.normalized_text() && !a.normalized_text().is_empty());
        }
    }
}
