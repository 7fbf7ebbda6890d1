//! Risk classification for trademark collisions.
//!
//! Takes scored candidate/existing pairs, weights them by class overlap,
//! assigns a risk tier with rationale and packages the ordered result set
//! into a `CollisionReport`.

use markscreen_model::{
    CollisionReport, ContractViolation, Mark, RiskAssessment, RiskTier, SimilarityResult,
};
use markscreen_score::SimilarityScorer;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Invalid classifier configuration. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f32 },

    #[error("class_discount_factor must be within (0, 1], got {0}")]
    InvalidDiscount(f32),

    #[error(
        "thresholds must satisfy relevance ({relevance}) <= medium ({medium}) <= high ({high})"
    )]
    ThresholdOrder {
        relevance: f32,
        medium: f32,
        high: f32,
    },
}

/// Configuration for the risk classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Combined score a result must exceed to count as evidence
    pub relevance_threshold: f32,
    /// Lowest combined score for MEDIUM
    pub medium_threshold: f32,
    /// Lowest combined score for HIGH
    pub high_threshold: f32,
    /// Weight applied to cross-class matches
    pub class_discount_factor: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: 0.3,
            medium_threshold: 0.45,
            high_threshold: 0.75,
            class_discount_factor: 0.5,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("relevance_threshold", self.relevance_threshold),
            ("medium_threshold", self.medium_threshold),
            ("high_threshold", self.high_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }

        if !(self.class_discount_factor > 0.0 && self.class_discount_factor <= 1.0) {
            return Err(ConfigError::InvalidDiscount(self.class_discount_factor));
        }

        if self.relevance_threshold > self.medium_threshold
            || self.medium_threshold > self.high_threshold
        {
            return Err(ConfigError::ThresholdOrder {
                relevance: self.relevance_threshold,
                medium: self.medium_threshold,
                high: self.high_threshold,
            });
        }

        Ok(())
    }
}

/// Threshold band a combined score falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    High,
    Medium,
    Relevance,
}

impl Band {
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Relevance => "relevance",
        }
    }
}

/// Aggregates similarity results into a risk tier.
///
/// Holds only validated, immutable configuration; safe to share between
/// threads screening different candidates.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    config: ClassifierConfig,
}

impl RiskClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn combined_score(&self, result: &SimilarityResult) -> f32 {
        result.combined_score(self.config.class_discount_factor)
    }

    /// Tier for a maximum combined score.
    pub fn tier_for(&self, score: f32) -> RiskTier {
        match self.band(score) {
            Band::High => RiskTier::High,
            Band::Medium => RiskTier::Medium,
            Band::Relevance => RiskTier::Low,
        }
    }

    pub fn band(&self, score: f32) -> Band {
        if score >= self.config.high_threshold {
            Band::High
        } else if score >= self.config.medium_threshold {
            Band::Medium
        } else {
            Band::Relevance
        }
    }

    /// Classify a candidate from all of its pairwise results.
    ///
    /// Out-of-range scores and results computed for another candidate are
    /// contract violations; nothing is clamped.
    pub fn classify(
        &self,
        candidate: &Mark,
        results: &[SimilarityResult],
    ) -> Result<RiskAssessment, ContractViolation> {
        for result in results {
            result.validate()?;
            if result.candidate != *candidate {
                return Err(ContractViolation::CandidateMismatch {
                    expected: candidate.raw_text().to_string(),
                    found: result.candidate.raw_text().to_string(),
                });
            }
        }

        let mut driving: Vec<(f32, &SimilarityResult)> = results
            .iter()
            .map(|result| (self.combined_score(result), result))
            .filter(|(score, _)| *score > self.config.relevance_threshold)
            .collect();
        driving.sort_by(|(sa, a), (sb, b)| by_score_then_id(*sa, a, *sb, b));

        let max_combined_score = driving.first().map(|(score, _)| *score).unwrap_or(0.0);
        let tier = if driving.is_empty() {
            RiskTier::Low
        } else {
            self.tier_for(max_combined_score)
        };

        let rationale = driving
            .iter()
            .map(|(score, result)| self.rationale_line(*score, result))
            .collect();

        tracing::info!(
            candidate = %candidate.raw_text(),
            tier = %tier,
            driving = driving.len(),
            compared = results.len(),
            max_combined_score,
            "Classified candidate mark"
        );

        Ok(RiskAssessment {
            tier,
            driving_results: driving.into_iter().map(|(_, r)| r.clone()).collect(),
            rationale,
            max_combined_score,
        })
    }

    fn rationale_line(&self, combined: f32, result: &SimilarityResult) -> String {
        let existing = &result.existing;
        let id = if existing.registry_id().is_empty() {
            "n/a"
        } else {
            existing.registry_id()
        };
        let class_note = if result.class_match {
            "same class".to_string()
        } else {
            format!(
                "cross-class, weighted x{:.2}",
                self.config.class_discount_factor
            )
        };

        format!(
            "'{}' (reg. {}, class {}): textual {:.2}, phonetic {:.2}, combined {:.2} [{} band; {}]",
            existing.raw_text(),
            id,
            existing.nice_class(),
            result.textual_score,
            result.phonetic_score,
            combined,
            self.band(combined).label(),
            class_note,
        )
    }

    /// Package everything into the final report.
    ///
    /// `all_results` is stably sorted by combined score, strongest first,
    /// with ties broken by registry id and then normalized text.
    pub fn build_report(
        &self,
        candidate: Mark,
        mut results: Vec<SimilarityResult>,
        assessment: RiskAssessment,
    ) -> CollisionReport {
        results.sort_by(|a, b| {
            by_score_then_id(self.combined_score(a), a, self.combined_score(b), b)
        });

        CollisionReport {
            candidate,
            assessment,
            all_results: results,
            class_discount_factor: self.config.class_discount_factor,
        }
    }
}

fn by_score_then_id(sa: f32, a: &SimilarityResult, sb: f32, b: &SimilarityResult) -> Ordering {
    sb.total_cmp(&sa)
        .then_with(|| a.existing.registry_id().cmp(b.existing.registry_id()))
        .then_with(|| a.existing.normalized_text().cmp(b.existing.normalized_text()))
}

/// Score every existing mark against the candidate, classify and build the
/// report.
pub fn screen(
    candidate: &Mark,
    existing: &[Mark],
    scorer: &dyn SimilarityScorer,
    classifier: &RiskClassifier,
) -> Result<CollisionReport, ContractViolation> {
    let results: Vec<SimilarityResult> = existing
        .iter()
        .map(|mark| {
            let result = scorer.score(candidate, mark);
            tracing::debug!(
                scorer = scorer.name(),
                existing = %mark.raw_text(),
                textual = result.textual_score,
                phonetic = result.phonetic_score,
                class_match = result.class_match,
                "Scored pair"
            );
            result
        })
        .collect();

    let assessment = classifier.classify(candidate, &results)?;
    Ok(classifier.build_report(candidate.clone(), results, assessment))
}
