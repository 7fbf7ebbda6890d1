//! Core domain model for markscreen trademark collision screening.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `Mark`: A normalized trademark (candidate or registry entry)
//! - `NiceClass`: A validated Nice classification number
//! - `RegistryStatus`: Active, Pending, Inactive status
//! - `RegistryRecord` / `RegistryQuery`: Registry rows and the query for them
//! - `SimilarityResult`: Per-pair textual and phonetic scores
//! - `RiskAssessment` / `CollisionReport`: The classified outcome
//! - `ConflictIndicator`: Types of overlap found between two marks

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Broken input contract between collaborators.
///
/// These are bugs upstream of the core (a scorer producing out-of-range
/// scores, a registry row without a class), never business outcomes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractViolation {
    #[error("{field} score {value} for '{mark}' is outside [0, 1]")]
    ScoreOutOfRange {
        field: &'static str,
        value: f32,
        mark: String,
    },

    #[error("result compares '{found}' but the candidate being classified is '{expected}'")]
    CandidateMismatch { expected: String, found: String },

    #[error("mark '{mark}' is missing required field '{field}'")]
    MissingField { mark: String, field: &'static str },

    #[error("no class number in '{0}'")]
    UnparseableClass(String),

    #[error("Nice class {0} is outside {min}..={max}", min = NiceClass::MIN, max = NiceClass::MAX)]
    ClassOutOfRange(u32),
}

/// A Nice classification number (1 to 45).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct NiceClass(u16);

impl NiceClass {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 45;

    pub fn new(number: u16) -> Result<Self, ContractViolation> {
        if (Self::MIN..=Self::MAX).contains(&number) {
            Ok(Self(number))
        } else {
            Err(ContractViolation::ClassOutOfRange(number.into()))
        }
    }

    /// Parse a class from registry text.
    ///
    /// Registries decorate the number ("NCL(8) 30", "33 : 10"); the last
    /// integer in the text is the class.
    pub fn parse(text: &str) -> Result<Self, ContractViolation> {
        let last = text
            .split(|c: char| !c.is_ascii_digit())
            .filter(|part| !part.is_empty())
            .last()
            .ok_or_else(|| ContractViolation::UnparseableClass(text.trim().to_string()))?;

        let number: u32 = last
            .parse()
            .map_err(|_| ContractViolation::UnparseableClass(text.trim().to_string()))?;

        u16::try_from(number)
            .map_err(|_| ContractViolation::ClassOutOfRange(number))
            .and_then(Self::new)
    }

    pub fn number(&self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for NiceClass {
    type Error = ContractViolation;

    fn try_from(number: u16) -> Result<Self, Self::Error> {
        Self::new(number)
    }
}

impl From<NiceClass> for u16 {
    fn from(class: NiceClass) -> Self {
        class.0
    }
}

impl fmt::Display for NiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegistryStatus {
    /// Registered and in force
    Active,
    /// Application under examination
    Pending,
    /// Abandoned, refused, expired or cancelled
    Inactive,
    /// Unknown status
    #[default]
    Unknown,
}

// Terms match whole words of the status text; a trailing `*` matches any
// word starting with the stem ("arquivad*" covers "arquivado", "arquivada").
const INACTIVE_STATUSES: &[&str] = &[
    "indeferid*",
    "arquivad*",
    "extint*",
    "cancelad*",
    "caducad*",
    "nulidade",
    "inactive",
    "dead",
    "abandoned",
    "cancelled",
    "expired",
    "refused",
];

const ACTIVE_STATUSES: &[&str] = &[
    "active",
    "registered",
    "granted",
    "live",
    "vigente",
    "deferid*",
    "em vigor",
];

const PENDING_STATUSES: &[&str] = &[
    "pending",
    "aguardando",
    "em exame",
    "sobrestad*",
    "publicad*",
];

/// Whether `term` occurs as a run of consecutive words in `words`.
fn matches_term(words: &[&str], term: &str) -> bool {
    let term_words: Vec<&str> = term.split(' ').collect();
    words.windows(term_words.len()).any(|window| {
        window.iter().zip(&term_words).all(|(word, term_word)| match term_word.strip_suffix('*') {
            Some(stem) => word.starts_with(stem),
            None => word == term_word,
        })
    })
}

impl From<&str> for RegistryStatus {
    fn from(s: &str) -> Self {
        let s = s.to_lowercase();
        let words: Vec<&str> = s
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let contains_any = |terms: &[&str]| terms.iter().any(|t| matches_term(&words, t));

        if contains_any(INACTIVE_STATUSES) {
            Self::Inactive
        } else if contains_any(ACTIVE_STATUSES) {
            Self::Active
        } else if contains_any(PENDING_STATUSES) {
            Self::Pending
        } else {
            Self::Unknown
        }
    }
}

/// A row as delivered by a registry source, before validation.
///
/// Every field is free text; `markscreen-features` turns it into a `Mark`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// Mark name as shown by the registry
    #[serde(default)]
    pub name: String,

    /// Class text (e.g. "30", "NCL(8) 30")
    #[serde(default)]
    pub nice_class: String,

    /// Status text (e.g. "Registro de marca em vigor")
    #[serde(default)]
    pub status: String,

    /// Process or registration number
    #[serde(default)]
    pub number: String,

    /// Owner / applicant
    #[serde(default)]
    pub owner: String,
}

impl RegistryRecord {
    pub fn new(name: impl Into<String>, nice_class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nice_class: nice_class.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = number.into();
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }
}

/// Query sent to a registry source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryQuery {
    /// The candidate mark text
    pub mark_text: String,

    /// Class the candidate is filed in
    pub nice_class: NiceClass,

    /// Maximum records to retrieve
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

impl RegistryQuery {
    pub fn new(mark_text: impl Into<String>, nice_class: NiceClass) -> Self {
        Self {
            mark_text: mark_text.into(),
            nice_class,
            limit: default_limit(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// A trademark ready for comparison.
///
/// Built once, with its normalized text and phonetic code already computed,
/// and never changed afterwards. Serialize-only: the derived fields must
/// come from `raw_text`, so marks are not read back from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Mark {
    raw_text: String,
    normalized_text: String,
    phonetic_code: String,
    nice_class: NiceClass,
    owner: String,
    registry_status: RegistryStatus,
    status_text: String,
    registry_id: String,
}

impl Mark {
    pub fn new(
        raw_text: impl Into<String>,
        normalized_text: impl Into<String>,
        phonetic_code: impl Into<String>,
        nice_class: NiceClass,
    ) -> Self {
        Self {
            raw_text: raw_text.into(),
            normalized_text: normalized_text.into(),
            phonetic_code: phonetic_code.into(),
            nice_class,
            owner: String::new(),
            registry_status: RegistryStatus::Unknown,
            status_text: String::new(),
            registry_id: String::new(),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Set the registry status, classified from the raw status text.
    pub fn with_status(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self.registry_status = RegistryStatus::from(self.status_text.as_str());
        self
    }

    pub fn with_registry_id(mut self, registry_id: impl Into<String>) -> Self {
        self.registry_id = registry_id.into();
        self
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn normalized_text(&self) -> &str {
        &self.normalized_text
    }

    pub fn phonetic_code(&self) -> &str {
        &self.phonetic_code
    }

    pub fn nice_class(&self) -> NiceClass {
        self.nice_class
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn registry_status(&self) -> RegistryStatus {
        self.registry_status
    }

    /// Status text exactly as the registry reported it.
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Registry process/registration number; empty for a candidate.
    pub fn registry_id(&self) -> &str {
        &self.registry_id
    }
}

/// Similarity between the candidate and one existing mark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult {
    pub candidate: Mark,
    pub existing: Mark,

    /// Spelling similarity (0.0 = unrelated, 1.0 = identical normalized text)
    pub textual_score: f32,

    /// Pronunciation similarity (1.0 = identical phonetic code)
    pub phonetic_score: f32,

    /// Both marks are in the same Nice class
    pub class_match: bool,
}

impl SimilarityResult {
    /// Class-weighted maximum of the textual and phonetic scores.
    ///
    /// Cross-class pairs are scaled by `class_discount_factor`.
    pub fn combined_score(&self, class_discount_factor: f32) -> f32 {
        let weight = if self.class_match {
            1.0
        } else {
            class_discount_factor
        };
        self.textual_score.max(self.phonetic_score) * weight
    }

    /// Check that both scores lie in [0, 1].
    pub fn validate(&self) -> Result<(), ContractViolation> {
        for (field, value) in [
            ("textual", self.textual_score),
            ("phonetic", self.phonetic_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ContractViolation::ScoreOutOfRange {
                    field,
                    value,
                    mark: self.existing.raw_text().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Risk tier assigned to a candidate mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "LOW RISK",
            Self::Medium => "MEDIUM RISK",
            Self::High => "HIGH RISK",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregated risk for one candidate mark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub tier: RiskTier,

    /// Results above the relevance threshold, strongest first
    pub driving_results: Vec<SimilarityResult>,

    /// One line per driving result, same order
    pub rationale: Vec<String>,

    /// Highest combined score among the driving results (0.0 if none)
    pub max_combined_score: f32,
}

impl RiskAssessment {
    /// Assessment with no evidence at all.
    pub fn empty() -> Self {
        Self {
            tier: RiskTier::Low,
            driving_results: Vec::new(),
            rationale: Vec::new(),
            max_combined_score: 0.0,
        }
    }
}

/// Final screening artifact handed to rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollisionReport {
    pub candidate: Mark,
    pub assessment: RiskAssessment,

    /// Every comparison, strongest combined score first
    pub all_results: Vec<SimilarityResult>,

    /// Cross-class weight used to order `all_results`
    pub class_discount_factor: f32,
}

impl CollisionReport {
    pub fn combined_score(&self, result: &SimilarityResult) -> f32 {
        result.combined_score(self.class_discount_factor)
    }

    /// The `n` strongest comparisons.
    pub fn top(&self, n: usize) -> &[SimilarityResult] {
        &self.all_results[..n.min(self.all_results.len())]
    }
}

/// Types of overlap between a candidate and an existing mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum ConflictIndicator {
    /// Identical normalized text
    ExactMatch,

    /// Close spelling
    TextualProximity {
        level: ProximityLevel,
        similarity: f32,
    },

    /// Identical phonetic code
    PhoneticOverlap {
        /// The phonetic code both marks share
        code: String,
    },

    /// Same Nice classification
    SameClass { class: NiceClass },

    /// The prior mark is registered / in force
    ActivePriorMark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProximityLevel {
    High,
    Moderate,
}

impl ConflictIndicator {
    /// Get a human-readable label for this indicator.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ExactMatch => "Exact Match",
            Self::TextualProximity {
                level: ProximityLevel::High,
                ..
            } => "High Textual Proximity",
            Self::TextualProximity {
                level: ProximityLevel::Moderate,
                ..
            } => "Moderate Textual Proximity",
            Self::PhoneticOverlap { .. } => "Sounds Similar",
            Self::SameClass { .. } => "Same Class",
            Self::ActivePriorMark => "Active Prior Mark",
        }
    }

    /// Get severity weight (higher = more concerning).
    pub fn severity(&self) -> f32 {
        match self {
            Self::ExactMatch => 1.0,
            Self::PhoneticOverlap { .. } => 0.8,
            Self::TextualProximity { similarity, .. } => *similarity * 0.7,
            Self::SameClass { .. } => 0.6,
            Self::ActivePriorMark => 0.4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mark(text: &str, class: u16) -> Mark {
        Mark::new(text, text.to_lowercase(), "", NiceClass::new(class).unwrap())
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(RegistryStatus::from("REGISTERED"), RegistryStatus::Active);
        assert_eq!(
            RegistryStatus::from("Registro de marca em vigor"),
            RegistryStatus::Active
        );
        assert_eq!(RegistryStatus::from("Pedido indeferido"), RegistryStatus::Inactive);
        assert_eq!(RegistryStatus::from("Deferido"), RegistryStatus::Active);
        assert_eq!(
            RegistryStatus::from("Aguardando exame de mérito"),
            RegistryStatus::Pending
        );
        assert_eq!(RegistryStatus::from("INACTIVE"), RegistryStatus::Inactive);
        assert_eq!(RegistryStatus::from("N/D"), RegistryStatus::Unknown);
    }

    #[test]
    fn test_status_matches_whole_words() {
        assert_eq!(RegistryStatus::from("Delivered"), RegistryStatus::Unknown);
        assert_eq!(RegistryStatus::from("Opposition deadline"), RegistryStatus::Unknown);
        assert_eq!(RegistryStatus::from("Interactive filing"), RegistryStatus::Unknown);
        assert_eq!(RegistryStatus::from("LIVE/REGISTERED"), RegistryStatus::Active);
        assert_eq!(RegistryStatus::from("DEAD/ABANDONED"), RegistryStatus::Inactive);
        assert_eq!(RegistryStatus::from("Pedido arquivado"), RegistryStatus::Inactive);
        assert_eq!(RegistryStatus::from("Em exame formal"), RegistryStatus::Pending);
    }

    #[test]
    fn test_nice_class_parse() {
        assert_eq!(NiceClass::parse("30").unwrap().number(), 30);
        assert_eq!(NiceClass::parse("NCL(8) 30").unwrap().number(), 30);
        assert_eq!(NiceClass::parse("33 : 10").unwrap().number(), 10);
        assert!(matches!(
            NiceClass::parse("services"),
            Err(ContractViolation::UnparseableClass(_))
        ));
        assert_eq!(
            NiceClass::parse("99"),
            Err(ContractViolation::ClassOutOfRange(99))
        );
        assert_eq!(
            NiceClass::parse("123456789"),
            Err(ContractViolation::ClassOutOfRange(123456789))
        );
    }

    #[test]
    fn test_nice_class_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<NiceClass>("0").is_err());
        assert_eq!(serde_json::from_str::<NiceClass>("25").unwrap().number(), 25);
    }

    #[test]
    fn test_mark_serialization() {
        let value = serde_json::to_value(mark("ACME", 9).with_registry_id("900001").with_status("vigente")).unwrap();
        assert_eq!(value["raw_text"], "ACME");
        assert_eq!(value["normalized_text"], "acme");
        assert_eq!(value["nice_class"], 9);
        assert_eq!(value["registry_status"], "ACTIVE");
        assert_eq!(value["status_text"], "vigente");
        assert_eq!(value["registry_id"], "900001");
    }

    #[test]
    fn test_combined_score_discounts_cross_class() {
        let result = SimilarityResult {
            candidate: mark("ACME", 9),
            existing: mark("ACME", 43),
            textual_score: 1.0,
            phonetic_score: 0.4,
            class_match: false,
        };
        assert_eq!(result.combined_score(0.5), 0.5);
    }

    #[test]
    fn test_validate_rejects_out_of_range_scores() {
        let result = SimilarityResult {
            candidate: mark("ACME", 9),
            existing: mark("AKME", 9),
            textual_score: 1.2,
            phonetic_score: 0.0,
            class_match: true,
        };
        assert!(matches!(
            result.validate(),
            Err(ContractViolation::ScoreOutOfRange { field: "textual", .. })
        ));

        let nan = SimilarityResult {
            phonetic_score: f32::NAN,
            textual_score: 0.5,
            ..result
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_tier_ordering() {
        assert!(RiskTier::High > RiskTier::Medium);
        assert!(RiskTier::Medium > RiskTier::Low);
        assert_eq!(RiskTier::High.to_string(), "HIGH RISK");
    }

    #[test]
    fn test_indicator_severity() {
        assert!(
            ConflictIndicator::ExactMatch.severity()
                > ConflictIndicator::PhoneticOverlap { code: "A250".into() }.severity()
        );
    }
}
