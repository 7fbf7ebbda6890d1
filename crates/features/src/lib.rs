//! Feature extraction for trademark comparison.
//!
//! Provides pure functions for computing the features used in scoring:
//! - Text normalization
//! - Phonetic encodings (Soundex, Metaphone)
//! - Edit-distance, token-overlap and phonetic-code similarity
//! - Conversion of registry rows into `Mark`s

use markscreen_model::{ContractViolation, Mark, NiceClass, RegistryRecord};
use rphonetic::{Encoder, Metaphone, Soundex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize mark text for comparison.
///
/// Lowercases, strips diacritics, drops periods and apostrophes
/// ("A.C.M.E." and "acme" compare equal), turns hyphens and other
/// punctuation into word breaks, keeps `&` as its own word and collapses
/// whitespace. Idempotent.
pub fn normalize(raw_text: &str) -> String {
    let mut out = String::with_capacity(raw_text.len());

    for ch in raw_text.nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        for lc in ch.to_lowercase() {
            match lc {
                c if c.is_alphanumeric() => out.push(c),
                '&' => out.push_str(" & "),
                '.' | '\'' | '\u{2019}' => {}
                _ => out.push(' '),
            }
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Encodes normalized text into a phonetic code.
///
/// Implementations must be pure: the same text always yields the same code,
/// and empty text yields an empty code.
pub trait PhoneticEncoder: Send + Sync {
    /// Encode a single word made of ASCII letters.
    fn encode_word(&self, word: &str) -> String;

    /// Algorithm name for logs and reports.
    fn name(&self) -> &'static str;

    /// Encode a whole mark, word by word.
    ///
    /// Each word is reduced to its ASCII letters before encoding; words that
    /// encode to nothing (numbers, symbols) are skipped.
    fn encode(&self, normalized_text: &str) -> String {
        normalized_text
            .split_whitespace()
            .filter_map(|word| {
                let letters: String = word
                    .chars()
                    .filter(char::is_ascii_alphabetic)
                    .map(|c| c.to_ascii_uppercase())
                    .collect();
                if letters.is_empty() {
                    return None;
                }
                let code = self.encode_word(&letters);
                (!code.is_empty()).then_some(code)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Soundex, one four-character code per word.
#[derive(Default)]
pub struct SoundexEncoder {
    soundex: Soundex,
}

impl PhoneticEncoder for SoundexEncoder {
    fn encode_word(&self, word: &str) -> String {
        self.soundex.encode(word)
    }

    fn name(&self) -> &'static str {
        "soundex"
    }
}

/// Metaphone, closer to English pronunciation than Soundex.
#[derive(Default)]
pub struct MetaphoneEncoder {
    metaphone: Metaphone,
}

impl PhoneticEncoder for MetaphoneEncoder {
    fn encode_word(&self, word: &str) -> String {
        self.metaphone.encode(word)
    }

    fn name(&self) -> &'static str {
        "metaphone"
    }
}

/// Configurable choice of phonetic algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhoneticAlgorithm {
    #[default]
    Soundex,
    Metaphone,
}

impl PhoneticAlgorithm {
    pub fn encoder(&self) -> Box<dyn PhoneticEncoder> {
        match self {
            Self::Soundex => Box::new(SoundexEncoder::default()),
            Self::Metaphone => Box::new(MetaphoneEncoder::default()),
        }
    }
}

impl std::str::FromStr for PhoneticAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "soundex" => Ok(Self::Soundex),
            "metaphone" => Ok(Self::Metaphone),
            other => Err(format!("unknown phonetic algorithm '{}'", other)),
        }
    }
}

/// Normalized Levenshtein similarity, 0.0 when either side is empty.
pub fn edit_similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(a, b) as f32
}

/// Jaccard overlap of the word sets, 0.0 when either side is empty.
///
/// Catches reordered and extended marks ("acme labs" vs "labs acme").
pub fn token_overlap(a: &str, b: &str) -> f32 {
    let tokens_a: HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f32 / union as f32
}

/// Agreement between two phonetic codes.
///
/// 1.0 for identical codes, proportional to edit distance otherwise.
pub fn code_similarity(a: &str, b: &str) -> f32 {
    edit_similarity(a, b)
}

/// Build a `Mark` from text and class, computing its derived fields.
pub fn build_mark(raw_text: &str, nice_class: NiceClass, encoder: &dyn PhoneticEncoder) -> Mark {
    let normalized = normalize(raw_text);
    let phonetic = encoder.encode(&normalized);
    Mark::new(raw_text, normalized, phonetic, nice_class)
}

/// Validate a registry row and convert it into a `Mark`.
pub fn ingest(record: &RegistryRecord, encoder: &dyn PhoneticEncoder) -> Result<Mark, ContractViolation> {
    let name = record.name.trim();
    if name.is_empty() {
        return Err(ContractViolation::MissingField {
            mark: record.number.trim().to_string(),
            field: "name",
        });
    }
    if record.nice_class.trim().is_empty() {
        return Err(ContractViolation::MissingField {
            mark: name.to_string(),
            field: "nice_class",
        });
    }

    let nice_class = NiceClass::parse(&record.nice_class)?;

    Ok(build_mark(name, nice_class, encoder)
        .with_owner(record.owner.trim())
        .with_status(record.status.trim())
        .with_registry_id(record.number.trim()))
}
