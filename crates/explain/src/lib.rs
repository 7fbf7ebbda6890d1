//! Explanation and rendering for trademark collision reports.
//!
//! Converts a `CollisionReport` into human-readable output: per-result
//! conflict indicators, tier-specific recommendations, the preliminary
//! screening report and a draft registrability opinion.

use markscreen_model::{
    CollisionReport, ConflictIndicator, ProximityLevel, RegistryStatus, RiskTier,
    SimilarityResult,
};
use serde::{Deserialize, Serialize};

/// Textual similarity at or above which proximity is "high".
pub const HIGH_PROXIMITY: f32 = 0.80;
/// Textual similarity at or above which proximity is "moderate".
pub const MODERATE_PROXIMITY: f32 = 0.65;

/// Results listed in the report's risk determination.
pub const REPORT_TOP_RESULTS: usize = 5;
/// Prior marks cited in the draft opinion.
pub const OPINION_CITATIONS: usize = 3;

/// A structured explanation for one conflict indicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    /// Short summary (1 line)
    pub summary: String,

    /// Detailed explanation (1-2 sentences)
    pub detail: String,

    /// Severity level (0.0 - 1.0)
    pub severity: f32,

    /// Evidence items supporting this explanation
    pub evidence: Vec<EvidenceItem>,
}

/// A piece of evidence supporting an indicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Type of evidence
    pub kind: String,

    /// The specific value or match
    pub value: String,

    /// Optional context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Everything the renderer needs that is not part of the report itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportContext {
    pub business_segment: String,
    /// Registry the records came from (e.g. "CSV", "HTTP")
    pub source_label: String,
    /// Phonetic algorithm used for scoring
    pub phonetic_algorithm: String,
    /// Report date, already formatted
    pub date: String,
}

/// Derive the conflict indicators for one comparison.
pub fn indicators(result: &SimilarityResult) -> Vec<ConflictIndicator> {
    let mut found = Vec::new();
    let candidate = &result.candidate;
    let existing = &result.existing;

    if !candidate.normalized_text().is_empty()
        && candidate.normalized_text() == existing.normalized_text()
    {
        found.push(ConflictIndicator::ExactMatch);
    } else if result.textual_score >= HIGH_PROXIMITY {
        found.push(ConflictIndicator::TextualProximity {
            level: ProximityLevel::High,
            similarity: result.textual_score,
        });
    } else if result.textual_score >= MODERATE_PROXIMITY {
        found.push(ConflictIndicator::TextualProximity {
            level: ProximityLevel::Moderate,
            similarity: result.textual_score,
        });
    }

    if !candidate.phonetic_code().is_empty() && candidate.phonetic_code() == existing.phonetic_code() {
        found.push(ConflictIndicator::PhoneticOverlap {
            code: existing.phonetic_code().to_string(),
        });
    }

    if result.class_match {
        found.push(ConflictIndicator::SameClass {
            class: existing.nice_class(),
        });
    }

    if existing.registry_status() == RegistryStatus::Active {
        found.push(ConflictIndicator::ActivePriorMark);
    }

    found
}

/// Generate explanations for one comparison.
pub fn explain_result(result: &SimilarityResult) -> Vec<Explanation> {
    indicators(result)
        .iter()
        .map(|indicator| {
            explain_indicator(
                indicator,
                result.candidate.raw_text(),
                result.existing.raw_text(),
            )
        })
        .collect()
}

/// Generate the explanation for a single indicator.
pub fn explain_indicator(
    indicator: &ConflictIndicator,
    candidate_text: &str,
    mark_text: &str,
) -> Explanation {
    let severity = indicator.severity();
    match indicator {
        ConflictIndicator::ExactMatch => Explanation {
            summary: "Exact match found".to_string(),
            detail: format!(
                "The prior mark '{}' is identical to '{}' once case, accents and punctuation are ignored.",
                mark_text, candidate_text
            ),
            severity,
            evidence: vec![EvidenceItem {
                kind: "exact_match".to_string(),
                value: mark_text.to_string(),
                context: None,
            }],
        },

        ConflictIndicator::TextualProximity { level, similarity } => Explanation {
            summary: match level {
                ProximityLevel::High => "High textual proximity".to_string(),
                ProximityLevel::Moderate => "Moderate textual proximity".to_string(),
            },
            detail: format!(
                "The prior mark '{}' is {:.0}% similar in spelling to '{}'.",
                mark_text,
                similarity * 100.0,
                candidate_text
            ),
            severity,
            evidence: vec![EvidenceItem {
                kind: "textual_similarity".to_string(),
                value: format!("{:.2}", similarity),
                context: None,
            }],
        },

        ConflictIndicator::PhoneticOverlap { code } => Explanation {
            summary: "Sounds similar".to_string(),
            detail: format!(
                "The prior mark '{}' sounds like '{}'. Consumers may confuse the two when spoken aloud.",
                mark_text, candidate_text
            ),
            severity,
            evidence: vec![EvidenceItem {
                kind: "phonetic_code".to_string(),
                value: code.clone(),
                context: Some(format!("Both encode to: {}", code)),
            }],
        },

        ConflictIndicator::SameClass { class } => Explanation {
            summary: format!("Same class ({})", class),
            detail: format!(
                "Both marks cover Nice class {}, which raises the likelihood of confusion in the marketplace.",
                class
            ),
            severity,
            evidence: vec![EvidenceItem {
                kind: "nice_class".to_string(),
                value: class.to_string(),
                context: None,
            }],
        },

        ConflictIndicator::ActivePriorMark => Explanation {
            summary: "Prior mark is active".to_string(),
            detail: format!(
                "The prior mark '{}' appears to be registered and in force.",
                mark_text
            ),
            severity,
            evidence: vec![],
        },
    }
}

/// One-line conflict rationale for a comparison.
pub fn conflict_rationale(result: &SimilarityResult) -> String {
    let reasons: Vec<String> = indicators(result)
        .iter()
        .map(|indicator| match indicator {
            ConflictIndicator::ExactMatch => "identical normalized text".to_string(),
            ConflictIndicator::TextualProximity {
                level: ProximityLevel::High,
                ..
            } => "high textual proximity".to_string(),
            ConflictIndicator::TextualProximity {
                level: ProximityLevel::Moderate,
                ..
            } => "moderate textual proximity".to_string(),
            ConflictIndicator::PhoneticOverlap { code } => {
                format!("phonetic overlap (code {})", code)
            }
            ConflictIndicator::SameClass { .. } => "identical Nice class".to_string(),
            ConflictIndicator::ActivePriorMark => {
                "prior mark appears active/registered".to_string()
            }
        })
        .collect();

    if reasons.is_empty() {
        "limited overlap indicators".to_string()
    } else {
        reasons.join("; ")
    }
}

/// Next steps for a tier, most specific first.
pub fn recommendations(tier: RiskTier) -> Vec<&'static str> {
    let lead = match tier {
        RiskTier::High => {
            "Consider naming alternatives before filing to reduce refusal and opposition exposure."
        }
        RiskTier::Medium => {
            "Proceed with caution: validate coexistence feasibility and strengthen distinctive elements."
        }
        RiskTier::Low => {
            "Low conflict indicators: still validate with an expanded search before a final registrability opinion."
        }
    };

    vec![
        lead,
        "Run an expanded registry search using radicals, spelling variants, singular/plural and compound expressions.",
        "Assess conceptual proximity (meaning/idea) and phonetic variants beyond the basic phonetic code.",
        "Confirm status and scope of cited records (class specification, goods/services, owner and distinctiveness).",
        "If relevant conflicts appear, consider mitigation: composite mark, figurative element, specification refinement or alternative naming.",
    ]
}

/// Render the preliminary screening report.
pub fn render_report(report: &CollisionReport, context: &ReportContext) -> String {
    let candidate = &report.candidate;
    let tier = report.assessment.tier;

    let mut lines = vec![
        "PRIOR MARK SEARCH - PRELIMINARY SCREENING (INTERNAL USE)".to_string(),
        format!("Date: {}", context.date),
        String::new(),
        "I. Candidate Mark Information".to_string(),
        format!("- Proposed trademark: {}", candidate.raw_text()),
        format!("- Nice class: {}", candidate.nice_class()),
        format!("- Business segment: {}", context.business_segment),
        String::new(),
        "II. Data Source".to_string(),
        format!("- Records source: {}", context.source_label),
        format!("- Records compared: {}", report.all_results.len()),
        String::new(),
        "III. Methodological Review".to_string(),
        "This preliminary screening reviewed prior records with emphasis on:".to_string(),
        "(a) textual similarity (edit distance and word overlap),".to_string(),
        format!("(b) phonetic proximity ({}), and", context.phonetic_algorithm),
        format!(
            "(c) class-based conflict priority (cross-class matches weighted x{:.2}).",
            report.class_discount_factor
        ),
        String::new(),
        "IV. Risk Determination".to_string(),
        format!("Result: {}", tier),
    ];

    let top = report.top(REPORT_TOP_RESULTS);
    if top.is_empty() {
        lines.push("Grounds: no prior records available for comparative assessment.".to_string());
    } else {
        lines.push("Grounds (top indications):".to_string());
        for (idx, result) in top.iter().enumerate() {
            let existing = &result.existing;
            let mut extra = Vec::new();
            if !existing.registry_id().is_empty() {
                extra.push(format!("Process/No.: {}", existing.registry_id()));
            }
            if !existing.owner().is_empty() {
                extra.push(format!("Owner: {}", existing.owner()));
            }
            let extra = if extra.is_empty() {
                String::new()
            } else {
                format!(" | {}", extra.join("; "))
            };
            let status = if existing.status_text().is_empty() {
                "N/D"
            } else {
                existing.status_text()
            };

            lines.push(format!("{}. Prior mark: {}", idx + 1, existing.raw_text()));
            lines.push(format!(
                "   - Class/Status: {} / {}{}",
                existing.nice_class(),
                status,
                extra
            ));
            lines.push(format!(
                "   - Similarity index: {:.1}% textual, {:.1}% phonetic",
                result.textual_score * 100.0,
                result.phonetic_score * 100.0
            ));
            lines.push(format!("   - Conflict rationale: {}.", conflict_rationale(result)));
            lines.push(format!(
                "   - Weighted conflict score: {:.2}",
                report.combined_score(result)
            ));
        }
    }

    lines.push(String::new());
    lines.push("V. Recommendations (next steps)".to_string());
    lines.extend(recommendations(tier).into_iter().map(|r| format!("- {}", r)));

    lines.extend(
        [
            "",
            "VI. Professional Note",
            "This report is a screening aid for internal legal triage and does not replace",
            "a full registrability opinion, including jurisdiction-specific case law review,",
            "market coexistence evidence, examiner practice, and goods/services specification analysis.",
        ]
        .map(String::from),
    );

    lines.join("\n")
}

/// Render the draft registrability opinion.
pub fn draft_opinion(report: &CollisionReport, context: &ReportContext) -> String {
    let citations: Vec<String> = report
        .assessment
        .driving_results
        .iter()
        .take(OPINION_CITATIONS)
        .map(|result| {
            let existing = &result.existing;
            let mut citation = existing.raw_text().to_string();
            if !existing.registry_id().is_empty() {
                citation.push_str(&format!(" (proc. {})", existing.registry_id()));
            }
            if !existing.owner().is_empty() {
                citation.push_str(&format!(", owned by {}", existing.owner()));
            }
            citation
        })
        .collect();

    let cited = if citations.is_empty() {
        "relevant prior marks".to_string()
    } else {
        citations.join("; ")
    };

    let (finding, guidance) = match report.assessment.tier {
        RiskTier::High => (
            format!(
                "a relevant collision was identified with {}, including identical or nearly identical signs \
                 in the same class, which substantially raises the risk of refusal and/or opposition. \
                 The scenario is consistent with a likelihood of confusion or association by the average consumer.",
                cited
            ),
            "Filing the word mark on its own is not recommended. As mitigation consider: (i) a composite mark \
             with a strong distinctive element; (ii) a substantial phonetic/spelling change; (iii) repositioning \
             the sign and narrowing the goods/services specification; and (iv) a new round of searches \
             (radicals, variants and compounds) before deciding to file."
                .to_string(),
        ),
        RiskTier::Medium => (
            format!(
                "potentially conflicting prior marks were found ({}), with phonetic and/or textual similarity \
                 in the same or related classes, which may lead to office actions or opposition depending on \
                 the examiner's view.",
                cited
            ),
            "Filing may be considered with caution. Strengthen distinctiveness (mixed/figurative mark), adjust \
             the specification and run an expanded search for phonetic variants, spellings and compound marks \
             before the final decision."
                .to_string(),
        ),
        RiskTier::Low => (
            "no strong prior marks with a clear potential for direct confusion by the average consumer were \
             identified; an expanded search and validation of the specification remain recommended."
                .to_string(),
            "In principle, filing appears viable, subject to final review and to possible third-party oppositions."
                .to_string(),
        ),
    };

    format!(
        "PRELIMINARY REGISTRABILITY OPINION (DRAFT)\n\
         \n\
         Date: {date}\n\
         \n\
         Proposed mark: {mark}\n\
         Class (Nice): {class}\n\
         Segment: {segment}\n\
         \n\
         Summary:\n\
         Based on the prior mark search performed, we conclude that {finding}\n\
         \n\
         Guidance:\n\
         {guidance}\n\
         \n\
         Note:\n\
         Automatically generated draft for internal support and review by the responsible attorney. It does not\n\
         replace a full opinion, including specification analysis, filing strategy, coexistence and examiner practice.\n",
        date = context.date,
        mark = report.candidate.raw_text(),
        class = report.candidate.nice_class(),
        segment = context.business_segment,
        finding = finding,
        guidance = guidance,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use markscreen_model::{Mark, NiceClass, RiskAssessment};
    use pretty_assertions::assert_eq;

    fn mark(text: &str, normalized: &str, code: &str, class: u16) -> Mark {
        Mark::new(text, normalized, code, NiceClass::new(class).unwrap())
    }

    fn akme_result() -> SimilarityResult {
        SimilarityResult {
            candidate: mark("ACME", "acme", "A250", 9),
            existing: mark("AKME", "akme", "A250", 9)
                .with_registry_id("900001")
                .with_owner("Akme Ltda")
                .with_status("Registro de marca em vigor"),
            textual_score: 0.75,
            phonetic_score: 1.0,
            class_match: true,
        }
    }

    fn report(results: Vec<SimilarityResult>, tier: RiskTier) -> CollisionReport {
        CollisionReport {
            candidate: mark("ACME", "acme", "A250", 9),
            assessment: RiskAssessment {
                tier,
                driving_results: results.clone(),
                rationale: Vec::new(),
                max_combined_score: if results.is_empty() { 0.0 } else { 1.0 },
            },
            all_results: results,
            class_discount_factor: 0.5,
        }
    }

    fn context() -> ReportContext {
        ReportContext {
            business_segment: "Software".to_string(),
            source_label: "CSV".to_string(),
            phonetic_algorithm: "soundex".to_string(),
            date: "2026-01-15".to_string(),
        }
    }

    #[test]
    fn test_indicators_for_variant() {
        let found = indicators(&akme_result());
        assert_eq!(
            found,
            vec![
                ConflictIndicator::TextualProximity {
                    level: ProximityLevel::Moderate,
                    similarity: 0.75
                },
                ConflictIndicator::PhoneticOverlap {
                    code: "A250".to_string()
                },
                ConflictIndicator::SameClass {
                    class: NiceClass::new(9).unwrap()
                },
                ConflictIndicator::ActivePriorMark,
            ]
        );
    }

    #[test]
    fn test_exact_match_indicator() {
        let result = SimilarityResult {
            existing: mark("Acme.", "acme", "A250", 43),
            textual_score: 1.0,
            class_match: false,
            ..akme_result()
        };
        let found = indicators(&result);
        assert_eq!(found[0], ConflictIndicator::ExactMatch);
        assert!(!found.iter().any(|i| matches!(i, ConflictIndicator::SameClass { .. })));
    }

    #[test]
    fn test_limited_overlap_rationale() {
        let result = SimilarityResult {
            existing: mark("BLOOMFIELD", "bloomfield", "B451", 43),
            textual_score: 0.1,
            phonetic_score: 0.25,
            class_match: false,
            ..akme_result()
        };
        assert_eq!(conflict_rationale(&result), "limited overlap indicators");
    }

    #[test]
    fn test_explain_phonetic() {
        let explanations = explain_result(&akme_result());
        let phonetic = explanations
            .iter()
            .find(|e| e.summary == "Sounds similar")
            .unwrap();
        assert!(phonetic.detail.contains("sounds like"));
        assert_eq!(phonetic.evidence[0].value, "A250");
    }

    #[test]
    fn test_recommendations_lead_with_tier() {
        assert!(recommendations(RiskTier::High)[0].contains("naming alternatives"));
        assert!(recommendations(RiskTier::Medium)[0].starts_with("Proceed with caution"));
        assert_eq!(recommendations(RiskTier::Low).len(), 5);
    }

    #[test]
    fn test_render_report() {
        let text = render_report(&report(vec![akme_result()], RiskTier::High), &context());
        assert!(text.contains("Result: HIGH RISK"));
        assert!(text.contains("1. Prior mark: AKME"));
        assert!(text.contains("Process/No.: 900001; Owner: Akme Ltda"));
        assert!(text.contains("Similarity index: 75.0% textual, 100.0% phonetic"));
        assert!(text.contains("Weighted conflict score: 1.00"));
        assert!(text.contains("phonetic proximity (soundex)"));
    }

    #[test]
    fn test_render_report_without_records() {
        let text = render_report(&report(Vec::new(), RiskTier::Low), &context());
        assert!(text.contains("Grounds: no prior records available"));
        assert!(text.contains("Result: LOW RISK"));
    }

    #[test]
    fn test_draft_opinion_cites_prior_marks() {
        let text = draft_opinion(&report(vec![akme_result()], RiskTier::High), &context());
        assert!(text.contains("AKME (proc. 900001), owned by Akme Ltda"));
        assert!(text.contains("Filing the word mark on its own is not recommended"));
        assert!(text.contains("Proposed mark: ACME"));

        let low = draft_opinion(&report(Vec::new(), RiskTier::Low), &context());
        assert!(low.contains("filing appears viable"));
    }
}
