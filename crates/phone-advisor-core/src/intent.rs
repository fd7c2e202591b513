//! Rule-based intent classification.
//!
//! The classifier holds an ordered table of [`Rule`]s. Each rule names an
//! intent kind, a confidence, and a list of case-insensitive surface
//! patterns. Rules are tried in priority order and the first matching
//! pattern wins:
//!
//! | Priority | Kind | Confidence | Example |
//! |----------|------|------------|---------|
//! | 1 | single_entity | 0.9 | "specs of S23 Ultra" |
//! | 2 | comparison | 0.9 | "compare S23 and S22", "S23 vs A54" |
//! | 3 | filtered_search | 0.8 | "best phone under $800", "cheap phones" |
//! | 4 | feature_query | 0.8 | "best camera samsung" |
//! | 5 | use_case_recommendation | 0.8 | "best phone for gaming" |
//!
//! When no rule matches, model-shaped fragments ("s23 ultra", "z flip")
//! are resolved against the catalog and any hit yields a `single_entity`
//! result at 0.7. Otherwise the query is `unknown` at 0.0.
//!
//! Classification is deterministic and performs no I/O.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

use crate::catalog::{CatalogSnapshot, DEFAULT_THRESHOLD};
use crate::models::{Intent, IntentResult, UseCase};

/// Confidence of a result produced by the model-fragment fallback.
pub const FALLBACK_CONFIDENCE: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    SingleEntity,
    Comparison,
    FilteredSearch,
    FeatureQuery,
    UseCase,
}

/// Pattern table in priority order.
const RULES: &[(RuleKind, f32, &[&str])] = &[
    (
        RuleKind::SingleEntity,
        0.9,
        &[
            r"\bspecs? of (.+)",
            r"\bdetails? of (.+)",
            r"\binformation about (.+)",
            r"\btell me about (.+)",
        ],
    ),
    (
        RuleKind::Comparison,
        0.9,
        &[
            r"\bcompare (.+) (?:and|with|to) (.+)",
            r"\bcomparison between (.+) and (.+)",
            r"\bdifference between (.+) and (.+)",
            r"(.+) vs\.? (.+)",
            r"(.+) versus (.+)",
        ],
    ),
    (
        RuleKind::FilteredSearch,
        0.8,
        &[
            r"\bbest\b.*\bunder \$?\d",
            r"\bphones?\b.*\bunder \$?\d",
            r"\bcheap",
            r"\bbudget\b",
            r"\baffordable\b",
        ],
    ),
    (
        RuleKind::FeatureQuery,
        0.8,
        &[
            r"\bwhich\b.*\bbest\b.*\bcamera",
            r"\bbest\b.*\bcamera",
            r"\bhighest\b.*\bcamera",
            r"\bbest\b.*\bbattery",
            r"\blongest\b.*\bbattery",
            r"\bbest\b.*\bdisplay",
            r"\bbest\b.*\bperformance",
        ],
    ),
    (
        RuleKind::UseCase,
        0.8,
        &[
            r"\bbest\b.*\bfor (?:photography|gaming|business|students)\b",
            r"\brecommend\b.*\bfor\b",
            r"\bwhich\b.*\bshould i buy\b.*\bfor\b",
        ],
    ),
];

/// Model-shaped fragments scanned for when no rule matches.
const MODEL_FRAGMENT: &str = r"\b(?:galaxy\s*)?(?:s\d+(?:\s*(?:ultra|plus)\b|\+)?|note\s*\d+|z\s*(?:flip|fold)\s*\d*|a\d+)";

const BUDGET_CAP: &str = r"\bunder\s*\$?\s*(\d[\d,]*(?:\.\d+)?)\s*(k\b)?";

const USE_CASE_KEYWORD: &str =
    r"\b(photography|photos?|gaming|games?|business|work|students?|college)\b";

/// Trailing qualifiers cut from captured literals.
const QUALIFIERS: &[&str] = &[" for ", " in terms of ", " regarding "];

struct Rule {
    kind: RuleKind,
    confidence: f32,
    patterns: Vec<Regex>,
}

/// Compiled classifier. Build once and share.
pub struct IntentClassifier {
    rules: Vec<Rule>,
    model_fragment: Regex,
    budget_cap: Regex,
    use_case: Regex,
    threshold: u8,
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("Invalid classifier pattern: {}", pattern))
}

impl IntentClassifier {
    pub fn new() -> Result<Self> {
        let rules = RULES
            .iter()
            .map(|(kind, confidence, patterns)| {
                Ok(Rule {
                    kind: *kind,
                    confidence: *confidence,
                    patterns: patterns.iter().map(|p| compile(p)).collect::<Result<_>>()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules,
            model_fragment: compile(MODEL_FRAGMENT)?,
            budget_cap: compile(BUDGET_CAP)?,
            use_case: compile(USE_CASE_KEYWORD)?,
            threshold: DEFAULT_THRESHOLD,
        })
    }

    /// Resolution threshold used by the fragment fallback.
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    /// Classify a query against the given catalog.
    pub fn classify(&self, query: &str, catalog: &CatalogSnapshot) -> IntentResult {
        let query = query.trim();
        if query.is_empty() {
            return IntentResult::unknown();
        }

        for rule in &self.rules {
            for pattern in &rule.patterns {
                if let Some(caps) = pattern.captures(query) {
                    return self.from_rule(rule, &caps, query);
                }
            }
        }

        self.fallback(query, catalog)
    }

    fn from_rule(&self, rule: &Rule, caps: &regex::Captures<'_>, query: &str) -> IntentResult {
        let literals = || {
            caps.iter()
                .skip(1)
                .flatten()
                .map(|m| clean_literal(m.as_str()))
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
        };

        let (intent, extracted_literals) = match rule.kind {
            RuleKind::SingleEntity => (Intent::SingleEntity, literals()),
            RuleKind::Comparison => (Intent::Comparison, literals()),
            RuleKind::FilteredSearch => (
                Intent::FilteredSearch {
                    budget_cap: self.parse_budget_cap(query),
                },
                Vec::new(),
            ),
            RuleKind::FeatureQuery => (Intent::FeatureQuery, Vec::new()),
            RuleKind::UseCase => (
                Intent::UseCaseRecommendation {
                    use_case: self.detect_use_case(query),
                },
                Vec::new(),
            ),
        };

        IntentResult {
            intent,
            confidence: rule.confidence,
            extracted_literals,
        }
    }

    fn fallback(&self, query: &str, catalog: &CatalogSnapshot) -> IntentResult {
        let mut names: Vec<String> = Vec::new();
        for fragment in self.model_fragment.find_iter(query) {
            if let Some(best) = catalog.best_match(fragment.as_str(), self.threshold) {
                if !names.contains(&best.canonical_name) {
                    names.push(best.canonical_name);
                }
            }
        }
        if names.is_empty() {
            if let Some(best) = catalog.best_match(query, self.threshold) {
                names.push(best.canonical_name);
            }
        }

        if names.is_empty() {
            return IntentResult::unknown();
        }
        IntentResult {
            intent: Intent::SingleEntity,
            confidence: FALLBACK_CONFIDENCE,
            extracted_literals: names,
        }
    }

    /// Price cap from "under $1,000" or "under 1.5k".
    fn parse_budget_cap(&self, query: &str) -> Option<f64> {
        let caps = self.budget_cap.captures(query)?;
        let amount: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
        Some(if caps.get(2).is_some() {
            amount * 1000.0
        } else {
            amount
        })
    }

    fn detect_use_case(&self, query: &str) -> Option<UseCase> {
        self.use_case
            .captures_iter(query)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| match m.as_str().to_ascii_lowercase().as_str() {
                "photography" | "photo" | "photos" => Some(UseCase::Photography),
                "gaming" | "game" | "games" => Some(UseCase::Gaming),
                "business" | "work" => Some(UseCase::Business),
                "student" | "students" | "college" => Some(UseCase::Students),
                _ => None,
            })
    }
}

/// Trim whitespace and trailing punctuation, and drop a trailing qualifier.
fn clean_literal(raw: &str) -> String {
    let mut literal = raw.trim();
    let lowered = literal.to_ascii_lowercase();
    if let Some(cut) = QUALIFIERS.iter().filter_map(|q| lowered.find(q)).min() {
        literal = &literal[..cut];
    }
    literal
        .trim_end_matches(|c: char| matches!(c, '?' | '!' | '.' | ',') || c.is_whitespace())
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> IntentClassifier {
        IntentClassifier::new().unwrap()
    }

    fn catalog() -> CatalogSnapshot {
        CatalogSnapshot::new([
            "Galaxy S23 Ultra",
            "Galaxy S23",
            "Galaxy S22 Ultra",
            "Galaxy A54",
            "Galaxy Z Flip5",
        ])
    }

    fn classify(query: &str) -> IntentResult {
        classifier().classify(query, &catalog())
    }

    #[test]
    fn test_comparison_keeps_literal_order() {
        let result = classify("compare Galaxy A and Galaxy B");
        assert_eq!(result.intent, Intent::Comparison);
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.extracted_literals, vec!["Galaxy A", "Galaxy B"]);
    }

    #[test]
    fn test_vs_comparison_strips_punctuation() {
        let result = classify("Galaxy S23 vs. S22 Ultra?");
        assert_eq!(result.intent, Intent::Comparison);
        assert_eq!(result.extracted_literals, vec!["Galaxy S23", "S22 Ultra"]);
    }

    #[test]
    fn test_feature_query() {
        let result = classify("best camera samsung");
        assert_eq!(result.intent, Intent::FeatureQuery);
        assert_eq!(result.confidence, 0.8);
        assert!(result.extracted_literals.is_empty());
    }

    #[test]
    fn test_filtered_search_parses_budget() {
        let result = classify("best battery under $1000");
        assert_eq!(
            result.intent,
            Intent::FilteredSearch {
                budget_cap: Some(1000.0)
            }
        );
        assert_eq!(result.confidence, 0.8);

        let result = classify("Phones with good screens under $1,200?");
        assert_eq!(
            result.intent,
            Intent::FilteredSearch {
                budget_cap: Some(1200.0)
            }
        );
    }

    #[test]
    fn test_filtered_search_without_amount() {
        let result = classify("show me something cheap");
        assert_eq!(result.intent, Intent::FilteredSearch { budget_cap: None });
    }

    #[test]
    fn test_single_entity_literal_cleanup() {
        let result = classify("Tell me about the S23 Ultra for photography?");
        assert_eq!(result.intent, Intent::SingleEntity);
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.extracted_literals, vec!["the S23 Ultra"]);

        let result = classify("specs of Nonexistent Phone 99");
        assert_eq!(result.extracted_literals, vec!["Nonexistent Phone 99"]);
    }

    #[test]
    fn test_single_entity_precedes_comparison() {
        let result = classify("details of S23 vs S22");
        assert_eq!(result.intent, Intent::SingleEntity);
    }

    #[test]
    fn test_use_case_detection() {
        let result = classify("best phone for gaming");
        assert_eq!(
            result.intent,
            Intent::UseCaseRecommendation {
                use_case: Some(UseCase::Gaming)
            }
        );

        let result = classify("Can you recommend a phone for college?");
        assert_eq!(
            result.intent,
            Intent::UseCaseRecommendation {
                use_case: Some(UseCase::Students)
            }
        );

        let result = classify("which one should I buy for my dad");
        assert_eq!(
            result.intent,
            Intent::UseCaseRecommendation { use_case: None }
        );
    }

    #[test]
    fn test_fallback_resolves_fragments() {
        let result = classify("is the z flip 5 waterproof");
        assert_eq!(result.intent, Intent::SingleEntity);
        assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(result.extracted_literals, vec!["Galaxy Z Flip5"]);
    }

    #[test]
    fn test_fallback_collects_distinct_names() {
        let result = classify("s23 ultra or a54, thoughts");
        assert_eq!(
            result.extracted_literals,
            vec!["Galaxy S23 Ultra", "Galaxy A54"]
        );
    }

    #[test]
    fn test_unknown() {
        let result = classify("hello there");
        assert_eq!(result, IntentResult::unknown());
        assert_eq!(classify("   "), IntentResult::unknown());
    }

    #[test]
    fn test_deterministic() {
        let c = classifier();
        let cat = catalog();
        for q in ["best camera samsung", "s23 vs a54", "hello there"] {
            assert_eq!(c.classify(q, &cat), c.classify(q, &cat));
        }
    }

    #[test]
    fn test_clean_literal() {
        assert_eq!(clean_literal("  S23 Ultra?! "), "S23 Ultra");
        assert_eq!(clean_literal("A54 in terms of battery"), "A54");
        assert_eq!(clean_literal("?"), "");
    }
}
