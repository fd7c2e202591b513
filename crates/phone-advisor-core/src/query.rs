//! Intent-to-query translation.
//!
//! [`build_query`] maps `(intent, resolved names, focus)` to a
//! [`RetrievalRequest`]: a filter/sort/limit specification that stores
//! translate into their own query language. Every intent has a fixed rule;
//! nothing is synthesized from free text, so the same inputs always produce
//! the same request.
//!
//! # Rules
//!
//! | Intent | Filters | Order | Limit |
//! |--------|---------|-------|-------|
//! | single_entity | `model_name = names[0]` | none | 5 |
//! | comparison | `model_name IN names` | none | names |
//! | filtered_search | `price_usd <= cap` | battery desc | 10 |
//! | feature_query | per focus | per focus | 5 |
//! | use_case_recommendation | per use case | per use case | 5 |
//! | unknown | none | none | 5 |

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::focus::Focus;
use crate::models::{Field, Intent, Phone, UseCase};

/// Budget cap used by filtered searches that do not name a price.
pub const DEFAULT_BUDGET_CAP: f64 = 1000.0;

/// Limit used by every ranked list except filtered search.
pub const DEFAULT_LIMIT: u32 = 5;

/// Limit used by filtered searches.
pub const FILTERED_SEARCH_LIMIT: u32 = 10;

/// Constraint on a single attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Constraint {
    /// Exact, case-sensitive equality on a text attribute.
    Equals(String),
    /// Membership in a set of text values. An empty set matches nothing.
    OneOf(Vec<String>),
    AtMost(f64),
    AtLeast(f64),
    /// The attribute is known.
    Present,
    /// A list attribute contains at least one of the values.
    ContainsAny(Vec<i64>),
    /// Matches nothing. Used when an entity query resolved no names.
    Never,
}

impl Constraint {
    /// Evaluate against a phone. Unknown attributes never satisfy a constraint.
    pub fn matches(&self, field: Field, phone: &Phone) -> bool {
        match self {
            Constraint::Equals(v) => field.text(phone) == Some(v.as_str()),
            Constraint::OneOf(vs) => field
                .text(phone)
                .is_some_and(|t| vs.iter().any(|v| v == t)),
            Constraint::AtMost(cap) => field.numeric(phone).is_some_and(|v| v <= *cap),
            Constraint::AtLeast(floor) => field.numeric(phone).is_some_and(|v| v >= *floor),
            Constraint::Present => field.is_present(phone),
            Constraint::ContainsAny(wanted) => match field {
                Field::RamOptionsGb => phone
                    .ram_options_gb
                    .as_ref()
                    .is_some_and(|opts| opts.iter().any(|o| wanted.contains(o))),
                _ => false,
            },
            Constraint::Never => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

/// What a result list is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Field(Field),
    /// 1 for Snapdragon 8 series, 2 for Exynos, 3 for anything else.
    ProcessorTier,
    /// Number of RAM variants offered.
    RamOptionCount,
}

impl SortKey {
    /// Sort value for a phone; `None` sorts last in either direction.
    pub fn value(self, phone: &Phone) -> Option<f64> {
        match self {
            SortKey::Field(field) => field.numeric(phone),
            SortKey::ProcessorTier => phone.processor.as_deref().map(processor_tier),
            SortKey::RamOptionCount => phone.ram_options_gb.as_ref().map(|o| o.len() as f64),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Field(field) => f.write_str(field.column()),
            SortKey::ProcessorTier => f.write_str("processor_tier"),
            SortKey::RamOptionCount => f.write_str("ram_option_count"),
        }
    }
}

/// Performance tier of a chipset name, lower is faster.
pub fn processor_tier(processor: &str) -> f64 {
    if processor.contains("Snapdragon 8") {
        1.0
    } else if processor.contains("Exynos") {
        2.0
    } else {
        3.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderBy {
    pub key: SortKey,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(key: SortKey) -> Self {
        Self {
            key,
            direction: Direction::Asc,
        }
    }

    pub fn desc(key: SortKey) -> Self {
        Self {
            key,
            direction: Direction::Desc,
        }
    }
}

/// A filter/sort/limit specification, independent of any storage backend.
///
/// The first entry of `order_by` is the primary order; later entries
/// break ties. An empty `order_by` keeps catalog order (by model name).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalRequest {
    pub filters: BTreeMap<Field, Constraint>,
    pub order_by: Vec<OrderBy>,
    pub limit: u32,
}

impl RetrievalRequest {
    fn new(limit: u32) -> Self {
        Self {
            filters: BTreeMap::new(),
            order_by: Vec::new(),
            limit,
        }
    }

    fn filter(mut self, field: Field, constraint: Constraint) -> Self {
        self.filters.insert(field, constraint);
        self
    }

    fn order(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Whether a phone passes every filter.
    pub fn matches(&self, phone: &Phone) -> bool {
        self.filters
            .iter()
            .all(|(field, constraint)| constraint.matches(*field, phone))
    }
}

/// Build the retrieval request for a classified query.
///
/// Pure: performs no I/O and depends on nothing but its arguments.
pub fn build_query(intent: &Intent, names: &[String], focus: Focus) -> RetrievalRequest {
    match intent {
        Intent::SingleEntity => {
            let constraint = match names.first() {
                Some(name) => Constraint::Equals(name.clone()),
                None => Constraint::Never,
            };
            RetrievalRequest::new(DEFAULT_LIMIT).filter(Field::ModelName, constraint)
        }
        Intent::Comparison => RetrievalRequest::new(names.len().max(1) as u32)
            .filter(Field::ModelName, Constraint::OneOf(names.to_vec())),
        Intent::FilteredSearch { budget_cap } => RetrievalRequest::new(FILTERED_SEARCH_LIMIT)
            .filter(
                Field::PriceUsd,
                Constraint::AtMost(budget_cap.unwrap_or(DEFAULT_BUDGET_CAP)),
            )
            .order(OrderBy::desc(SortKey::Field(Field::BatteryMah))),
        Intent::FeatureQuery => feature_rule(focus),
        Intent::UseCaseRecommendation { use_case } => {
            let use_case = use_case.or(match focus {
                Focus::Camera => Some(UseCase::Photography),
                _ => None,
            });
            use_case_rule(use_case)
        }
        Intent::Unknown => RetrievalRequest::new(DEFAULT_LIMIT),
    }
}

fn feature_rule(focus: Focus) -> RetrievalRequest {
    let base = RetrievalRequest::new(DEFAULT_LIMIT);
    match focus {
        Focus::Camera => base
            .filter(Field::MainCameraMp, Constraint::Present)
            .order(OrderBy::desc(SortKey::Field(Field::MainCameraMp))),
        Focus::Battery => base
            .filter(Field::BatteryMah, Constraint::Present)
            .order(OrderBy::desc(SortKey::Field(Field::BatteryMah))),
        Focus::Performance => base
            .filter(Field::Processor, Constraint::Present)
            .order(OrderBy::asc(SortKey::ProcessorTier))
            .order(OrderBy::desc(SortKey::Field(Field::BatteryMah))),
        _ => base.order(OrderBy::desc(SortKey::Field(Field::PriceUsd))),
    }
}

fn use_case_rule(use_case: Option<UseCase>) -> RetrievalRequest {
    let base = RetrievalRequest::new(DEFAULT_LIMIT);
    match use_case {
        Some(UseCase::Photography) => base
            .filter(Field::MainCameraMp, Constraint::Present)
            .filter(Field::UltrawideCameraMp, Constraint::Present)
            .order(OrderBy::desc(SortKey::Field(Field::MainCameraMp)))
            .order(OrderBy::desc(SortKey::Field(Field::UltrawideCameraMp))),
        Some(UseCase::Gaming) => base
            .filter(Field::DisplayRefreshRateHz, Constraint::AtLeast(120.0))
            .filter(Field::BatteryMah, Constraint::AtLeast(4000.0))
            .order(OrderBy::desc(SortKey::Field(Field::DisplayRefreshRateHz)))
            .order(OrderBy::desc(SortKey::Field(Field::BatteryMah))),
        Some(UseCase::Business) => base
            .filter(Field::RamOptionsGb, Constraint::ContainsAny(vec![8, 12]))
            .order(OrderBy::desc(SortKey::RamOptionCount))
            .order(OrderBy::desc(SortKey::Field(Field::BatteryMah))),
        Some(UseCase::Students) => base
            .filter(Field::PriceUsd, Constraint::AtMost(500.0))
            .filter(Field::BatteryMah, Constraint::AtLeast(4000.0))
            .order(OrderBy::asc(SortKey::Field(Field::PriceUsd)))
            .order(OrderBy::desc(SortKey::Field(Field::BatteryMah))),
        None => base.order(OrderBy::desc(SortKey::Field(Field::PriceUsd))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_feature_query_camera_orders_by_main_camera() {
        let req = build_query(&Intent::FeatureQuery, &[], Focus::Camera);
        assert_eq!(
            req.order_by,
            vec![OrderBy::desc(SortKey::Field(Field::MainCameraMp))]
        );
        assert_eq!(req.limit, 5);
    }

    #[test]
    fn test_build_query_is_pure() {
        let intents = [
            Intent::SingleEntity,
            Intent::Comparison,
            Intent::FilteredSearch {
                budget_cap: Some(700.0),
            },
            Intent::FeatureQuery,
            Intent::UseCaseRecommendation {
                use_case: Some(UseCase::Gaming),
            },
            Intent::Unknown,
        ];
        let resolved = names(&["Galaxy S23", "Galaxy S22"]);
        for intent in &intents {
            for focus in [Focus::Camera, Focus::Performance, Focus::General] {
                assert_eq!(
                    build_query(intent, &resolved, focus),
                    build_query(intent, &resolved, focus)
                );
            }
        }
    }

    #[test]
    fn test_single_entity_without_names_matches_nothing() {
        let req = build_query(&Intent::SingleEntity, &[], Focus::General);
        assert_eq!(req.filters.get(&Field::ModelName), Some(&Constraint::Never));
        assert!(!req.matches(&Phone::named("Galaxy S23")));
    }

    #[test]
    fn test_single_entity_uses_first_name() {
        let req = build_query(
            &Intent::SingleEntity,
            &names(&["Galaxy S23", "Galaxy S22"]),
            Focus::General,
        );
        assert_eq!(
            req.filters.get(&Field::ModelName),
            Some(&Constraint::Equals("Galaxy S23".into()))
        );
    }

    #[test]
    fn test_comparison_does_not_enforce_two_names() {
        let req = build_query(&Intent::Comparison, &names(&["Galaxy S23"]), Focus::General);
        assert_eq!(
            req.filters.get(&Field::ModelName),
            Some(&Constraint::OneOf(names(&["Galaxy S23"])))
        );
        let empty = build_query(&Intent::Comparison, &[], Focus::General);
        assert!(!empty.matches(&Phone::named("Galaxy S23")));
    }

    #[test]
    fn test_filtered_search_default_cap() {
        let req = build_query(
            &Intent::FilteredSearch { budget_cap: None },
            &[],
            Focus::Battery,
        );
        assert_eq!(
            req.filters.get(&Field::PriceUsd),
            Some(&Constraint::AtMost(DEFAULT_BUDGET_CAP))
        );
        assert_eq!(
            req.order_by,
            vec![OrderBy::desc(SortKey::Field(Field::BatteryMah))]
        );
        assert_eq!(req.limit, 10);
    }

    #[test]
    fn test_filtered_search_parsed_cap() {
        let req = build_query(
            &Intent::FilteredSearch {
                budget_cap: Some(600.0),
            },
            &[],
            Focus::Battery,
        );
        assert_eq!(
            req.filters.get(&Field::PriceUsd),
            Some(&Constraint::AtMost(600.0))
        );
    }

    #[test]
    fn test_performance_orders_by_tier_then_battery() {
        let req = build_query(&Intent::FeatureQuery, &[], Focus::Performance);
        assert_eq!(req.order_by[0], OrderBy::asc(SortKey::ProcessorTier));
        assert_eq!(
            req.order_by[1],
            OrderBy::desc(SortKey::Field(Field::BatteryMah))
        );
    }

    #[test]
    fn test_use_case_falls_back_to_camera_focus() {
        let req = build_query(
            &Intent::UseCaseRecommendation { use_case: None },
            &[],
            Focus::Camera,
        );
        assert_eq!(
            req.filters.get(&Field::UltrawideCameraMp),
            Some(&Constraint::Present)
        );

        let generic = build_query(
            &Intent::UseCaseRecommendation { use_case: None },
            &[],
            Focus::General,
        );
        assert!(generic.filters.is_empty());
        assert_eq!(
            generic.order_by,
            vec![OrderBy::desc(SortKey::Field(Field::PriceUsd))]
        );
    }

    #[test]
    fn test_business_filter_on_ram_options() {
        let req = build_query(
            &Intent::UseCaseRecommendation {
                use_case: Some(UseCase::Business),
            },
            &[],
            Focus::General,
        );
        let mut phone = Phone::named("Galaxy A54");
        phone.ram_options_gb = Some(vec![6, 8]);
        assert!(req.matches(&phone));
        phone.ram_options_gb = Some(vec![4, 6]);
        assert!(!req.matches(&phone));
        phone.ram_options_gb = None;
        assert!(!req.matches(&phone));
    }

    #[test]
    fn test_unknown_values_never_pass_range_filters() {
        let req = build_query(
            &Intent::UseCaseRecommendation {
                use_case: Some(UseCase::Students),
            },
            &[],
            Focus::General,
        );
        let mut phone = Phone::named("Galaxy A15");
        phone.battery_mah = Some(5000);
        assert!(!req.matches(&phone), "unknown price must not pass price <= 500");
        phone.price_usd = Some(199.0);
        assert!(req.matches(&phone));
    }

    #[test]
    fn test_processor_tier() {
        assert_eq!(processor_tier("Qualcomm Snapdragon 8 Gen 2"), 1.0);
        assert_eq!(processor_tier("Exynos 2200"), 2.0);
        assert_eq!(processor_tier("Dimensity 1080"), 3.0);
    }
}
