//! Core data models used throughout Phone Advisor.
//!
//! These types represent the catalog records, classified intents, and
//! resolved entities that flow through the query-understanding pipeline.
//! Catalog attributes are optional: an unknown value stays `None` (and
//! serializes as `null`) instead of being defaulted to zero.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A phone model in the catalog.
///
/// `model_name` is the canonical identifier and is unique across the
/// catalog. Every other attribute may be unknown.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Phone {
    pub model_name: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub display_size_inches: Option<f64>,
    #[serde(default)]
    pub display_type: Option<String>,
    #[serde(default)]
    pub display_resolution: Option<String>,
    #[serde(default)]
    pub display_refresh_rate_hz: Option<i64>,
    #[serde(default)]
    pub processor: Option<String>,
    #[serde(default)]
    pub ram_options_gb: Option<Vec<i64>>,
    #[serde(default)]
    pub storage_options_gb: Option<Vec<i64>>,
    #[serde(default)]
    pub battery_mah: Option<i64>,
    #[serde(default)]
    pub main_camera_mp: Option<f64>,
    #[serde(default)]
    pub main_camera_aperture: Option<String>,
    #[serde(default)]
    pub ultrawide_camera_mp: Option<f64>,
    #[serde(default)]
    pub telephoto_camera_mp: Option<f64>,
    #[serde(default)]
    pub price_usd: Option<f64>,
    #[serde(default)]
    pub has_5g: Option<bool>,
    #[serde(default)]
    pub ip_rating: Option<String>,
    #[serde(default)]
    pub weight_g: Option<f64>,
    #[serde(default)]
    pub android_version: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl Phone {
    /// A phone with only its name known.
    pub fn named(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }
}

/// Catalog attributes that filters, orderings, and validation refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ModelName,
    DisplaySizeInches,
    DisplayRefreshRateHz,
    Processor,
    RamOptionsGb,
    BatteryMah,
    MainCameraMp,
    UltrawideCameraMp,
    PriceUsd,
}

impl Field {
    /// Column name in the `phones` table and key in serialized records.
    pub fn column(self) -> &'static str {
        match self {
            Field::ModelName => "model_name",
            Field::DisplaySizeInches => "display_size_inches",
            Field::DisplayRefreshRateHz => "display_refresh_rate_hz",
            Field::Processor => "processor",
            Field::RamOptionsGb => "ram_options_gb",
            Field::BatteryMah => "battery_mah",
            Field::MainCameraMp => "main_camera_mp",
            Field::UltrawideCameraMp => "ultrawide_camera_mp",
            Field::PriceUsd => "price_usd",
        }
    }

    /// Whether the phone has a known value for this attribute.
    pub fn is_present(self, phone: &Phone) -> bool {
        match self {
            Field::ModelName => !phone.model_name.trim().is_empty(),
            Field::Processor => phone.processor.is_some(),
            Field::RamOptionsGb => phone.ram_options_gb.is_some(),
            _ => self.numeric(phone).is_some(),
        }
    }

    /// Numeric value of the attribute, if it is numeric and known.
    pub fn numeric(self, phone: &Phone) -> Option<f64> {
        match self {
            Field::DisplaySizeInches => phone.display_size_inches,
            Field::DisplayRefreshRateHz => phone.display_refresh_rate_hz.map(|v| v as f64),
            Field::BatteryMah => phone.battery_mah.map(|v| v as f64),
            Field::MainCameraMp => phone.main_camera_mp,
            Field::UltrawideCameraMp => phone.ultrawide_camera_mp,
            Field::PriceUsd => phone.price_usd,
            Field::ModelName | Field::Processor | Field::RamOptionsGb => None,
        }
    }

    /// Textual value of the attribute, if it is textual and known.
    pub fn text(self, phone: &Phone) -> Option<&str> {
        match self {
            Field::ModelName => Some(phone.model_name.as_str()),
            Field::Processor => phone.processor.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Use cases recognised by recommendation queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseCase {
    Photography,
    Gaming,
    Business,
    Students,
}

/// The classified intent of a query.
///
/// Variants that need extra context for query building carry it, so the
/// builder stays a pure function of `(intent, names, focus)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    SingleEntity,
    Comparison,
    FilteredSearch {
        /// Price cap parsed from "under $N", if the query had one.
        budget_cap: Option<f64>,
    },
    FeatureQuery,
    UseCaseRecommendation {
        use_case: Option<UseCase>,
    },
    Unknown,
}

impl Intent {
    /// Stable snake_case name of the intent category.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::SingleEntity => "single_entity",
            Intent::Comparison => "comparison",
            Intent::FilteredSearch { .. } => "filtered_search",
            Intent::FeatureQuery => "feature_query",
            Intent::UseCaseRecommendation { .. } => "use_case_recommendation",
            Intent::Unknown => "unknown",
        }
    }

    /// Intents whose literals name specific catalog entries.
    pub fn names_entities(&self) -> bool {
        matches!(self, Intent::SingleEntity | Intent::Comparison)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output of the intent classifier for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    #[serde(flatten)]
    pub intent: Intent,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f32,
    /// Literal entity strings, in the order they appear in the query.
    pub extracted_literals: Vec<String>,
}

impl IntentResult {
    pub fn unknown() -> Self {
        Self {
            intent: Intent::Unknown,
            confidence: 0.0,
            extracted_literals: Vec::new(),
        }
    }
}

/// A literal resolved to a canonical catalog name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub literal: String,
    pub canonical_name: String,
    /// Match score in `[0, 100]`.
    pub match_score: u8,
}
