//! Completeness checks on retrieved records.
//!
//! Each intent needs a minimum set of attributes to be answerable. Records
//! missing any of them are reported, never dropped, so the caller decides
//! what to do with partial data.

use serde::Serialize;

use crate::models::{Field, Intent, Phone};

/// Attributes an intent's answer depends on.
pub fn required_fields(intent: &Intent) -> &'static [Field] {
    match intent {
        Intent::SingleEntity | Intent::Comparison => &[
            Field::ModelName,
            Field::DisplaySizeInches,
            Field::BatteryMah,
            Field::MainCameraMp,
        ],
        Intent::FilteredSearch { .. } => &[
            Field::ModelName,
            Field::BatteryMah,
            Field::PriceUsd,
            Field::MainCameraMp,
        ],
        Intent::FeatureQuery => &[Field::ModelName, Field::MainCameraMp, Field::BatteryMah],
        Intent::UseCaseRecommendation { .. } => &[
            Field::ModelName,
            Field::MainCameraMp,
            Field::BatteryMah,
            Field::PriceUsd,
        ],
        Intent::Unknown => &[Field::ModelName],
    }
}

/// A record with missing required attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhoneIssue {
    pub model_name: String,
    pub missing_fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_issue: Option<String>,
    pub phones_with_issues: Vec<PhoneIssue>,
}

/// Check retrieved records against the intent's required attributes.
pub fn validate(intent: &Intent, phones: &[Phone]) -> ValidationReport {
    let required = required_fields(intent);

    let phones_with_issues: Vec<PhoneIssue> = phones
        .iter()
        .filter_map(|phone| {
            let missing: Vec<Field> = required
                .iter()
                .copied()
                .filter(|field| !field.is_present(phone))
                .collect();
            (!missing.is_empty()).then(|| PhoneIssue {
                model_name: phone.model_name.clone(),
                missing_fields: missing,
            })
        })
        .collect();

    let global_issue = match intent {
        Intent::Comparison if phones.len() < 2 => Some(format!(
            "Comparison needs at least two phones, found {}",
            phones.len()
        )),
        _ => None,
    };

    ValidationReport {
        is_valid: phones_with_issues.is_empty() && global_issue.is_none(),
        global_issue,
        phones_with_issues,
    }
}
