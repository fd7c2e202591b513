//! Prompt construction and the deterministic fallback answer.
//!
//! Three prompt shapes cover every intent: a single-phone review, a
//! comparison of two or more phones, and a ranked recommendation. Unknown
//! attributes are left out of prompts and printed as "unknown" in the
//! fallback text.

use phone_advisor_core::models::{Intent, Phone};

use crate::extraction::ExtractionPayload;

const BASE_SYSTEM: &str = "You are a professional smartphone reviewer with deep technical \
knowledge. You provide accurate, objective, and helpful information about mobile devices. \
Only use the specifications you are given; if a value is missing, say it is unknown.";

/// Render a number without a trailing `.0`.
fn num(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

fn or_unknown<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

fn join_ints(values: &[i64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Spec sheet for one phone, one attribute per line.
pub fn format_specs(phone: &Phone) -> String {
    let mut lines = vec![format!("MODEL: {}", phone.model_name)];

    if let Some(date) = &phone.release_date {
        lines.push(format!("Release Date: {}", date));
    }

    let mut display = Vec::new();
    if let Some(size) = phone.display_size_inches {
        display.push(format!("{}\"", num(size)));
    }
    if let Some(kind) = &phone.display_type {
        display.push(kind.clone());
    }
    if let Some(res) = &phone.display_resolution {
        display.push(res.clone());
    }
    if let Some(hz) = phone.display_refresh_rate_hz {
        display.push(format!("{}Hz", hz));
    }
    if !display.is_empty() {
        lines.push(format!("Display: {}", display.join(", ")));
    }

    if let Some(cpu) = &phone.processor {
        lines.push(format!("Processor: {}", cpu));
    }
    if let Some(ram) = &phone.ram_options_gb {
        lines.push(format!("RAM: {} GB", join_ints(ram)));
    }
    if let Some(storage) = &phone.storage_options_gb {
        lines.push(format!("Storage: {} GB", join_ints(storage)));
    }

    let mut cameras = Vec::new();
    if let Some(mp) = phone.main_camera_mp {
        let mut main = format!("Main: {}MP", num(mp));
        if let Some(aperture) = &phone.main_camera_aperture {
            main.push(' ');
            main.push_str(aperture);
        }
        cameras.push(main);
    }
    if let Some(mp) = phone.ultrawide_camera_mp {
        cameras.push(format!("Ultra-wide: {}MP", num(mp)));
    }
    if let Some(mp) = phone.telephoto_camera_mp {
        cameras.push(format!("Telephoto: {}MP", num(mp)));
    }
    if !cameras.is_empty() {
        lines.push(format!("Cameras: {}", cameras.join(", ")));
    }

    if let Some(mah) = phone.battery_mah {
        lines.push(format!("Battery: {} mAh", mah));
    }
    if let Some(has_5g) = phone.has_5g {
        lines.push(format!("5G: {}", if has_5g { "Yes" } else { "No" }));
    }
    if let Some(ip) = &phone.ip_rating {
        lines.push(format!("IP Rating: {}", ip));
    }
    if let Some(weight) = phone.weight_g {
        lines.push(format!("Weight: {} g", num(weight)));
    }
    if let Some(android) = &phone.android_version {
        lines.push(format!("Android: {}", android));
    }
    if let Some(price) = phone.price_usd {
        lines.push(format!("Price: ${}", num(price)));
    }

    lines.join("\n")
}

fn spec_block(phones: &[Phone]) -> String {
    phones
        .iter()
        .map(format_specs)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// User prompt for the payload's intent.
pub fn build_prompt(payload: &ExtractionPayload) -> String {
    let focus = payload.context.focus;
    let phones = &payload.phones;

    match (&payload.intent.intent, phones.as_slice()) {
        (Intent::SingleEntity, [phone, ..]) => format!(
            "Question: {question}\n\n\
             Write a review of the {name}.\n\n\
             PHONE SPECIFICATIONS:\n{specs}\n\n\
             Open with the phone's key selling points, then analyse the specifications in \
             plain language with particular attention to {focus}. Name the audience it suits, \
             its standout features and its drawbacks, and close with a short summary.",
            question = payload.query,
            name = phone.model_name,
            specs = format_specs(phone),
            focus = focus,
        ),
        (Intent::Comparison, [_, _, ..]) => format!(
            "Question: {question}\n\n\
             Compare these {count} smartphones with a focus on {focus}:\n\n{specs}\n\n\
             Lay out the key differences with concrete numbers, say which phone is stronger \
             in which area, discuss value for money, and end with a recommendation for \
             different kinds of buyers.",
            question = payload.query,
            count = phones.len(),
            focus = focus,
            specs = spec_block(phones),
        ),
        _ => {
            let criteria = if payload.context.user_criteria.is_empty() {
                "overall value".to_string()
            } else {
                payload
                    .context
                    .user_criteria
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            format!(
                "Question: {question}\n\n\
                 Rank these {count} smartphones by {focus} and overall value:\n\n{specs}\n\n\
                 Weigh these criteria: {criteria}. For each phone give its strengths and the \
                 buyer it suits, then finish with overall buying advice.",
                question = payload.query,
                count = phones.len(),
                focus = focus,
                specs = spec_block(phones),
                criteria = criteria,
            )
        }
    }
}

/// System message for an intent.
pub fn system_message(intent: &Intent) -> String {
    let extra = match intent {
        Intent::SingleEntity => {
            "Give a thorough analysis of a single phone's features and performance."
        }
        Intent::Comparison => {
            "Compare objectively and help the user see which phone suits which needs."
        }
        Intent::FilteredSearch { .. } => {
            "Rank and recommend phones against the user's constraints and budget."
        }
        Intent::FeatureQuery => "Analyse the requested feature across the phones given.",
        Intent::UseCaseRecommendation { .. } => "Match phones to the user's stated use case.",
        Intent::Unknown => "Answer the question using the phones given.",
    };
    format!("{} {}", BASE_SYSTEM, extra)
}

/// Deterministic answer built from the records alone.
pub fn fallback_answer(intent: &Intent, phones: &[Phone]) -> String {
    match (intent, phones) {
        (_, []) => "No phone data is available for this question.".to_string(),
        (Intent::SingleEntity, [phone, ..]) => format!(
            "The {} features a {}-inch display, a {} mAh battery and a {} MP main camera.",
            phone.model_name,
            or_unknown(phone.display_size_inches.map(num)),
            or_unknown(phone.battery_mah),
            or_unknown(phone.main_camera_mp.map(num)),
        ),
        (Intent::Comparison, [a, b, ..]) => format!(
            "Comparing {} and {}: the {} has a {} MP main camera vs {} MP, and a {} mAh battery vs {} mAh.",
            a.model_name,
            b.model_name,
            a.model_name,
            or_unknown(a.main_camera_mp.map(num)),
            or_unknown(b.main_camera_mp.map(num)),
            or_unknown(a.battery_mah),
            or_unknown(b.battery_mah),
        ),
        _ => {
            let names: Vec<&str> = phones
                .iter()
                .take(3)
                .map(|p| p.model_name.as_str())
                .collect();
            format!(
                "Based on your question, these phones fit best: {}.",
                names.join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_prints_unknown() {
        let mut phone = Phone::named("Galaxy S23");
        phone.battery_mah = Some(3900);
        let text = fallback_answer(&Intent::SingleEntity, &[phone]);
        assert_eq!(
            text,
            "The Galaxy S23 features a unknown-inch display, a 3900 mAh battery and a unknown MP main camera."
        );
        assert!(!text.contains(" 0 "));
    }

    #[test]
    fn test_fallback_comparison() {
        let a = Phone {
            main_camera_mp: Some(200.0),
            battery_mah: Some(5000),
            ..Phone::named("Galaxy S23 Ultra")
        };
        let b = Phone {
            main_camera_mp: Some(50.0),
            ..Phone::named("Galaxy A54")
        };
        let text = fallback_answer(&Intent::Comparison, &[a, b]);
        assert!(text.contains("200 MP vs 50 MP"));
        assert!(text.contains("5000 mAh battery vs unknown mAh"));
    }

    #[test]
    fn test_fallback_lists_top_three() {
        let phones: Vec<Phone> = ["A", "B", "C", "D"].iter().map(|n| Phone::named(*n)).collect();
        let text = fallback_answer(&Intent::FeatureQuery, &phones);
        assert_eq!(text, "Based on your question, these phones fit best: A, B, C.");
    }

    #[test]
    fn test_format_specs_skips_unknowns() {
        let phone = Phone {
            display_size_inches: Some(6.1),
            display_refresh_rate_hz: Some(120),
            ram_options_gb: Some(vec![8, 12]),
            main_camera_mp: Some(50.0),
            main_camera_aperture: Some("f/1.8".into()),
            price_usd: Some(799.99),
            ..Phone::named("Galaxy S23")
        };
        let specs = format_specs(&phone);
        assert!(specs.contains("Display: 6.1\", 120Hz"));
        assert!(specs.contains("RAM: 8/12 GB"));
        assert!(specs.contains("Cameras: Main: 50MP f/1.8"));
        assert!(specs.contains("Price: $799.99"));
        assert!(!specs.contains("Battery"));
    }
}
