//! Focus extraction: map a query to a coarse topic label.
//!
//! Topics are checked in a fixed order and the first keyword hit wins, so
//! "best camera under this price" is a `camera` query. The tie-break is a
//! deliberate simplification; queries touching several topics are not
//! split.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse topic of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Focus {
    Battery,
    Camera,
    Display,
    Performance,
    Price,
    Design,
    General,
}

/// Keyword sets in match order.
const FOCUS_KEYWORDS: &[(Focus, &[&str])] = &[
    (
        Focus::Battery,
        &["battery", "charge", "charging", "power", "endurance"],
    ),
    (
        Focus::Camera,
        &[
            "camera",
            "photo",
            "photography",
            "picture",
            "megapixel",
            "aperture",
            "selfie",
        ],
    ),
    (
        Focus::Display,
        &["display", "screen", "resolution", "refresh rate", "amoled", "lcd"],
    ),
    (
        Focus::Performance,
        &[
            "performance",
            "speed",
            "processor",
            "chipset",
            "ram",
            "gaming",
            "fast",
        ],
    ),
    (
        Focus::Price,
        &["price", "cost", "budget", "cheap", "expensive", "affordable"],
    ),
    (
        Focus::Design,
        &["design", "look", "build", "weight", "dimensions", "thin"],
    ),
];

impl Focus {
    pub fn as_str(self) -> &'static str {
        match self {
            Focus::Battery => "battery",
            Focus::Camera => "camera",
            Focus::Display => "display",
            Focus::Performance => "performance",
            Focus::Price => "price",
            Focus::Design => "design",
            Focus::General => "general",
        }
    }
}

impl fmt::Display for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Return the first topic whose keyword set matches, or [`Focus::General`].
pub fn extract_focus(query: &str) -> Focus {
    let q = query.to_lowercase();
    FOCUS_KEYWORDS
        .iter()
        .find(|(_, keywords)| contains_keyword(&q, keywords))
        .map(|(focus, _)| *focus)
        .unwrap_or(Focus::General)
}

/// Every topic mentioned by the query, in match order.
pub fn extract_criteria(query: &str) -> Vec<Focus> {
    let q = query.to_lowercase();
    FOCUS_KEYWORDS
        .iter()
        .filter(|(_, keywords)| contains_keyword(&q, keywords))
        .map(|(focus, _)| *focus)
        .collect()
}

/// Keyword match at a word start, so "ram" does not fire on "program".
fn contains_keyword(query: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| {
        query.match_indices(*kw).any(|(idx, _)| {
            query[..idx]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric())
        })
    })
}
