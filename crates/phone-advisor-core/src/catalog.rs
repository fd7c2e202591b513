//! Catalog index and entity resolution.
//!
//! A [`CatalogSnapshot`] is an immutable list of canonical model names.
//! [`CatalogSnapshot::resolve`] maps a free-text literal ("s23 ultra",
//! "flip 5") to ranked canonical names:
//!
//! 1. every name containing the literal (case-insensitive) scores 100;
//! 2. every other name whose [`partial_ratio`] reaches the threshold is
//!    added with that score;
//! 3. candidates are sorted by score, ties broken by whole-string
//!    [`ratio`] and then catalog order, and truncated to
//!    [`MAX_CANDIDATES`].
//!
//! [`CatalogIndex`] owns the current snapshot and swaps it wholesale on
//! refresh, so a query always resolves against one consistent catalog.

use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;

use crate::fuzzy::{partial_ratio, ratio};
use crate::models::ResolvedEntity;
use crate::store::PhoneStore;

/// Minimum score for a literal to resolve to a name.
pub const DEFAULT_THRESHOLD: u8 = 80;

/// Lower threshold used when suggesting alternatives for a failed query.
pub const SUGGESTION_THRESHOLD: u8 = 60;

/// Maximum number of candidates returned per literal.
pub const MAX_CANDIDATES: usize = 5;

/// Immutable set of canonical model names.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    names: Vec<String>,
    lowered: Vec<String>,
}

impl CatalogSnapshot {
    /// Build a snapshot. Duplicate and blank names are dropped; the first
    /// occurrence keeps its position.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut snapshot = Self::default();
        for name in names {
            let name: String = name.into();
            if name.trim().is_empty() || snapshot.names.contains(&name) {
                continue;
            }
            snapshot.lowered.push(name.to_lowercase());
            snapshot.names.push(name);
        }
        snapshot
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Rank catalog names against a literal.
    ///
    /// Never fails: an empty catalog or a blank literal yields no candidates.
    pub fn resolve(&self, literal: &str, threshold: u8) -> Vec<ResolvedEntity> {
        let literal = literal.trim();
        if literal.is_empty() || self.names.is_empty() {
            return Vec::new();
        }
        let needle = literal.to_lowercase();

        // (catalog position, score, whole-string ratio)
        let mut scored: Vec<(usize, u8, u8)> = Vec::new();
        for (idx, lowered) in self.lowered.iter().enumerate() {
            let score = if lowered.contains(&needle) {
                100
            } else {
                let s = partial_ratio(literal, &self.names[idx]);
                if s < threshold {
                    continue;
                }
                s
            };
            scored.push((idx, score, ratio(literal, &self.names[idx])));
        }

        scored.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)).then(a.0.cmp(&b.0)));
        scored.truncate(MAX_CANDIDATES);

        scored
            .into_iter()
            .map(|(idx, score, _)| ResolvedEntity {
                literal: literal.to_string(),
                canonical_name: self.names[idx].clone(),
                match_score: score,
            })
            .collect()
    }

    /// Best candidate for a literal, if any reaches the threshold.
    pub fn best_match(&self, literal: &str, threshold: u8) -> Option<ResolvedEntity> {
        self.resolve(literal, threshold).into_iter().next()
    }
}

/// Shared handle to the current catalog snapshot.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl CatalogIndex {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The snapshot in effect now. Later refreshes do not affect it.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new snapshot built from `names`.
    pub fn replace<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let next = Arc::new(CatalogSnapshot::new(names));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Reload all model names from the store. Returns the new catalog size.
    pub async fn refresh(&self, store: &dyn PhoneStore) -> Result<usize> {
        let names = store.list_model_names().await?;
        let count = names.len();
        self.replace(names);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Phone;
    use crate::store::memory::InMemoryStore;
    use proptest::prelude::*;

    fn catalog() -> CatalogSnapshot {
        CatalogSnapshot::new([
            "Galaxy S23 Ultra",
            "Galaxy S23",
            "Galaxy S22 Ultra",
            "Galaxy A54",
            "Galaxy Z Flip5",
        ])
    }

    #[test]
    fn test_substring_scores_100() {
        let result = catalog().resolve("s23 ultra", DEFAULT_THRESHOLD);
        assert_eq!(result[0].canonical_name, "Galaxy S23 Ultra");
        assert_eq!(result[0].match_score, 100);
        assert_eq!(result[0].literal, "s23 ultra");
        // "s22 ultra" is one character off
        assert_eq!(result[1].canonical_name, "Galaxy S22 Ultra");
        assert_eq!(result[1].match_score, 89);
    }

    #[test]
    fn test_fuzzy_spacing_variant() {
        let best = catalog().best_match("flip 5", DEFAULT_THRESHOLD).unwrap();
        assert_eq!(best.canonical_name, "Galaxy Z Flip5");
        assert_eq!(best.match_score, 91);
    }

    #[test]
    fn test_ties_prefer_closer_whole_name() {
        // Both contain "galaxy s23"; the shorter name is the closer match.
        let result = catalog().resolve("Galaxy S23", DEFAULT_THRESHOLD);
        assert_eq!(result[0].canonical_name, "Galaxy S23");
        assert_eq!(result[1].canonical_name, "Galaxy S23 Ultra");
    }

    #[test]
    fn test_empty_inputs() {
        assert!(CatalogSnapshot::default()
            .resolve("Galaxy S23", DEFAULT_THRESHOLD)
            .is_empty());
        assert!(catalog().resolve("   ", DEFAULT_THRESHOLD).is_empty());
    }

    #[test]
    fn test_unrelated_literal_has_no_candidates() {
        assert!(catalog()
            .resolve("Nonexistent Phone 99", DEFAULT_THRESHOLD)
            .is_empty());
    }

    #[test]
    fn test_snapshot_dedupes_and_skips_blank() {
        let snap = CatalogSnapshot::new(["Galaxy S23", "", "Galaxy S23", "Galaxy A54"]);
        assert_eq!(snap.names(), ["Galaxy S23", "Galaxy A54"]);
    }

    #[test]
    fn test_index_replace_keeps_old_snapshots_intact() {
        let index = CatalogIndex::new(catalog());
        let before = index.snapshot();
        index.replace(["Galaxy S24"]);
        assert_eq!(before.len(), 5);
        assert_eq!(index.snapshot().names(), ["Galaxy S24"]);
    }

    #[tokio::test]
    async fn test_index_refresh_from_store() {
        let store = InMemoryStore::with_phones(vec![
            Phone::named("Galaxy S24"),
            Phone::named("Galaxy A35"),
        ]);
        let index = CatalogIndex::default();
        assert!(index.snapshot().is_empty());
        let count = index.refresh(&store).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(index.snapshot().names(), ["Galaxy A35", "Galaxy S24"]);
    }

    proptest! {
        #[test]
        fn prop_resolve_is_bounded_sorted_and_thresholded(
            literal in "[a-zA-Z0-9 ]{0,20}",
            threshold in 0u8..=100,
        ) {
            let cat = catalog();
            let result = cat.resolve(&literal, threshold);
            prop_assert!(result.len() <= MAX_CANDIDATES);
            for pair in result.windows(2) {
                prop_assert!(pair[0].match_score >= pair[1].match_score);
            }
            for entity in &result {
                prop_assert!(entity.match_score >= threshold);
                prop_assert!(cat.names().contains(&entity.canonical_name));
            }
        }
    }
}
