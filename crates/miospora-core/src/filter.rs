//! Filter model for genus search.
//!
//! A search is a sparse map from axis key to filter value. An absent key
//! imposes no constraint; a present key with an empty accepted-value list is
//! a deliberate "matches nothing" constraint and is preserved as such.
//! Unknown keys are ignored by the query builder, never rejected — the set
//! of filterable axes is fixed and domain-specific (see
//! `miospora_db::filter_query`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sparse filter criteria keyed by axis name (see [`keys`]).
pub type FilterMap = BTreeMap<String, FilterValue>;

/// Value shape for one filter axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Accepted-value list; membership is OR within the list.
    /// For the composite axes (`stratigraphy`, `geography`) each term is a
    /// packed display string decoded by `miospora_core::codec`.
    Terms(Vec<String>),
    /// Side-qualified (side, value) pairs; EVERY pair must be satisfied,
    /// each possibly via a different stored assignment.
    SidedTerms(Vec<SidedTerm>),
    /// A single numeric bound for the range-containment axes.
    Bound(f64),
}

/// One side-qualified filter pair. `side: None` is the "unspecified/any"
/// sentinel: the value may be found on any side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidedTerm {
    pub side: Option<String>,
    pub value: String,
}

impl SidedTerm {
    pub fn new(side: Option<&str>, value: &str) -> Self {
        Self {
            side: side.map(str::to_string),
            value: value.to_string(),
        }
    }
}

/// Axis keys understood by the genus predicate builder.
pub mod keys {
    // Direct single-valued reference axes on the diagnosis row.
    pub const FORM: &str = "form";
    pub const OUTLINE: &str = "outline";
    pub const ANGLES_SHAPE: &str = "angles_shape";
    pub const AREA_PRESENCE: &str = "area_presence";
    pub const INFRATURMA: &str = "infraturma";

    // Facets reached through the infraturma reference.
    pub const CHARACTER_OF_LAESURAE: &str = "character_of_laesurae";
    pub const EXINE_STRATIFICATION: &str = "exine_stratification";
    pub const EXINE_TYPE: &str = "exine_type";

    // Multi-valued existence axes.
    pub const AMB: &str = "amb";
    pub const SIDES_SHAPE: &str = "sides_shape";
    pub const LAESURAE_SHAPE: &str = "laesurae_shape";
    pub const LAESURAE_RAYS: &str = "laesurae_rays";
    pub const EXINE_STRUCTURE: &str = "exine_structure";

    // Thickness vocabulary in its four structural contexts; each axis joins
    // the shared `thickness` table through a different parent.
    pub const EXINE_THICKNESS: &str = "exine_thickness";
    pub const EXINE_GROWTH_THICKNESS: &str = "exine_growth_thickness";
    pub const EXOEXINE_THICKNESS: &str = "exoexine_thickness";
    pub const INTEXINE_THICKNESS: &str = "intexine_thickness";

    // Remaining exine growth form facets.
    pub const EXINE_GROWTH_TYPE: &str = "exine_growth_type";
    pub const EXINE_GROWTH_WIDTH: &str = "exine_growth_width";
    pub const EXINE_GROWTH_STRUCTURE: &str = "exine_growth_structure";

    // Side-qualified AND-of-pairs axes.
    pub const SCULPTURE: &str = "sculpture";
    pub const ORNAMENTATION: &str = "ornamentation";

    // Range containment on the genus size columns.
    pub const LENGTH_MIN: &str = "length_min";
    pub const LENGTH_MAX: &str = "length_max";
    pub const WIDTH_MIN: &str = "width_min";
    pub const WIDTH_MAX: &str = "width_max";

    // Composite multi-select axes (packed display strings).
    pub const STRATIGRAPHY: &str = "stratigraphy";
    pub const GEOGRAPHY: &str = "geography";
}

/// Convenience constructors for building a [`FilterMap`].
pub trait FilterMapExt {
    fn with_terms(self, key: &str, terms: &[&str]) -> Self;
    fn with_sided(self, key: &str, pairs: Vec<SidedTerm>) -> Self;
    fn with_bound(self, key: &str, bound: f64) -> Self;
}

impl FilterMapExt for FilterMap {
    fn with_terms(mut self, key: &str, terms: &[&str]) -> Self {
        self.insert(
            key.to_string(),
            FilterValue::Terms(terms.iter().map(|t| t.to_string()).collect()),
        );
        self
    }

    fn with_sided(mut self, key: &str, pairs: Vec<SidedTerm>) -> Self {
        self.insert(key.to_string(), FilterValue::SidedTerms(pairs));
        self
    }

    fn with_bound(mut self, key: &str, bound: f64) -> Self {
        self.insert(key.to_string(), FilterValue::Bound(bound));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_helpers_populate_map() {
        let filters = FilterMap::new()
            .with_terms(keys::FORM, &["rounded"])
            .with_bound(keys::LENGTH_MIN, 12.5)
            .with_sided(
                keys::SCULPTURE,
                vec![SidedTerm::new(Some("proximal"), "granulate")],
            );

        assert_eq!(filters.len(), 3);
        assert_eq!(
            filters.get(keys::FORM),
            Some(&FilterValue::Terms(vec!["rounded".into()]))
        );
        assert_eq!(filters.get(keys::LENGTH_MIN), Some(&FilterValue::Bound(12.5)));
    }

    #[test]
    fn empty_terms_are_preserved() {
        // A present key with no accepted values is a real constraint
        // ("matches nothing"), not an absent key.
        let filters = FilterMap::new().with_terms(keys::AMB, &[]);
        assert_eq!(filters.get(keys::AMB), Some(&FilterValue::Terms(vec![])));
    }

    #[test]
    fn sided_term_any_side_is_none() {
        let term = SidedTerm::new(None, "verrucate");
        assert_eq!(term.side, None);
        assert_eq!(term.value, "verrucate");
    }
}
