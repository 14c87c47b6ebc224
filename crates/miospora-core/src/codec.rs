//! Composite-field codec for packed display strings.
//!
//! Two composite-encoded fields pack structured components into a single
//! display string shared by the search filters and the record assembler:
//!
//! - **Stratigraphic period**: `"period epoch, stage"` — first whitespace
//!   token is the period, remaining tokens of the pre-comma part form the
//!   epoch, everything after the first comma is the stage. A component equal
//!   (case-insensitively) to the literal `"null"` means "the stored
//!   component is explicitly null"; an absent component imposes no
//!   condition.
//! - **Geographic location**: `"parent: name"` — the leaf name after the
//!   first colon is what matching uses; the parent label is informational
//!   only and is deliberately NOT used to disambiguate (two parents sharing
//!   a child name are matched alike).

use serde::{Deserialize, Serialize};

// =============================================================================
// STRATIGRAPHY
// =============================================================================

/// Match condition for one stratigraphic component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StratComponent {
    /// Component absent from the display string; imposes no condition.
    Any,
    /// Literal `"null"` in the display string; matches an explicitly
    /// null stored component.
    IsNull,
    /// Case-insensitive equality with the stored component.
    Matches(String),
}

impl StratComponent {
    fn decode(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            StratComponent::Any
        } else if raw.eq_ignore_ascii_case("null") {
            StratComponent::IsNull
        } else {
            StratComponent::Matches(raw.to_string())
        }
    }

    /// True when the component contributes a condition.
    pub fn is_constrained(&self) -> bool {
        !matches!(self, StratComponent::Any)
    }
}

/// Decoded stratigraphic match expression: one condition per component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratExpr {
    pub period: StratComponent,
    pub epoch: StratComponent,
    pub stage: StratComponent,
}

impl StratExpr {
    /// Decode a packed stratigraphic display string.
    ///
    /// Returns `None` for a whitespace-only string (no criterion).
    pub fn decode(input: &str) -> Option<StratExpr> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let (main, stage) = match input.split_once(',') {
            Some((main, stage)) => (main.trim(), stage.trim()),
            None => (input, ""),
        };

        let mut tokens = main.split_whitespace();
        let period = tokens.next().unwrap_or("");
        let epoch = tokens.collect::<Vec<_>>().join(" ");

        Some(StratExpr {
            period: StratComponent::decode(period),
            epoch: StratComponent::decode(&epoch),
            stage: StratComponent::decode(stage),
        })
    }

    /// True when no component carries a condition.
    pub fn is_unconstrained(&self) -> bool {
        !self.period.is_constrained()
            && !self.epoch.is_constrained()
            && !self.stage.is_constrained()
    }
}

/// Encode stored stratigraphic components into the packed display string.
///
/// Present components join as `"period epoch"`, with `", stage"` appended;
/// a lone stage is the whole string.
pub fn encode_stratigraphy(
    period: Option<&str>,
    epoch: Option<&str>,
    stage: Option<&str>,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(p) = period.filter(|p| !p.trim().is_empty()) {
        parts.push(p.trim().to_string());
    }
    if let Some(e) = epoch.filter(|e| !e.trim().is_empty()) {
        parts.push(e.trim().to_string());
    }
    if let Some(s) = stage.filter(|s| !s.trim().is_empty()) {
        match parts.last_mut() {
            Some(last) => {
                last.push_str(", ");
                last.push_str(s.trim());
            }
            None => parts.push(s.trim().to_string()),
        }
    }
    parts.join(" ")
}

// =============================================================================
// GEOGRAPHY
// =============================================================================

/// Decoded geographic reference.
///
/// Only `name` participates in matching. `parent` is carried for display
/// purposes; if two distinct parents share a child name, both children
/// match — preserved behavior, see DESIGN.md.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoRef {
    pub parent: Option<String>,
    pub name: String,
}

impl GeoRef {
    /// Decode a packed geographic display string.
    ///
    /// Splits on the first colon; the substring after it is the leaf name,
    /// the label before it the informational parent. Returns `None` for a
    /// whitespace-only string.
    pub fn decode(input: &str) -> Option<GeoRef> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        match input.split_once(':') {
            Some((parent, name)) => {
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                let parent = parent.trim();
                Some(GeoRef {
                    parent: (!parent.is_empty()).then(|| parent.to_string()),
                    name: name.to_string(),
                })
            }
            None => Some(GeoRef {
                parent: None,
                name: input.to_string(),
            }),
        }
    }

    /// Encode back into the packed display form.
    pub fn encode(&self) -> String {
        encode_geography(self.parent.as_deref(), &self.name)
    }
}

/// Encode a geographic node as `"parentName: name"`, or just `"name"`
/// for a root node.
pub fn encode_geography(parent: Option<&str>, name: &str) -> String {
    match parent.filter(|p| !p.trim().is_empty()) {
        Some(parent) => format!("{}: {}", parent.trim(), name.trim()),
        None => name.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_full_triple() {
        let expr = StratExpr::decode("Devonian Upper, Famennian").unwrap();
        assert_eq!(expr.period, StratComponent::Matches("Devonian".into()));
        assert_eq!(expr.epoch, StratComponent::Matches("Upper".into()));
        assert_eq!(expr.stage, StratComponent::Matches("Famennian".into()));
    }

    #[test]
    fn decode_period_only() {
        let expr = StratExpr::decode("Carboniferous").unwrap();
        assert_eq!(
            expr.period,
            StratComponent::Matches("Carboniferous".into())
        );
        assert_eq!(expr.epoch, StratComponent::Any);
        assert_eq!(expr.stage, StratComponent::Any);
    }

    #[test]
    fn decode_multiword_epoch() {
        let expr = StratExpr::decode("Permian Middle Upper").unwrap();
        assert_eq!(expr.epoch, StratComponent::Matches("Middle Upper".into()));
    }

    #[test]
    fn decode_null_literal_is_explicit_null() {
        let expr = StratExpr::decode("Devonian null, NULL").unwrap();
        assert_eq!(expr.period, StratComponent::Matches("Devonian".into()));
        assert_eq!(expr.epoch, StratComponent::IsNull);
        assert_eq!(expr.stage, StratComponent::IsNull);
    }

    #[test]
    fn decode_whitespace_only_is_no_criterion() {
        assert_eq!(StratExpr::decode("   "), None);
        assert_eq!(StratExpr::decode(""), None);
    }

    #[test]
    fn encode_joins_present_components() {
        assert_eq!(
            encode_stratigraphy(Some("Devonian"), Some("Upper"), Some("Famennian")),
            "Devonian Upper, Famennian"
        );
        assert_eq!(
            encode_stratigraphy(Some("Devonian"), None, Some("Famennian")),
            "Devonian, Famennian"
        );
        assert_eq!(encode_stratigraphy(None, None, Some("Famennian")), "Famennian");
        assert_eq!(encode_stratigraphy(Some("Devonian"), None, None), "Devonian");
        assert_eq!(encode_stratigraphy(None, None, None), "");
    }

    #[test]
    fn stratigraphy_round_trips_for_component_grid() {
        // Every combination of {value, absent} per component: the re-decoded
        // expression must be condition-equivalent to the first decode.
        let values = [
            (Some("Devonian"), Some("Upper"), Some("Famennian")),
            (Some("Devonian"), Some("Upper"), None),
            (Some("Devonian"), None, Some("Famennian")),
            (Some("Devonian"), None, None),
            (None, None, Some("Famennian")),
        ];
        for (period, epoch, stage) in values {
            let encoded = encode_stratigraphy(period, epoch, stage);
            let expr = StratExpr::decode(&encoded).unwrap();
            let re_encoded = encode_stratigraphy(
                match &expr.period {
                    StratComponent::Matches(v) => Some(v.as_str()),
                    _ => None,
                },
                match &expr.epoch {
                    StratComponent::Matches(v) => Some(v.as_str()),
                    _ => None,
                },
                match &expr.stage {
                    StratComponent::Matches(v) => Some(v.as_str()),
                    _ => None,
                },
            );
            assert_eq!(encoded, re_encoded);
            assert_eq!(StratExpr::decode(&re_encoded).unwrap(), expr);
        }
    }

    #[test]
    fn geo_decode_with_parent() {
        let geo = GeoRef::decode("Russia: Siberia").unwrap();
        assert_eq!(geo.parent.as_deref(), Some("Russia"));
        assert_eq!(geo.name, "Siberia");
    }

    #[test]
    fn geo_decode_without_parent() {
        let geo = GeoRef::decode("  Siberia ").unwrap();
        assert_eq!(geo.parent, None);
        assert_eq!(geo.name, "Siberia");
    }

    #[test]
    fn geo_decode_blank_is_no_criterion() {
        assert_eq!(GeoRef::decode("   "), None);
        assert_eq!(GeoRef::decode("Russia:  "), None);
    }

    #[test]
    fn geo_round_trip() {
        for input in ["Russia: Siberia", "Siberia"] {
            let geo = GeoRef::decode(input).unwrap();
            assert_eq!(geo.encode(), input);
            assert_eq!(GeoRef::decode(&geo.encode()).unwrap(), geo);
        }
    }
}
