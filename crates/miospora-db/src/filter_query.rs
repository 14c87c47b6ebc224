//! Genus filter query builder.
//!
//! Compiles a sparse [`FilterMap`] into a parameterized SQL WHERE clause
//! over the normalized diagnosis schema. Instead of branch-per-field query
//! assembly, the filterable axes live in one declarative table
//! ([`AXES`]); each entry is independently evaluated against the present
//! filter map and compiled into its own clause fragment.
//!
//! Compilation rules:
//!
//! 1. **Absent key**: no constraint. **Unknown key**: ignored, never
//!    rejected — the axis set is fixed and domain-specific.
//! 2. **Present key with an empty accepted-value list**: a deliberate
//!    "matches nothing" constraint, compiled to `1 = 0`.
//! 3. Cross-field combination is AND; within one field's accepted-value
//!    list, membership is OR.
//! 4. Every relation-reaching axis compiles to an EXISTS subquery anchored
//!    at the genus root, so multi-valued matches never multiply result
//!    rows and axes sharing a vocabulary table (thickness in its four
//!    structural contexts) stay isolated in their own subquery scope.
//! 5. All values are parameterized (`$N` placeholders).

use miospora_core::codec::{GeoRef, StratComponent, StratExpr};
use miospora_core::filter::{keys, FilterMap, FilterValue, SidedTerm};

/// Type-safe parameter binding for dynamically assembled queries.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    /// String parameter.
    Text(String),
    /// Floating point parameter (size bounds).
    Real(f64),
    /// Integer parameter (row ids).
    Int(i64),
}

/// Bind assembled parameters onto a query in order.
pub fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    params: &'q [QueryParam],
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for param in params {
        query = match param {
            QueryParam::Text(s) => query.bind(s),
            QueryParam::Real(f) => query.bind(*f),
            QueryParam::Int(i) => query.bind(*i),
        };
    }
    query
}

/// Bind assembled parameters onto a typed query in order.
pub fn bind_params_as<'q, O>(
    mut query: sqlx::query::QueryAs<'q, sqlx::Sqlite, O, sqlx::sqlite::SqliteArguments<'q>>,
    params: &'q [QueryParam],
) -> sqlx::query::QueryAs<'q, sqlx::Sqlite, O, sqlx::sqlite::SqliteArguments<'q>> {
    for param in params {
        query = match param {
            QueryParam::Text(s) => query.bind(s),
            QueryParam::Real(f) => query.bind(*f),
            QueryParam::Int(i) => query.bind(*i),
        };
    }
    query
}

// =============================================================================
// DECLARATIVE AXIS TABLE
// =============================================================================

/// Structural shape of one filterable axis.
///
/// The root query aliases are fixed: `g` = genera, `d` = diagnosis
/// (LEFT JOINed so an empty filter returns every genus).
#[derive(Debug, Clone, Copy)]
enum AxisShape {
    /// Single-valued vocabulary FK on the diagnosis row.
    ScalarRef {
        fk: &'static str,
        table: &'static str,
        column: &'static str,
    },
    /// Vocabulary facet reached through the diagnosis's infraturma.
    InfraturmaFacet {
        fk: &'static str,
        table: &'static str,
    },
    /// ≥1 join row whose vocabulary value is in the accepted set.
    Membership {
        link: &'static str,
        link_fk: &'static str,
        vocab: &'static str,
        column: &'static str,
    },
    /// Vocabulary FK on the exine growth form sub-record.
    GrowthRef {
        fk: &'static str,
        vocab: &'static str,
        column: &'static str,
    },
    /// Free-text column on the exine growth form sub-record.
    GrowthText { column: &'static str },
    /// Thickness value on a zero-or-one layer sub-record.
    LayerThickness {
        table: &'static str,
        alias: &'static str,
    },
    /// Side-qualified AND-of-pairs axis.
    SideQualified {
        link: &'static str,
        link_fk: &'static str,
        vocab: &'static str,
        column: &'static str,
    },
    /// Candidate's stored minimum must be >= the query floor.
    Floor { column: &'static str },
    /// Candidate's stored maximum must be <= the query ceiling.
    Ceiling { column: &'static str },
    /// Composite multi-select over packed stratigraphy strings.
    Stratigraphy,
    /// Composite multi-select over packed geography strings.
    Geography,
}

struct AxisSpec {
    key: &'static str,
    shape: AxisShape,
}

/// Every filterable axis. Order fixes parameter order for a given map.
const AXES: &[AxisSpec] = &[
    AxisSpec {
        key: keys::INFRATURMA,
        shape: AxisShape::ScalarRef {
            fk: "infraturma_id",
            table: "infraturma",
            column: "name",
        },
    },
    AxisSpec {
        key: keys::CHARACTER_OF_LAESURAE,
        shape: AxisShape::InfraturmaFacet {
            fk: "character_of_laesurae_id",
            table: "character_of_laesurae",
        },
    },
    AxisSpec {
        key: keys::EXINE_STRATIFICATION,
        shape: AxisShape::InfraturmaFacet {
            fk: "exine_stratification_id",
            table: "exine_stratification",
        },
    },
    AxisSpec {
        key: keys::EXINE_TYPE,
        shape: AxisShape::InfraturmaFacet {
            fk: "exine_type_id",
            table: "exine_type",
        },
    },
    AxisSpec {
        key: keys::FORM,
        shape: AxisShape::ScalarRef {
            fk: "form_id",
            table: "form",
            column: "name",
        },
    },
    AxisSpec {
        key: keys::ANGLES_SHAPE,
        shape: AxisShape::ScalarRef {
            fk: "angles_shape_id",
            table: "angles_shape",
            column: "name",
        },
    },
    AxisSpec {
        key: keys::AREA_PRESENCE,
        shape: AxisShape::ScalarRef {
            fk: "area_presence_id",
            table: "area_presence",
            column: "name",
        },
    },
    AxisSpec {
        key: keys::OUTLINE,
        shape: AxisShape::ScalarRef {
            fk: "outline_id",
            table: "outline",
            column: "name",
        },
    },
    AxisSpec {
        key: keys::AMB,
        shape: AxisShape::Membership {
            link: "spore_diagnosis_amb",
            link_fk: "amb_id",
            vocab: "spore_amb",
            column: "amb",
        },
    },
    AxisSpec {
        key: keys::SIDES_SHAPE,
        shape: AxisShape::Membership {
            link: "spore_diagnosis_sides_shape",
            link_fk: "side_shape_id",
            vocab: "spore_sides_shape",
            column: "side_shape",
        },
    },
    AxisSpec {
        key: keys::LAESURAE_SHAPE,
        shape: AxisShape::Membership {
            link: "spore_diagnosis_laesurae",
            link_fk: "laesurae_shape_id",
            vocab: "spore_laesurae",
            column: "laesurae_shape",
        },
    },
    AxisSpec {
        key: keys::LAESURAE_RAYS,
        shape: AxisShape::Membership {
            link: "spore_diagnosis_laesurae_rays",
            link_fk: "rays_shape_id",
            vocab: "spore_laesurae_rays",
            column: "rays_shape",
        },
    },
    AxisSpec {
        key: keys::EXINE_STRUCTURE,
        shape: AxisShape::Membership {
            link: "spore_diagnosis_exine_structure",
            link_fk: "exine_structure_id",
            vocab: "spore_exine_structure",
            column: "exine_structure",
        },
    },
    AxisSpec {
        key: keys::EXINE_THICKNESS,
        shape: AxisShape::Membership {
            link: "spore_diagnosis_exine_thickness",
            link_fk: "thickness_id",
            vocab: "thickness",
            column: "value",
        },
    },
    AxisSpec {
        key: keys::EXINE_GROWTH_TYPE,
        shape: AxisShape::GrowthRef {
            fk: "type_id",
            vocab: "exine_growth_type",
            column: "name",
        },
    },
    AxisSpec {
        key: keys::EXINE_GROWTH_THICKNESS,
        shape: AxisShape::GrowthRef {
            fk: "thickness_id",
            vocab: "thickness",
            column: "value",
        },
    },
    AxisSpec {
        key: keys::EXINE_GROWTH_WIDTH,
        shape: AxisShape::GrowthRef {
            fk: "width_id",
            vocab: "width",
            column: "value",
        },
    },
    AxisSpec {
        key: keys::EXINE_GROWTH_STRUCTURE,
        shape: AxisShape::GrowthText {
            column: "structure",
        },
    },
    AxisSpec {
        key: keys::EXOEXINE_THICKNESS,
        shape: AxisShape::LayerThickness {
            table: "exoexine",
            alias: "ex",
        },
    },
    AxisSpec {
        key: keys::INTEXINE_THICKNESS,
        shape: AxisShape::LayerThickness {
            table: "intexine",
            alias: "ix",
        },
    },
    AxisSpec {
        key: keys::SCULPTURE,
        shape: AxisShape::SideQualified {
            link: "spore_diagnosis_sculpture",
            link_fk: "sculpture_id",
            vocab: "spore_sculpture",
            column: "sculpture",
        },
    },
    AxisSpec {
        key: keys::ORNAMENTATION,
        shape: AxisShape::SideQualified {
            link: "spore_diagnosis_ornamentation",
            link_fk: "ornamentation_id",
            vocab: "spore_ornamentation",
            column: "ornamentation",
        },
    },
    AxisSpec {
        key: keys::LENGTH_MIN,
        shape: AxisShape::Floor {
            column: "length_min",
        },
    },
    AxisSpec {
        key: keys::LENGTH_MAX,
        shape: AxisShape::Ceiling {
            column: "length_max",
        },
    },
    AxisSpec {
        key: keys::WIDTH_MIN,
        shape: AxisShape::Floor {
            column: "width_min",
        },
    },
    AxisSpec {
        key: keys::WIDTH_MAX,
        shape: AxisShape::Ceiling {
            column: "width_max",
        },
    },
    AxisSpec {
        key: keys::STRATIGRAPHY,
        shape: AxisShape::Stratigraphy,
    },
    AxisSpec {
        key: keys::GEOGRAPHY,
        shape: AxisShape::Geography,
    },
];

// =============================================================================
// QUERY BUILDER
// =============================================================================

/// Result of compiling a filter map.
#[derive(Debug, Clone)]
pub struct FilterQueryResult {
    /// The WHERE clause fragment (without the `WHERE` keyword);
    /// `"1 = 1"` when no axis is active.
    pub where_clause: String,
    /// Query parameters in the order they appear in the SQL.
    pub params: Vec<QueryParam>,
    /// Number of filter axes that contributed a clause.
    pub active_axes: usize,
}

/// Compiles a [`FilterMap`] into a WHERE fragment over the
/// `genera g LEFT JOIN diagnosis d` root.
pub struct GenusFilterQueryBuilder<'a> {
    filters: &'a FilterMap,
    param_offset: usize,
}

impl<'a> GenusFilterQueryBuilder<'a> {
    /// Create a new builder.
    ///
    /// `param_offset` is the number of parameters already present in the
    /// enclosing query.
    pub fn new(filters: &'a FilterMap, param_offset: usize) -> Self {
        Self {
            filters,
            param_offset,
        }
    }

    /// Compile every active axis into the combined WHERE fragment.
    pub fn build(&self) -> FilterQueryResult {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<QueryParam> = Vec::new();
        let mut param_idx = self.param_offset;

        for spec in AXES {
            let Some(value) = self.filters.get(spec.key) else {
                continue;
            };
            if let Some(clause) =
                compile_axis(&spec.shape, value, &mut param_idx, &mut params)
            {
                clauses.push(clause);
            }
        }

        let active_axes = clauses.len();
        let where_clause = if clauses.is_empty() {
            "1 = 1".to_string()
        } else {
            clauses.join(" AND ")
        };

        FilterQueryResult {
            where_clause,
            params,
            active_axes,
        }
    }
}

/// Compile one axis; returns `None` when the supplied value has the wrong
/// shape for the axis (treated like an unknown key).
fn compile_axis(
    shape: &AxisShape,
    value: &FilterValue,
    param_idx: &mut usize,
    params: &mut Vec<QueryParam>,
) -> Option<String> {
    match shape {
        AxisShape::ScalarRef { fk, table, column } => {
            let terms = as_terms(value)?;
            Some(membership_or_nothing(terms, param_idx, params, |list| {
                format!(
                    "EXISTS (SELECT 1 FROM {table} v WHERE v.id = d.{fk} AND v.{column} IN ({list}))"
                )
            }))
        }
        AxisShape::InfraturmaFacet { fk, table } => {
            let terms = as_terms(value)?;
            Some(membership_or_nothing(terms, param_idx, params, |list| {
                format!(
                    "EXISTS (SELECT 1 FROM infraturma i JOIN {table} v ON v.id = i.{fk} \
                     WHERE i.id = d.infraturma_id AND v.name IN ({list}))"
                )
            }))
        }
        AxisShape::Membership {
            link,
            link_fk,
            vocab,
            column,
        } => {
            let terms = as_terms(value)?;
            Some(membership_or_nothing(terms, param_idx, params, |list| {
                format!(
                    "EXISTS (SELECT 1 FROM {link} l JOIN {vocab} v ON v.id = l.{link_fk} \
                     WHERE l.diagnosis_id = g.id AND v.{column} IN ({list}))"
                )
            }))
        }
        AxisShape::GrowthRef { fk, vocab, column } => {
            let terms = as_terms(value)?;
            Some(membership_or_nothing(terms, param_idx, params, |list| {
                format!(
                    "EXISTS (SELECT 1 FROM exine_growth_form egf JOIN {vocab} v ON v.id = egf.{fk} \
                     WHERE egf.diagnosis_id = g.id AND v.{column} IN ({list}))"
                )
            }))
        }
        AxisShape::GrowthText { column } => {
            let terms = as_terms(value)?;
            Some(membership_or_nothing(terms, param_idx, params, |list| {
                format!(
                    "EXISTS (SELECT 1 FROM exine_growth_form egf \
                     WHERE egf.diagnosis_id = g.id AND egf.{column} IN ({list}))"
                )
            }))
        }
        AxisShape::LayerThickness { table, alias } => {
            let terms = as_terms(value)?;
            Some(membership_or_nothing(terms, param_idx, params, |list| {
                format!(
                    "EXISTS (SELECT 1 FROM {table} {alias} JOIN thickness t ON t.id = {alias}.thickness_id \
                     WHERE {alias}.diagnosis_id = g.id AND t.value IN ({list}))"
                )
            }))
        }
        AxisShape::SideQualified {
            link,
            link_fk,
            vocab,
            column,
        } => {
            let pairs = as_sided(value)?;
            Some(compile_side_qualified(
                link, link_fk, vocab, column, pairs, param_idx, params,
            ))
        }
        AxisShape::Floor { column } => {
            let bound = as_bound(value)?;
            *param_idx += 1;
            params.push(QueryParam::Real(bound));
            Some(format!("g.{column} >= ${param_idx}"))
        }
        AxisShape::Ceiling { column } => {
            let bound = as_bound(value)?;
            *param_idx += 1;
            params.push(QueryParam::Real(bound));
            Some(format!("g.{column} <= ${param_idx}"))
        }
        AxisShape::Stratigraphy => {
            let terms = as_terms(value)?;
            Some(compile_stratigraphy(terms, param_idx, params))
        }
        AxisShape::Geography => {
            let terms = as_terms(value)?;
            Some(compile_geography(terms, param_idx, params))
        }
    }
}

fn as_terms(value: &FilterValue) -> Option<&[String]> {
    match value {
        FilterValue::Terms(terms) => Some(terms),
        _ => None,
    }
}

fn as_sided(value: &FilterValue) -> Option<&[SidedTerm]> {
    match value {
        FilterValue::SidedTerms(pairs) => Some(pairs),
        _ => None,
    }
}

fn as_bound(value: &FilterValue) -> Option<f64> {
    match value {
        FilterValue::Bound(bound) => Some(*bound),
        _ => None,
    }
}

/// Allocate placeholders for each term and render the clause, or compile
/// the deliberate "matches nothing" constraint for an empty list.
fn membership_or_nothing(
    terms: &[String],
    param_idx: &mut usize,
    params: &mut Vec<QueryParam>,
    render: impl FnOnce(String) -> String,
) -> String {
    if terms.is_empty() {
        return "1 = 0".to_string();
    }
    let list = placeholder_list(terms.len(), param_idx);
    params.extend(terms.iter().map(|t| QueryParam::Text(t.clone())));
    render(list)
}

fn placeholder_list(count: usize, param_idx: &mut usize) -> String {
    let mut placeholders = Vec::with_capacity(count);
    for _ in 0..count {
        *param_idx += 1;
        placeholders.push(format!("${param_idx}"));
    }
    placeholders.join(", ")
}

/// Each selected (side, value) pair becomes its own existence condition;
/// all pairs are conjoined, so a genus must satisfy every pair, possibly
/// via different assignment rows.
fn compile_side_qualified(
    link: &str,
    link_fk: &str,
    vocab: &str,
    column: &str,
    pairs: &[SidedTerm],
    param_idx: &mut usize,
    params: &mut Vec<QueryParam>,
) -> String {
    if pairs.is_empty() {
        return "1 = 0".to_string();
    }

    let mut clauses = Vec::with_capacity(pairs.len());
    for pair in pairs {
        *param_idx += 1;
        params.push(QueryParam::Text(pair.value.clone()));
        let mut clause = format!(
            "EXISTS (SELECT 1 FROM {link} l JOIN {vocab} v ON v.id = l.{link_fk} \
             WHERE l.diagnosis_id = g.id AND v.{column} = ${param_idx}"
        );
        if let Some(side) = &pair.side {
            *param_idx += 1;
            params.push(QueryParam::Text(side.clone()));
            clause.push_str(&format!(
                " AND l.side_id IN (SELECT s.id FROM spore_side s WHERE s.name = ${param_idx})"
            ));
        }
        clause.push(')');
        clauses.push(clause);
    }
    clauses.join(" AND ")
}

/// Decode each packed string; within the axis the decoded conditions are
/// ORed. Strings that decode to no criterion drop out; if every string
/// does, the axis degrades to "has at least one stratigraphy link".
fn compile_stratigraphy(
    terms: &[String],
    param_idx: &mut usize,
    params: &mut Vec<QueryParam>,
) -> String {
    if terms.is_empty() {
        return "1 = 0".to_string();
    }

    let mut alternatives = Vec::new();
    for term in terms {
        let Some(expr) = StratExpr::decode(term) else {
            continue;
        };
        if expr.is_unconstrained() {
            continue;
        }
        let mut conds = Vec::new();
        for (column, component) in [
            ("period", &expr.period),
            ("epoch", &expr.epoch),
            ("stage", &expr.stage),
        ] {
            match component {
                StratComponent::Any => {}
                StratComponent::IsNull => conds.push(format!("sp.{column} IS NULL")),
                StratComponent::Matches(v) => {
                    *param_idx += 1;
                    params.push(QueryParam::Text(v.clone()));
                    conds.push(format!("LOWER(sp.{column}) = LOWER(${param_idx})"));
                }
            }
        }
        alternatives.push(format!("({})", conds.join(" AND ")));
    }

    if alternatives.is_empty() {
        return "EXISTS (SELECT 1 FROM genus_stratigraphy gs WHERE gs.genus_id = g.id)"
            .to_string();
    }

    format!(
        "EXISTS (SELECT 1 FROM genus_stratigraphy gs \
         JOIN stratigraphic_periods sp ON sp.id = gs.period_id \
         WHERE gs.genus_id = g.id AND ({}))",
        alternatives.join(" OR ")
    )
}

/// Matching is by leaf name only, case-insensitively; the parent label in
/// the packed string is informational (see `codec::GeoRef`).
fn compile_geography(
    terms: &[String],
    param_idx: &mut usize,
    params: &mut Vec<QueryParam>,
) -> String {
    if terms.is_empty() {
        return "1 = 0".to_string();
    }

    let names: Vec<String> = terms
        .iter()
        .filter_map(|t| GeoRef::decode(t))
        .map(|geo| geo.name.to_lowercase())
        .collect();

    if names.is_empty() {
        return "EXISTS (SELECT 1 FROM genus_geography gg WHERE gg.genus_id = g.id)".to_string();
    }

    let list = placeholder_list(names.len(), param_idx);
    params.extend(names.into_iter().map(QueryParam::Text));
    format!(
        "EXISTS (SELECT 1 FROM genus_geography gg \
         JOIN geographic_location gl ON gl.id = gg.geographic_location_id \
         WHERE gg.genus_id = g.id AND LOWER(gl.name) IN ({list}))"
    )
}
