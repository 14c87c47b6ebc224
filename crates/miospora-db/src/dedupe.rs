//! Diagnosis uniqueness matcher.
//!
//! Before a genus is persisted, its resolved diagnosis signature is checked
//! against every stored diagnosis; a hit aborts the write with a conflict
//! carrying the existing genus's identity.
//!
//! Matching rules:
//!
//! - Scalar axes compare null-normalized: a missing reference id matches a
//!   stored NULL through `COALESCE(x, 0)`, a missing text through
//!   `COALESCE(x, '')`.
//! - A multi-valued axis participates only when the candidate supplies
//!   values for it, and then requires the stored diagnosis to share at
//!   least one of them. The comparison is deliberately asymmetric: a
//!   candidate that leaves an axis empty matches regardless of what the
//!   stored diagnosis has there.
//! - For the side-qualified axes the side of the FIRST supplied pair is
//!   null-matched for the whole axis. Longstanding quirk, preserved and
//!   pinned by test.
//! - `exclude_genus` lets the update path skip the record being edited.

use sqlx::{Sqlite, Transaction};
use tracing::debug;

use miospora_core::error::Result;
use miospora_core::models::GenusRef;

use crate::filter_query::{bind_params_as, QueryParam};

/// Fully resolved diagnosis signature: every display value already mapped
/// to its vocabulary row id (see `genera_tx::resolve_signature`).
#[derive(Debug, Clone, Default)]
pub(crate) struct DiagnosisSignature {
    pub infraturma_id: Option<i64>,
    pub form_id: Option<i64>,
    pub angles_shape_id: Option<i64>,
    pub area_presence_id: Option<i64>,
    pub outline_id: Option<i64>,
    pub outline_uneven_cause: Option<String>,
    pub laesurae_rays_length_min: Option<String>,
    pub laesurae_rays_length_max: Option<String>,
    pub additional_features: Option<String>,

    pub amb_ids: Vec<i64>,
    pub sides_shape_ids: Vec<i64>,
    pub laesurae_ids: Vec<i64>,
    pub laesurae_rays_ids: Vec<i64>,
    pub exine_structure_ids: Vec<i64>,
    pub exine_thickness_ids: Vec<i64>,

    pub growth_form: Option<GrowthFormSignature>,
    pub exoexine: Option<LayerSignature>,
    pub intexine: Option<LayerSignature>,

    pub sculpture: Vec<SidedIdPair>,
    pub ornamentation: Vec<SidedIdPair>,
}

#[derive(Debug, Clone)]
pub(crate) struct GrowthFormSignature {
    pub type_id: i64,
    pub thickness_id: Option<i64>,
    pub width_id: Option<i64>,
    pub structure: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct LayerSignature {
    pub thickness_id: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct SidedIdPair {
    pub value_id: i64,
    pub side_id: Option<i64>,
}

/// Find a stored genus whose diagnosis matches the signature.
pub(crate) async fn find_duplicate_tx(
    tx: &mut Transaction<'_, Sqlite>,
    signature: &DiagnosisSignature,
    exclude_genus: Option<i64>,
) -> Result<Option<GenusRef>> {
    let (sql, params) = build_query(signature, exclude_genus);
    let hit = bind_params_as(sqlx::query_as::<_, (i64, String)>(&sql), &params)
        .fetch_optional(&mut **tx)
        .await?;

    if let Some((id, ref name)) = hit {
        debug!(
            subsystem = "db",
            component = "dedupe",
            genus_id = id,
            genus_name = %name,
            "diagnosis signature matched existing genus"
        );
    }
    Ok(hit.map(|(id, name)| GenusRef { id, name }))
}

fn build_query(
    signature: &DiagnosisSignature,
    exclude_genus: Option<i64>,
) -> (String, Vec<QueryParam>) {
    let mut conds: Vec<String> = Vec::new();
    let mut params: Vec<QueryParam> = Vec::new();

    for (column, id) in [
        ("infraturma_id", signature.infraturma_id),
        ("form_id", signature.form_id),
        ("angles_shape_id", signature.angles_shape_id),
        ("area_presence_id", signature.area_presence_id),
        ("outline_id", signature.outline_id),
    ] {
        params.push(QueryParam::Int(id.unwrap_or(0)));
        conds.push(format!("COALESCE(d.{column}, 0) = ${}", params.len()));
    }

    for (column, text) in [
        ("outline_uneven_cause", &signature.outline_uneven_cause),
        (
            "laesurae_rays_length_min",
            &signature.laesurae_rays_length_min,
        ),
        (
            "laesurae_rays_length_max",
            &signature.laesurae_rays_length_max,
        ),
        ("additional_features", &signature.additional_features),
    ] {
        params.push(QueryParam::Text(text.clone().unwrap_or_default()));
        conds.push(format!("COALESCE(d.{column}, '') = ${}", params.len()));
    }

    for (link, link_fk, ids) in [
        ("spore_diagnosis_amb", "amb_id", &signature.amb_ids),
        (
            "spore_diagnosis_sides_shape",
            "side_shape_id",
            &signature.sides_shape_ids,
        ),
        (
            "spore_diagnosis_laesurae",
            "laesurae_shape_id",
            &signature.laesurae_ids,
        ),
        (
            "spore_diagnosis_laesurae_rays",
            "rays_shape_id",
            &signature.laesurae_rays_ids,
        ),
        (
            "spore_diagnosis_exine_structure",
            "exine_structure_id",
            &signature.exine_structure_ids,
        ),
        (
            "spore_diagnosis_exine_thickness",
            "thickness_id",
            &signature.exine_thickness_ids,
        ),
    ] {
        if ids.is_empty() {
            continue;
        }
        let list = id_list(ids, &mut params);
        conds.push(format!(
            "EXISTS (SELECT 1 FROM {link} l WHERE l.diagnosis_id = g.id AND l.{link_fk} IN ({list}))"
        ));
    }

    if let Some(growth) = &signature.growth_form {
        params.push(QueryParam::Int(growth.type_id));
        let type_p = params.len();
        params.push(QueryParam::Int(growth.thickness_id.unwrap_or(0)));
        let thickness_p = params.len();
        params.push(QueryParam::Int(growth.width_id.unwrap_or(0)));
        let width_p = params.len();
        params.push(QueryParam::Text(growth.structure.clone().unwrap_or_default()));
        let structure_p = params.len();
        conds.push(format!(
            "EXISTS (SELECT 1 FROM exine_growth_form egf WHERE egf.diagnosis_id = g.id \
             AND egf.type_id = ${type_p} \
             AND COALESCE(egf.thickness_id, 0) = ${thickness_p} \
             AND COALESCE(egf.width_id, 0) = ${width_p} \
             AND COALESCE(egf.structure, '') = ${structure_p})"
        ));
    }

    for (table, alias, layer) in [
        ("exoexine", "ex", &signature.exoexine),
        ("intexine", "ix", &signature.intexine),
    ] {
        let Some(layer) = layer else { continue };
        params.push(QueryParam::Int(layer.thickness_id.unwrap_or(0)));
        let thickness_p = params.len();
        params.push(QueryParam::Text(layer.description.clone().unwrap_or_default()));
        let description_p = params.len();
        conds.push(format!(
            "EXISTS (SELECT 1 FROM {table} {alias} WHERE {alias}.diagnosis_id = g.id \
             AND COALESCE({alias}.thickness_id, 0) = ${thickness_p} \
             AND COALESCE({alias}.description, '') = ${description_p})"
        ));
    }

    for (link, link_fk, pairs) in [
        ("spore_diagnosis_sculpture", "sculpture_id", &signature.sculpture),
        (
            "spore_diagnosis_ornamentation",
            "ornamentation_id",
            &signature.ornamentation,
        ),
    ] {
        let Some(first) = pairs.first() else { continue };
        let ids: Vec<i64> = pairs.iter().map(|p| p.value_id).collect();
        let list = id_list(&ids, &mut params);
        // Side taken from the first pair only; see module docs.
        params.push(QueryParam::Int(first.side_id.unwrap_or(0)));
        let side_p = params.len();
        conds.push(format!(
            "EXISTS (SELECT 1 FROM {link} l WHERE l.diagnosis_id = g.id \
             AND l.{link_fk} IN ({list}) AND COALESCE(l.side_id, 0) = ${side_p})"
        ));
    }

    if let Some(genus_id) = exclude_genus {
        params.push(QueryParam::Int(genus_id));
        conds.push(format!("g.id <> ${}", params.len()));
    }

    let sql = format!(
        "SELECT g.id, g.name FROM genera g \
         JOIN diagnosis d ON d.genus_id = g.id \
         WHERE {} LIMIT 1",
        conds.join(" AND ")
    );
    (sql, params)
}

fn id_list(ids: &[i64], params: &mut Vec<QueryParam>) -> String {
    let mut placeholders = Vec::with_capacity(ids.len());
    for id in ids {
        params.push(QueryParam::Int(*id));
        placeholders.push(format!("${}", params.len()));
    }
    placeholders.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_signature_still_matches_on_null_normalized_scalars() {
        let (sql, params) = build_query(&DiagnosisSignature::default(), None);
        assert!(sql.contains("COALESCE(d.infraturma_id, 0) = $1"));
        assert!(sql.contains("COALESCE(d.additional_features, '') = $9"));
        // No multi-valued axis participates when the candidate is empty.
        assert!(!sql.contains("EXISTS"));
        assert_eq!(params.len(), 9);
    }

    #[test]
    fn supplied_multi_axis_adds_existence_condition() {
        let signature = DiagnosisSignature {
            amb_ids: vec![3, 7],
            ..Default::default()
        };
        let (sql, params) = build_query(&signature, None);
        assert!(sql.contains(
            "EXISTS (SELECT 1 FROM spore_diagnosis_amb l \
             WHERE l.diagnosis_id = g.id AND l.amb_id IN ($10, $11))"
        ));
        assert_eq!(params[9], QueryParam::Int(3));
        assert_eq!(params[10], QueryParam::Int(7));
    }

    #[test]
    fn sided_axis_uses_first_pair_side_only() {
        let signature = DiagnosisSignature {
            sculpture: vec![
                SidedIdPair {
                    value_id: 5,
                    side_id: Some(2),
                },
                SidedIdPair {
                    value_id: 6,
                    side_id: Some(9),
                },
            ],
            ..Default::default()
        };
        let (sql, params) = build_query(&signature, None);
        assert!(sql.contains("COALESCE(l.side_id, 0) = $12"));
        // The second pair's side id (9) never appears as a parameter.
        assert_eq!(params[11], QueryParam::Int(2));
        assert!(!params.contains(&QueryParam::Int(9)));
    }

    #[test]
    fn exclude_genus_appends_inequality() {
        let (sql, params) = build_query(&DiagnosisSignature::default(), Some(42));
        assert!(sql.contains("g.id <> $10"));
        assert_eq!(params[9], QueryParam::Int(42));
    }

    #[test]
    fn growth_form_matches_all_fields_null_normalized() {
        let signature = DiagnosisSignature {
            growth_form: Some(GrowthFormSignature {
                type_id: 1,
                thickness_id: None,
                width_id: None,
                structure: None,
            }),
            ..Default::default()
        };
        let (sql, params) = build_query(&signature, None);
        assert!(sql.contains("egf.type_id = $10"));
        assert!(sql.contains("COALESCE(egf.thickness_id, 0) = $11"));
        assert!(sql.contains("COALESCE(egf.structure, '') = $13"));
        assert_eq!(params[12], QueryParam::Text(String::new()));
    }
}
