//! Atomic genus record assembler.
//!
//! A [`GenusPayload`] is persisted as one transaction: name check,
//! vocabulary resolution, duplicate-diagnosis check, then the genus row and
//! every child collection. Any failure rolls the whole submission back, so
//! a genus is never half-written.
//!
//! Ordering matters: the payload's display values are resolved to
//! vocabulary row ids FIRST (upserting unknown values inside the same
//! transaction), so the duplicate check sees exactly the ids the write
//! would use. Stratigraphy and geography links resolve against existing
//! reference rows only; a packed string that matches no stored row is
//! skipped with a debug log, never an error.
//!
//! Update is wholesale replacement: scalars are updated in place, every
//! child collection is deleted and recreated from the payload, and the
//! duplicate check excludes the genus being edited.

use std::time::Instant;

use chrono::Utc;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use miospora_core::codec::{GeoRef, StratExpr};
use miospora_core::error::{Error, Result};
use miospora_core::models::{present, DiagnosisPayload, GenusPayload, SidedValue};

use crate::dedupe::{
    self, DiagnosisSignature, GrowthFormSignature, LayerSignature, SidedIdPair,
};
use crate::vocab::{self, tables, VocabTable};

/// Create a whole genus record. Returns the new genus id.
pub(crate) async fn create_genus(pool: &SqlitePool, payload: &GenusPayload) -> Result<i64> {
    let start = Instant::now();
    validate(payload)?;

    let mut tx = pool.begin().await?;
    check_name_available(&mut tx, &payload.name, None).await?;

    let signature = resolve_signature(&mut tx, &payload.diagnosis).await?;
    if let Some(existing) = dedupe::find_duplicate_tx(&mut tx, &signature, None).await? {
        return Err(Error::DuplicateDiagnosis {
            id: existing.id,
            name: existing.name,
        });
    }

    let now = Utc::now();
    let row = sqlx::query(
        "INSERT INTO genera (name, full_name, type_species, length_min, length_max, \
                             width_min, width_max, comparison, natural_affiliation, \
                             created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING id",
    )
    .bind(payload.name.trim())
    .bind(payload.full_name.trim())
    .bind(present(payload.type_species.as_deref()))
    .bind(payload.length_min)
    .bind(payload.length_max)
    .bind(payload.width_min)
    .bind(payload.width_max)
    .bind(present(payload.comparison.as_deref()))
    .bind(present(payload.natural_affiliation.as_deref()))
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;
    let genus_id: i64 = row.get("id");

    insert_children(&mut tx, genus_id, payload, &signature).await?;
    tx.commit().await?;

    info!(
        subsystem = "db",
        component = "genera_tx",
        op = "create",
        genus_id,
        genus_name = %payload.name,
        duration_ms = start.elapsed().as_millis() as u64,
        "genus created"
    );
    Ok(genus_id)
}

/// Replace an existing genus record. Returns the genus id.
pub(crate) async fn update_genus(
    pool: &SqlitePool,
    genus_id: i64,
    payload: &GenusPayload,
) -> Result<i64> {
    let start = Instant::now();
    validate(payload)?;

    let mut tx = pool.begin().await?;
    let exists = sqlx::query("SELECT id FROM genera WHERE id = $1")
        .bind(genus_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(Error::GenusNotFound(genus_id));
    }

    check_name_available(&mut tx, &payload.name, Some(genus_id)).await?;

    let signature = resolve_signature(&mut tx, &payload.diagnosis).await?;
    if let Some(existing) =
        dedupe::find_duplicate_tx(&mut tx, &signature, Some(genus_id)).await?
    {
        return Err(Error::DuplicateDiagnosis {
            id: existing.id,
            name: existing.name,
        });
    }

    sqlx::query(
        "UPDATE genera SET name = $1, full_name = $2, type_species = $3, \
                length_min = $4, length_max = $5, width_min = $6, width_max = $7, \
                comparison = $8, natural_affiliation = $9, updated_at = $10 \
         WHERE id = $11",
    )
    .bind(payload.name.trim())
    .bind(payload.full_name.trim())
    .bind(present(payload.type_species.as_deref()))
    .bind(payload.length_min)
    .bind(payload.length_max)
    .bind(payload.width_min)
    .bind(payload.width_max)
    .bind(present(payload.comparison.as_deref()))
    .bind(present(payload.natural_affiliation.as_deref()))
    .bind(Utc::now())
    .bind(genus_id)
    .execute(&mut *tx)
    .await?;

    clear_children(&mut tx, genus_id).await?;
    insert_children(&mut tx, genus_id, payload, &signature).await?;
    tx.commit().await?;

    info!(
        subsystem = "db",
        component = "genera_tx",
        op = "update",
        genus_id,
        genus_name = %payload.name,
        duration_ms = start.elapsed().as_millis() as u64,
        "genus updated"
    );
    Ok(genus_id)
}

fn validate(payload: &GenusPayload) -> Result<()> {
    if present(Some(payload.name.as_str())).is_none() {
        return Err(Error::Validation("genus name is required".to_string()));
    }
    Ok(())
}

async fn check_name_available(
    tx: &mut Transaction<'_, Sqlite>,
    name: &str,
    exclude_genus: Option<i64>,
) -> Result<()> {
    let row = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, name FROM genera WHERE LOWER(name) = LOWER($1)",
    )
    .bind(name.trim())
    .fetch_optional(&mut **tx)
    .await?;

    if let Some((id, existing)) = row {
        if exclude_genus != Some(id) {
            return Err(Error::DuplicateName { id, name: existing });
        }
    }
    Ok(())
}

// =============================================================================
// SIGNATURE RESOLUTION
// =============================================================================

/// Map every display value of a diagnosis payload to vocabulary row ids,
/// upserting values unseen before. `""` and `"-"` count as absent.
async fn resolve_signature(
    tx: &mut Transaction<'_, Sqlite>,
    diagnosis: &DiagnosisPayload,
) -> Result<DiagnosisSignature> {
    let mut signature = DiagnosisSignature {
        infraturma_id: resolve_scalar(tx, tables::INFRATURMA, &diagnosis.infraturma).await?,
        form_id: resolve_scalar(tx, tables::FORM, &diagnosis.form).await?,
        angles_shape_id: resolve_scalar(tx, tables::ANGLES_SHAPE, &diagnosis.angles_shape).await?,
        area_presence_id: resolve_scalar(tx, tables::AREA_PRESENCE, &diagnosis.area_presence)
            .await?,
        outline_id: resolve_scalar(tx, tables::OUTLINE, &diagnosis.outline).await?,
        outline_uneven_cause: owned(&diagnosis.outline_uneven_cause),
        laesurae_rays_length_min: owned(&diagnosis.laesurae_rays_length_min),
        laesurae_rays_length_max: owned(&diagnosis.laesurae_rays_length_max),
        additional_features: owned(&diagnosis.additional_features),
        ..Default::default()
    };

    signature.amb_ids = resolve_values(tx, tables::AMB, &diagnosis.amb).await?;
    signature.sides_shape_ids =
        resolve_values(tx, tables::SIDES_SHAPE, &diagnosis.sides_shape).await?;
    signature.laesurae_ids = resolve_values(tx, tables::LAESURAE, &diagnosis.laesurae).await?;
    signature.laesurae_rays_ids =
        resolve_values(tx, tables::LAESURAE_RAYS, &diagnosis.laesurae_rays).await?;
    signature.exine_structure_ids =
        resolve_values(tx, tables::EXINE_STRUCTURE, &diagnosis.exine_structure).await?;
    if let Some(value) = present(diagnosis.exine_thickness.as_deref()) {
        signature
            .exine_thickness_ids
            .push(tables::THICKNESS.get_or_create_tx(tx, value).await?);
    }

    if let Some(growth) = &diagnosis.exine_growth_form {
        // A growth form without a type is treated as not filled in.
        if let Some(growth_type) = present(growth.growth_type.as_deref()) {
            signature.growth_form = Some(GrowthFormSignature {
                type_id: tables::EXINE_GROWTH_TYPE.get_or_create_tx(tx, growth_type).await?,
                thickness_id: resolve_scalar(tx, tables::THICKNESS, &growth.thickness).await?,
                width_id: resolve_scalar(tx, tables::WIDTH, &growth.width).await?,
                structure: owned(&growth.structure),
            });
        }
    }

    for (payload, slot) in [
        (&diagnosis.exoexine, &mut signature.exoexine),
        (&diagnosis.intexine, &mut signature.intexine),
    ] {
        let Some(layer) = payload else { continue };
        let thickness_id = resolve_scalar(tx, tables::THICKNESS, &layer.thickness).await?;
        let description = owned(&layer.description);
        if thickness_id.is_some() || description.is_some() {
            *slot = Some(LayerSignature {
                thickness_id,
                description,
            });
        }
    }

    signature.sculpture =
        resolve_sided(tx, tables::SCULPTURE, &diagnosis.sculpture).await?;
    signature.ornamentation =
        resolve_sided(tx, tables::ORNAMENTATION, &diagnosis.ornamentation).await?;

    Ok(signature)
}

async fn resolve_scalar(
    tx: &mut Transaction<'_, Sqlite>,
    vocab: VocabTable,
    value: &Option<String>,
) -> Result<Option<i64>> {
    match present(value.as_deref()) {
        Some(value) => Ok(Some(vocab.get_or_create_tx(tx, value).await?)),
        None => Ok(None),
    }
}

async fn resolve_values(
    tx: &mut Transaction<'_, Sqlite>,
    vocab: VocabTable,
    values: &[String],
) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(values.len());
    for value in values {
        if let Some(value) = present(Some(value.as_str())) {
            ids.push(vocab.get_or_create_tx(tx, value).await?);
        }
    }
    Ok(ids)
}

async fn resolve_sided(
    tx: &mut Transaction<'_, Sqlite>,
    vocab: VocabTable,
    pairs: &[SidedValue],
) -> Result<Vec<SidedIdPair>> {
    let mut resolved = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let Some(value) = present(Some(pair.value.as_str())) else {
            continue;
        };
        let value_id = vocab.get_or_create_tx(tx, value).await?;
        let side_id = match present(pair.side.as_deref()) {
            Some(side) => Some(tables::SPORE_SIDE.get_or_create_tx(tx, side).await?),
            None => None,
        };
        resolved.push(SidedIdPair { value_id, side_id });
    }
    Ok(resolved)
}

fn owned(value: &Option<String>) -> Option<String> {
    present(value.as_deref()).map(str::to_string)
}

// =============================================================================
// CHILD COLLECTIONS
// =============================================================================

async fn insert_children(
    tx: &mut Transaction<'_, Sqlite>,
    genus_id: i64,
    payload: &GenusPayload,
    signature: &DiagnosisSignature,
) -> Result<()> {
    for synonym in &payload.synonyms {
        let Some(name) = present(Some(synonym.name.as_str())) else {
            continue;
        };
        let synonym_id =
            vocab::get_or_create_synonym_tx(tx, name, present(synonym.source.as_deref())).await?;
        sqlx::query(
            "INSERT OR IGNORE INTO genera_synonyms (genus_id, synonym_id) VALUES ($1, $2)",
        )
        .bind(genus_id)
        .bind(synonym_id)
        .execute(&mut **tx)
        .await?;
    }

    insert_diagnosis(tx, genus_id, signature).await?;
    link_stratigraphy(tx, "genus_stratigraphy", "genus_id", genus_id, &payload.stratigraphy)
        .await?;
    link_geography(tx, "genus_geography", "genus_id", genus_id, &payload.geography).await?;

    for species in &payload.species {
        let Some(name) = present(Some(species.name.as_str())) else {
            continue;
        };
        let row = sqlx::query(
            "INSERT INTO species (genus_id, name, old_name, source, length_min, \
                                  length_max, width_min, width_max) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(genus_id)
        .bind(name)
        .bind(present(species.old_name.as_deref()))
        .bind(present(species.source.as_deref()))
        .bind(species.length_min)
        .bind(species.length_max)
        .bind(species.width_min)
        .bind(species.width_max)
        .fetch_one(&mut **tx)
        .await?;
        let species_id: i64 = row.get("id");

        link_stratigraphy(
            tx,
            "species_stratigraphy",
            "species_id",
            species_id,
            &species.stratigraphy,
        )
        .await?;
        link_geography(tx, "species_geography", "species_id", species_id, &species.geography)
            .await?;
    }

    Ok(())
}

async fn insert_diagnosis(
    tx: &mut Transaction<'_, Sqlite>,
    genus_id: i64,
    signature: &DiagnosisSignature,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO diagnosis (genus_id, infraturma_id, form_id, angles_shape_id, \
                                area_presence_id, outline_id, outline_uneven_cause, \
                                laesurae_rays_length_min, laesurae_rays_length_max, \
                                additional_features) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(genus_id)
    .bind(signature.infraturma_id)
    .bind(signature.form_id)
    .bind(signature.angles_shape_id)
    .bind(signature.area_presence_id)
    .bind(signature.outline_id)
    .bind(signature.outline_uneven_cause.as_deref())
    .bind(signature.laesurae_rays_length_min.as_deref())
    .bind(signature.laesurae_rays_length_max.as_deref())
    .bind(signature.additional_features.as_deref())
    .execute(&mut **tx)
    .await?;

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
        let sql = format!(
            "INSERT OR IGNORE INTO {link} (diagnosis_id, {link_fk}) VALUES ($1, $2)"
        );
        for id in ids {
            sqlx::query(&sql)
                .bind(genus_id)
                .bind(id)
                .execute(&mut **tx)
                .await?;
        }
    }

    if let Some(growth) = &signature.growth_form {
        sqlx::query(
            "INSERT INTO exine_growth_form (diagnosis_id, type_id, thickness_id, \
                                            width_id, structure) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(genus_id)
        .bind(growth.type_id)
        .bind(growth.thickness_id)
        .bind(growth.width_id)
        .bind(growth.structure.as_deref())
        .execute(&mut **tx)
        .await?;
    }

    for (table, layer) in [
        ("exoexine", &signature.exoexine),
        ("intexine", &signature.intexine),
    ] {
        let Some(layer) = layer else { continue };
        let sql = format!(
            "INSERT INTO {table} (diagnosis_id, thickness_id, description) VALUES ($1, $2, $3)"
        );
        sqlx::query(&sql)
            .bind(genus_id)
            .bind(layer.thickness_id)
            .bind(layer.description.as_deref())
            .execute(&mut **tx)
            .await?;
    }

    for (link, link_fk, pairs) in [
        ("spore_diagnosis_sculpture", "sculpture_id", &signature.sculpture),
        (
            "spore_diagnosis_ornamentation",
            "ornamentation_id",
            &signature.ornamentation,
        ),
    ] {
        let sql = format!(
            "INSERT INTO {link} (diagnosis_id, {link_fk}, side_id) VALUES ($1, $2, $3)"
        );
        for pair in pairs {
            sqlx::query(&sql)
                .bind(genus_id)
                .bind(pair.value_id)
                .bind(pair.side_id)
                .execute(&mut **tx)
                .await?;
        }
    }

    Ok(())
}

/// Wholesale child removal for the update path. Deleting the diagnosis row
/// cascades to every diagnosis-scoped join and sub-record; deleting species
/// cascades their distribution links.
async fn clear_children(tx: &mut Transaction<'_, Sqlite>, genus_id: i64) -> Result<()> {
    for sql in [
        "DELETE FROM diagnosis WHERE genus_id = $1",
        "DELETE FROM genera_synonyms WHERE genus_id = $1",
        "DELETE FROM genus_stratigraphy WHERE genus_id = $1",
        "DELETE FROM genus_geography WHERE genus_id = $1",
        "DELETE FROM species WHERE genus_id = $1",
    ] {
        sqlx::query(sql).bind(genus_id).execute(&mut **tx).await?;
    }
    Ok(())
}

// =============================================================================
// DISTRIBUTION LINKS
// =============================================================================

async fn link_stratigraphy(
    tx: &mut Transaction<'_, Sqlite>,
    link_table: &str,
    owner_column: &str,
    owner_id: i64,
    terms: &[String],
) -> Result<()> {
    for term in terms {
        let Some(expr) = StratExpr::decode(term) else {
            continue;
        };
        if expr.is_unconstrained() {
            continue;
        }
        match vocab::lookup_stratigraphic_period_tx(tx, &expr).await? {
            Some(period_id) => {
                let sql = format!(
                    "INSERT OR IGNORE INTO {link_table} ({owner_column}, period_id) \
                     VALUES ($1, $2)"
                );
                sqlx::query(&sql)
                    .bind(owner_id)
                    .bind(period_id)
                    .execute(&mut **tx)
                    .await?;
            }
            None => debug!(
                subsystem = "db",
                component = "genera_tx",
                term = %term,
                "skipping unmatched stratigraphy string"
            ),
        }
    }
    Ok(())
}

async fn link_geography(
    tx: &mut Transaction<'_, Sqlite>,
    link_table: &str,
    owner_column: &str,
    owner_id: i64,
    terms: &[String],
) -> Result<()> {
    for term in terms {
        let Some(geo) = GeoRef::decode(term) else {
            continue;
        };
        match vocab::lookup_geographic_location_tx(tx, &geo.name).await? {
            Some(location_id) => {
                let sql = format!(
                    "INSERT OR IGNORE INTO {link_table} ({owner_column}, geographic_location_id) \
                     VALUES ($1, $2)"
                );
                sqlx::query(&sql)
                    .bind(owner_id)
                    .bind(location_id)
                    .execute(&mut **tx)
                    .await?;
            }
            None => debug!(
                subsystem = "db",
                component = "genera_tx",
                term = %term,
                "skipping unmatched geography string"
            ),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_blank_and_placeholder_names() {
        for name in ["", "   ", "-"] {
            let payload = GenusPayload {
                name: name.to_string(),
                ..Default::default()
            };
            assert!(matches!(validate(&payload), Err(Error::Validation(_))));
        }
    }

    #[test]
    fn validate_accepts_real_name() {
        let payload = GenusPayload {
            name: "Leiotriletes".to_string(),
            ..Default::default()
        };
        assert!(validate(&payload).is_ok());
    }
}
