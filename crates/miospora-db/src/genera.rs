//! Genus repository: filtered search, summary loading, full hydration.
//!
//! Reads are stateless pool queries. The search path compiles the filter
//! map (see `filter_query`), selects distinct genus rows, then attaches
//! synonyms, infraturma and stratigraphy in batched follow-up queries so a
//! result page costs a fixed number of round trips.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use miospora_core::codec::{encode_geography, encode_stratigraphy};
use miospora_core::error::Result;
use miospora_core::filter::FilterMap;
use miospora_core::models::{
    DiagnosisDetail, ExineGrowthDetail, ExineLayerDetail, GenusDetail, GenusHeader, GenusPayload,
    GenusRecord, GenusSummary, SidedValue, SpeciesDetail, Synonym,
};
use miospora_core::traits::GenusRepository;

use crate::filter_query::{bind_params, GenusFilterQueryBuilder};
use crate::genera_tx;

/// SQLite-backed genus repository.
#[derive(Clone)]
pub struct SqliteGenusRepository {
    pool: SqlitePool,
}

impl SqliteGenusRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn string_list(&self, sql: &str, key: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(sql).bind(key).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(|r| r.get::<String, _>(0)).collect())
    }

    async fn sided_list(&self, sql: &str, key: i64) -> Result<Vec<SidedValue>> {
        let rows = sqlx::query(sql).bind(key).fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|r| SidedValue {
                value: r.get::<String, _>(0),
                side: r.get::<Option<String>, _>(1),
            })
            .collect())
    }

    async fn stratigraphy_strings(&self, sql: &str, key: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(sql).bind(key).fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|r| {
                encode_stratigraphy(
                    r.get::<Option<String>, _>(0).as_deref(),
                    r.get::<Option<String>, _>(1).as_deref(),
                    r.get::<Option<String>, _>(2).as_deref(),
                )
            })
            .filter(|s| !s.is_empty())
            .collect())
    }

    async fn geography_strings(&self, sql: &str, key: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(sql).bind(key).fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|r| {
                encode_geography(
                    r.get::<Option<String>, _>(1).as_deref(),
                    &r.get::<String, _>(0),
                )
            })
            .collect())
    }

    /// Summary row for a single genus looked up by name.
    pub async fn get_summary(&self, name: &str) -> Result<Option<GenusSummary>> {
        let row = sqlx::query("SELECT id, name FROM genera WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let id: i64 = row.get(0);

        let synonyms = self
            .string_list(
                "SELECT s.name FROM genera_synonyms gs \
                 JOIN synonyms s ON s.id = gs.synonym_id \
                 WHERE gs.genus_id = $1 ORDER BY s.name",
                id,
            )
            .await?;
        let infraturma = sqlx::query(
            "SELECT i.name FROM diagnosis d \
             JOIN infraturma i ON i.id = d.infraturma_id \
             WHERE d.genus_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(|r| r.get::<String, _>(0));
        let stratigraphy = self
            .stratigraphy_strings(
                "SELECT sp.period, sp.epoch, sp.stage FROM genus_stratigraphy gst \
                 JOIN stratigraphic_periods sp ON sp.id = gst.period_id \
                 WHERE gst.genus_id = $1 ORDER BY sp.period, sp.epoch, sp.stage",
                id,
            )
            .await?;

        Ok(Some(GenusSummary {
            id,
            name: row.get(1),
            synonyms,
            infraturma,
            stratigraphy,
        }))
    }

    async fn load_diagnosis(&self, genus_id: i64) -> Result<Option<DiagnosisDetail>> {
        let row = sqlx::query(
            "SELECT i.name, f.name, a.name, ap.name, o.name, \
                    d.outline_uneven_cause, d.laesurae_rays_length_min, \
                    d.laesurae_rays_length_max, d.additional_features \
             FROM diagnosis d \
             LEFT JOIN infraturma i ON i.id = d.infraturma_id \
             LEFT JOIN form f ON f.id = d.form_id \
             LEFT JOIN angles_shape a ON a.id = d.angles_shape_id \
             LEFT JOIN area_presence ap ON ap.id = d.area_presence_id \
             LEFT JOIN outline o ON o.id = d.outline_id \
             WHERE d.genus_id = $1",
        )
        .bind(genus_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut detail = DiagnosisDetail {
            infraturma: row.get(0),
            form: row.get(1),
            angles_shape: row.get(2),
            area_presence: row.get(3),
            outline: row.get(4),
            outline_uneven_cause: row.get(5),
            laesurae_rays_length_min: row.get(6),
            laesurae_rays_length_max: row.get(7),
            additional_features: row.get(8),
            ..Default::default()
        };

        detail.amb = self
            .string_list(
                "SELECT v.amb FROM spore_diagnosis_amb l \
                 JOIN spore_amb v ON v.id = l.amb_id \
                 WHERE l.diagnosis_id = $1 ORDER BY v.amb",
                genus_id,
            )
            .await?;
        detail.sides_shape = self
            .string_list(
                "SELECT v.side_shape FROM spore_diagnosis_sides_shape l \
                 JOIN spore_sides_shape v ON v.id = l.side_shape_id \
                 WHERE l.diagnosis_id = $1 ORDER BY v.side_shape",
                genus_id,
            )
            .await?;
        detail.laesurae = self
            .string_list(
                "SELECT v.laesurae_shape FROM spore_diagnosis_laesurae l \
                 JOIN spore_laesurae v ON v.id = l.laesurae_shape_id \
                 WHERE l.diagnosis_id = $1 ORDER BY v.laesurae_shape",
                genus_id,
            )
            .await?;
        detail.laesurae_rays = self
            .string_list(
                "SELECT v.rays_shape FROM spore_diagnosis_laesurae_rays l \
                 JOIN spore_laesurae_rays v ON v.id = l.rays_shape_id \
                 WHERE l.diagnosis_id = $1 ORDER BY v.rays_shape",
                genus_id,
            )
            .await?;
        detail.exine_structure = self
            .string_list(
                "SELECT v.exine_structure FROM spore_diagnosis_exine_structure l \
                 JOIN spore_exine_structure v ON v.id = l.exine_structure_id \
                 WHERE l.diagnosis_id = $1 ORDER BY v.exine_structure",
                genus_id,
            )
            .await?;
        detail.exine_thickness = self
            .string_list(
                "SELECT t.value FROM spore_diagnosis_exine_thickness l \
                 JOIN thickness t ON t.id = l.thickness_id \
                 WHERE l.diagnosis_id = $1 ORDER BY t.value",
                genus_id,
            )
            .await?;

        detail.exine_growth_form = sqlx::query(
            "SELECT gt.name, th.value, w.value, egf.structure \
             FROM exine_growth_form egf \
             LEFT JOIN exine_growth_type gt ON gt.id = egf.type_id \
             LEFT JOIN thickness th ON th.id = egf.thickness_id \
             LEFT JOIN width w ON w.id = egf.width_id \
             WHERE egf.diagnosis_id = $1",
        )
        .bind(genus_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|r| ExineGrowthDetail {
            growth_type: r.get(0),
            thickness: r.get(1),
            width: r.get(2),
            structure: r.get(3),
        });

        for (table, alias, slot) in [
            ("exoexine", "x", &mut detail.exoexine),
            ("intexine", "x", &mut detail.intexine),
        ] {
            let sql = format!(
                "SELECT th.value, {alias}.description FROM {table} {alias} \
                 LEFT JOIN thickness th ON th.id = {alias}.thickness_id \
                 WHERE {alias}.diagnosis_id = $1"
            );
            *slot = sqlx::query(&sql)
                .bind(genus_id)
                .fetch_optional(&self.pool)
                .await?
                .map(|r| ExineLayerDetail {
                    thickness: r.get(0),
                    description: r.get(1),
                });
        }

        detail.sculpture = self
            .sided_list(
                "SELECT v.sculpture, s.name FROM spore_diagnosis_sculpture l \
                 JOIN spore_sculpture v ON v.id = l.sculpture_id \
                 LEFT JOIN spore_side s ON s.id = l.side_id \
                 WHERE l.diagnosis_id = $1 ORDER BY v.sculpture",
                genus_id,
            )
            .await?;
        detail.ornamentation = self
            .sided_list(
                "SELECT v.ornamentation, s.name FROM spore_diagnosis_ornamentation l \
                 JOIN spore_ornamentation v ON v.id = l.ornamentation_id \
                 LEFT JOIN spore_side s ON s.id = l.side_id \
                 WHERE l.diagnosis_id = $1 ORDER BY v.ornamentation",
                genus_id,
            )
            .await?;

        Ok(Some(detail))
    }

    async fn load_species(&self, genus_id: i64) -> Result<Vec<SpeciesDetail>> {
        let rows = sqlx::query(
            "SELECT id, name, old_name, source, length_min, length_max, \
                    width_min, width_max \
             FROM species WHERE genus_id = $1 ORDER BY name",
        )
        .bind(genus_id)
        .fetch_all(&self.pool)
        .await?;

        let mut species = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.get(0);
            species.push(SpeciesDetail {
                id,
                name: row.get(1),
                old_name: row.get(2),
                source: row.get(3),
                length_min: row.get(4),
                length_max: row.get(5),
                width_min: row.get(6),
                width_max: row.get(7),
                stratigraphy: self
                    .stratigraphy_strings(
                        "SELECT sp.period, sp.epoch, sp.stage FROM species_stratigraphy ss \
                         JOIN stratigraphic_periods sp ON sp.id = ss.period_id \
                         WHERE ss.species_id = $1 \
                         ORDER BY sp.period, sp.epoch, sp.stage",
                        id,
                    )
                    .await?,
                geography: self
                    .geography_strings(
                        "SELECT gl.name, p.name FROM species_geography sg \
                         JOIN geographic_location gl ON gl.id = sg.geographic_location_id \
                         LEFT JOIN geographic_location p ON p.id = gl.parent_id \
                         WHERE sg.species_id = $1 ORDER BY gl.name",
                        id,
                    )
                    .await?,
            });
        }
        Ok(species)
    }
}

fn genus_record_from_row(row: &sqlx::sqlite::SqliteRow) -> GenusRecord {
    GenusRecord {
        id: row.get("id"),
        name: row.get("name"),
        full_name: row.get("full_name"),
        type_species: row.get("type_species"),
        length_min: row.get("length_min"),
        length_max: row.get("length_max"),
        width_min: row.get("width_min"),
        width_max: row.get("width_max"),
        comparison: row.get("comparison"),
        natural_affiliation: row.get("natural_affiliation"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    }
}

fn in_placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl GenusRepository for SqliteGenusRepository {
    async fn find(&self, filters: &FilterMap) -> Result<Vec<GenusSummary>> {
        let start = Instant::now();
        let built = GenusFilterQueryBuilder::new(filters, 0).build();

        let sql = format!(
            "SELECT DISTINCT g.id, g.name FROM genera g \
             LEFT JOIN diagnosis d ON d.genus_id = g.id \
             WHERE {} ORDER BY g.name COLLATE NOCASE",
            built.where_clause
        );
        let rows = bind_params(sqlx::query(&sql), &built.params)
            .fetch_all(&self.pool)
            .await?;

        let mut summaries: Vec<GenusSummary> = rows
            .iter()
            .map(|r| GenusSummary {
                id: r.get(0),
                name: r.get(1),
                synonyms: Vec::new(),
                infraturma: None,
                stratigraphy: Vec::new(),
            })
            .collect();

        if !summaries.is_empty() {
            let ids: Vec<i64> = summaries.iter().map(|s| s.id).collect();
            let index: HashMap<i64, usize> =
                ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
            let list = in_placeholders(ids.len());

            let sql = format!(
                "SELECT gs.genus_id, s.name FROM genera_synonyms gs \
                 JOIN synonyms s ON s.id = gs.synonym_id \
                 WHERE gs.genus_id IN ({list}) ORDER BY s.name"
            );
            let mut query = sqlx::query(&sql);
            for id in &ids {
                query = query.bind(id);
            }
            for row in query.fetch_all(&self.pool).await? {
                if let Some(&i) = index.get(&row.get::<i64, _>(0)) {
                    summaries[i].synonyms.push(row.get(1));
                }
            }

            let sql = format!(
                "SELECT d.genus_id, i.name FROM diagnosis d \
                 JOIN infraturma i ON i.id = d.infraturma_id \
                 WHERE d.genus_id IN ({list})"
            );
            let mut query = sqlx::query(&sql);
            for id in &ids {
                query = query.bind(id);
            }
            for row in query.fetch_all(&self.pool).await? {
                if let Some(&i) = index.get(&row.get::<i64, _>(0)) {
                    summaries[i].infraturma = Some(row.get(1));
                }
            }

            let sql = format!(
                "SELECT gst.genus_id, sp.period, sp.epoch, sp.stage \
                 FROM genus_stratigraphy gst \
                 JOIN stratigraphic_periods sp ON sp.id = gst.period_id \
                 WHERE gst.genus_id IN ({list}) \
                 ORDER BY sp.period, sp.epoch, sp.stage"
            );
            let mut query = sqlx::query(&sql);
            for id in &ids {
                query = query.bind(id);
            }
            for row in query.fetch_all(&self.pool).await? {
                if let Some(&i) = index.get(&row.get::<i64, _>(0)) {
                    let encoded = encode_stratigraphy(
                        row.get::<Option<String>, _>(1).as_deref(),
                        row.get::<Option<String>, _>(2).as_deref(),
                        row.get::<Option<String>, _>(3).as_deref(),
                    );
                    if !encoded.is_empty() {
                        summaries[i].stratigraphy.push(encoded);
                    }
                }
            }
        }

        info!(
            subsystem = "db",
            component = "genera",
            op = "find",
            active_axes = built.active_axes,
            result_count = summaries.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "genus search completed"
        );
        Ok(summaries)
    }

    async fn get_detail(&self, name: &str) -> Result<Option<GenusDetail>> {
        let row = sqlx::query("SELECT * FROM genera WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let genus = genus_record_from_row(&row);
        let genus_id = genus.id;

        let synonyms = sqlx::query(
            "SELECT s.id, s.name, s.source FROM genera_synonyms gs \
             JOIN synonyms s ON s.id = gs.synonym_id \
             WHERE gs.genus_id = $1 ORDER BY s.name",
        )
        .bind(genus_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| Synonym {
            id: r.get(0),
            name: r.get(1),
            source: r.get(2),
        })
        .collect();

        let diagnosis = self.load_diagnosis(genus_id).await?;
        let species = self.load_species(genus_id).await?;
        let stratigraphy = self
            .stratigraphy_strings(
                "SELECT sp.period, sp.epoch, sp.stage FROM genus_stratigraphy gst \
                 JOIN stratigraphic_periods sp ON sp.id = gst.period_id \
                 WHERE gst.genus_id = $1 ORDER BY sp.period, sp.epoch, sp.stage",
                genus_id,
            )
            .await?;
        let geography = self
            .geography_strings(
                "SELECT gl.name, p.name FROM genus_geography gg \
                 JOIN geographic_location gl ON gl.id = gg.geographic_location_id \
                 LEFT JOIN geographic_location p ON p.id = gl.parent_id \
                 WHERE gg.genus_id = $1 ORDER BY gl.name",
                genus_id,
            )
            .await?;

        debug!(
            subsystem = "db",
            component = "genera",
            op = "get_detail",
            genus_id,
            "hydrated genus"
        );
        Ok(Some(GenusDetail {
            genus,
            synonyms,
            diagnosis,
            species,
            stratigraphy,
            geography,
        }))
    }

    async fn get_header(&self, name: &str) -> Result<Option<GenusHeader>> {
        let row = sqlx::query(
            "SELECT name, full_name, type_species FROM genera WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| GenusHeader {
            name: r.get(0),
            full_name: r.get(1),
            type_species: r.get(2),
        }))
    }

    async fn create_full(&self, payload: &GenusPayload) -> Result<i64> {
        genera_tx::create_genus(&self.pool, payload).await
    }

    async fn update_full(&self, genus_id: i64, payload: &GenusPayload) -> Result<i64> {
        genera_tx::update_genus(&self.pool, genus_id, payload).await
    }

    async fn delete_by_name(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM genera WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        info!(
            subsystem = "db",
            component = "genera",
            op = "delete_by_name",
            genus_name = %name,
            deleted,
            "genus deletion"
        );
        Ok(deleted)
    }

    async fn delete_by_id(&self, genus_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM genera WHERE id = $1")
            .bind(genus_id)
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        info!(
            subsystem = "db",
            component = "genera",
            op = "delete_by_id",
            genus_id,
            deleted,
            "genus deletion"
        );
        Ok(deleted)
    }
}
