//! Reference vocabulary service.
//!
//! Every controlled vocabulary is a lookup table deduplicated by its value
//! column. Writes go through the idempotent get-or-create helpers here, so
//! a submitted display value always resolves to exactly one row; vocabulary
//! rows are never implicitly deleted when the referencing genus goes away.
//!
//! Also home to the option lists backing search filters and data-entry
//! forms, including the in-use-only joined variants (thickness per
//! structural context, sides actually assigned) and the used-vs-all
//! variants for stratigraphy and geography.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use miospora_core::codec::{encode_geography, encode_stratigraphy, StratComponent, StratExpr};
use miospora_core::defaults;
use miospora_core::error::Result;
use miospora_core::traits::VocabularyRepository;

// =============================================================================
// VOCABULARY TABLE REGISTRY
// =============================================================================

/// One vocabulary table and its value column. The registry below is the
/// closed set of identifiers interpolated into SQL; values are always
/// bound as parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VocabTable {
    pub table: &'static str,
    pub column: &'static str,
}

pub(crate) mod tables {
    use super::VocabTable;

    pub const FORM: VocabTable = VocabTable { table: "form", column: "name" };
    pub const ANGLES_SHAPE: VocabTable = VocabTable { table: "angles_shape", column: "name" };
    pub const AREA_PRESENCE: VocabTable = VocabTable { table: "area_presence", column: "name" };
    pub const OUTLINE: VocabTable = VocabTable { table: "outline", column: "name" };
    pub const CHARACTER_OF_LAESURAE: VocabTable =
        VocabTable { table: "character_of_laesurae", column: "name" };
    pub const EXINE_STRATIFICATION: VocabTable =
        VocabTable { table: "exine_stratification", column: "name" };
    pub const EXINE_TYPE: VocabTable = VocabTable { table: "exine_type", column: "name" };
    pub const INFRATURMA: VocabTable = VocabTable { table: "infraturma", column: "name" };
    pub const AMB: VocabTable = VocabTable { table: "spore_amb", column: "amb" };
    pub const SIDES_SHAPE: VocabTable =
        VocabTable { table: "spore_sides_shape", column: "side_shape" };
    pub const LAESURAE: VocabTable =
        VocabTable { table: "spore_laesurae", column: "laesurae_shape" };
    pub const LAESURAE_RAYS: VocabTable =
        VocabTable { table: "spore_laesurae_rays", column: "rays_shape" };
    pub const EXINE_STRUCTURE: VocabTable =
        VocabTable { table: "spore_exine_structure", column: "exine_structure" };
    pub const THICKNESS: VocabTable = VocabTable { table: "thickness", column: "value" };
    pub const WIDTH: VocabTable = VocabTable { table: "width", column: "value" };
    pub const EXINE_GROWTH_TYPE: VocabTable =
        VocabTable { table: "exine_growth_type", column: "name" };
    pub const SPORE_SIDE: VocabTable = VocabTable { table: "spore_side", column: "name" };
    pub const SCULPTURE: VocabTable = VocabTable { table: "spore_sculpture", column: "sculpture" };
    pub const ORNAMENTATION: VocabTable =
        VocabTable { table: "spore_ornamentation", column: "ornamentation" };
}

impl VocabTable {
    /// Find the row id for a value, if any.
    pub(crate) async fn lookup_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        value: &str,
    ) -> Result<Option<i64>> {
        let sql = format!("SELECT id FROM {} WHERE {} = $1", self.table, self.column);
        let row = sqlx::query(&sql).bind(value).fetch_optional(&mut **tx).await?;
        Ok(row.map(|r| r.get::<i64, _>("id")))
    }

    /// Resolve a value to its row id, inserting it first if unknown.
    pub(crate) async fn get_or_create_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        value: &str,
    ) -> Result<i64> {
        if let Some(id) = self.lookup_tx(tx, value).await? {
            return Ok(id);
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ($1) RETURNING id",
            self.table, self.column
        );
        let row = sqlx::query(&sql).bind(value).fetch_one(&mut **tx).await?;
        debug!(
            subsystem = "db",
            component = "vocab",
            table = self.table,
            value,
            "created vocabulary entry"
        );
        Ok(row.get("id"))
    }
}

/// Get-or-create a synonym by name; `source` is stored only on first
/// creation and never overwrites an existing entry.
pub(crate) async fn get_or_create_synonym_tx(
    tx: &mut Transaction<'_, Sqlite>,
    name: &str,
    source: Option<&str>,
) -> Result<i64> {
    let existing = sqlx::query("SELECT id FROM synonyms WHERE name = $1")
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?;
    if let Some(row) = existing {
        return Ok(row.get("id"));
    }
    let row = sqlx::query("INSERT INTO synonyms (name, source) VALUES ($1, $2) RETURNING id")
        .bind(name)
        .bind(source)
        .fetch_one(&mut **tx)
        .await?;
    Ok(row.get("id"))
}

/// Look up a stored stratigraphic triple matching a decoded expression.
///
/// This is the write-time link resolution: a matching component compares
/// case-insensitively, an explicit-null component must be NULL on the
/// stored row, and an omitted component constrains nothing, so a bare
/// period links whichever stored row for that period comes first by id.
/// Returns `None` when no stored triple matches; callers skip the link
/// in that case.
pub(crate) async fn lookup_stratigraphic_period_tx(
    tx: &mut Transaction<'_, Sqlite>,
    expr: &StratExpr,
) -> Result<Option<i64>> {
    let mut conds = Vec::with_capacity(3);
    let mut params: Vec<&str> = Vec::new();
    for (column, component) in [
        ("period", &expr.period),
        ("epoch", &expr.epoch),
        ("stage", &expr.stage),
    ] {
        match component {
            StratComponent::Matches(v) => {
                params.push(v);
                conds.push(format!("LOWER({column}) = LOWER(${})", params.len()));
            }
            StratComponent::IsNull => conds.push(format!("{column} IS NULL")),
            StratComponent::Any => {}
        }
    }
    if conds.is_empty() {
        return Ok(None);
    }
    let sql = format!(
        "SELECT id FROM stratigraphic_periods WHERE {} ORDER BY id LIMIT 1",
        conds.join(" AND ")
    );
    let mut query = sqlx::query(&sql);
    for param in params {
        query = query.bind(param);
    }
    let row = query.fetch_optional(&mut **tx).await?;
    Ok(row.map(|r| r.get::<i64, _>("id")))
}

/// Look up a geographic node by leaf name (the parent label in the packed
/// string is informational only).
pub(crate) async fn lookup_geographic_location_tx(
    tx: &mut Transaction<'_, Sqlite>,
    name: &str,
) -> Result<Option<i64>> {
    let row = sqlx::query(
        "SELECT id FROM geographic_location WHERE LOWER(name) = LOWER($1) LIMIT 1",
    )
    .bind(name)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(|r| r.get::<i64, _>("id")))
}

// =============================================================================
// OPTION LISTS AND SEEDING
// =============================================================================

/// SQLite-backed vocabulary repository.
#[derive(Clone)]
pub struct SqliteVocabularyRepository {
    pool: SqlitePool,
}

impl SqliteVocabularyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn value_list(&self, vocab: VocabTable) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT {col} FROM {table} ORDER BY {col}",
            col = vocab.column,
            table = vocab.table
        );
        self.string_list(&sql).await
    }

    async fn string_list(&self, sql: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(|r| r.get::<String, _>(0)).collect())
    }

    /// Thickness values actually referenced through one structural context.
    async fn thickness_in_context(&self, join: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT t.value FROM thickness t {join} ORDER BY t.value"
        );
        self.string_list(&sql).await
    }

    /// Side names actually assigned on a side-qualified axis.
    async fn sides_in_use(&self, link: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT s.name FROM spore_side s \
             JOIN {link} l ON l.side_id = s.id ORDER BY s.name"
        );
        self.string_list(&sql).await
    }

    async fn stratigraphy_options(&self, used_only: bool) -> Result<Vec<String>> {
        let sql = if used_only {
            "SELECT DISTINCT sp.period, sp.epoch, sp.stage FROM stratigraphic_periods sp \
             JOIN genus_stratigraphy gs ON gs.period_id = sp.id \
             ORDER BY sp.period, sp.epoch, sp.stage"
        } else {
            "SELECT period, epoch, stage FROM stratigraphic_periods \
             ORDER BY period, epoch, stage"
        };
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
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

    async fn geography_options(&self, used_only: bool) -> Result<Vec<String>> {
        let sql = if used_only {
            "SELECT DISTINCT gl.name, p.name FROM geographic_location gl \
             LEFT JOIN geographic_location p ON p.id = gl.parent_id \
             JOIN genus_geography gg ON gg.geographic_location_id = gl.id \
             ORDER BY p.name, gl.name"
        } else {
            "SELECT gl.name, p.name FROM geographic_location gl \
             LEFT JOIN geographic_location p ON p.id = gl.parent_id \
             ORDER BY p.name, gl.name"
        };
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
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
}

#[async_trait]
impl VocabularyRepository for SqliteVocabularyRepository {
    async fn option_lists(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut options = BTreeMap::new();

        for (key, vocab) in [
            ("form", tables::FORM),
            ("angles_shape", tables::ANGLES_SHAPE),
            ("area_presence", tables::AREA_PRESENCE),
            ("outline", tables::OUTLINE),
            ("infraturma", tables::INFRATURMA),
            ("character_of_laesurae", tables::CHARACTER_OF_LAESURAE),
            ("exine_stratification", tables::EXINE_STRATIFICATION),
            ("exine_type", tables::EXINE_TYPE),
            ("amb", tables::AMB),
            ("sides_shape", tables::SIDES_SHAPE),
            ("laesurae_shape", tables::LAESURAE),
            ("laesurae_rays", tables::LAESURAE_RAYS),
            ("exine_structure", tables::EXINE_STRUCTURE),
            ("thickness", tables::THICKNESS),
            ("width", tables::WIDTH),
            ("exine_growth_type", tables::EXINE_GROWTH_TYPE),
            ("side", tables::SPORE_SIDE),
            ("sculpture", tables::SCULPTURE),
            ("ornamentation", tables::ORNAMENTATION),
        ] {
            options.insert(key.to_string(), self.value_list(vocab).await?);
        }

        options.insert(
            "exine_thickness".to_string(),
            self.thickness_in_context(
                "JOIN spore_diagnosis_exine_thickness l ON l.thickness_id = t.id",
            )
            .await?,
        );
        options.insert(
            "exine_growth_thickness".to_string(),
            self.thickness_in_context(
                "JOIN exine_growth_form egf ON egf.thickness_id = t.id",
            )
            .await?,
        );
        options.insert(
            "exoexine_thickness".to_string(),
            self.thickness_in_context("JOIN exoexine ex ON ex.thickness_id = t.id")
                .await?,
        );
        options.insert(
            "intexine_thickness".to_string(),
            self.thickness_in_context("JOIN intexine ix ON ix.thickness_id = t.id")
                .await?,
        );
        options.insert(
            "exine_growth_width".to_string(),
            self.string_list(
                "SELECT DISTINCT w.value FROM width w \
                 JOIN exine_growth_form egf ON egf.width_id = w.id ORDER BY w.value",
            )
            .await?,
        );
        options.insert(
            "exine_growth_structure".to_string(),
            self.string_list(
                "SELECT DISTINCT structure FROM exine_growth_form \
                 WHERE structure IS NOT NULL ORDER BY structure",
            )
            .await?,
        );
        options.insert(
            "sculpture_sides".to_string(),
            self.sides_in_use("spore_diagnosis_sculpture").await?,
        );
        options.insert(
            "ornamentation_sides".to_string(),
            self.sides_in_use("spore_diagnosis_ornamentation").await?,
        );
        options.insert(
            "synonyms".to_string(),
            self.string_list("SELECT name FROM synonyms ORDER BY name").await?,
        );

        options.insert(
            "stratigraphy".to_string(),
            self.stratigraphy_options(true).await?,
        );
        options.insert(
            "stratigraphy_all".to_string(),
            self.stratigraphy_options(false).await?,
        );
        options.insert("geography".to_string(), self.geography_options(true).await?);
        options.insert(
            "geography_all".to_string(),
            self.geography_options(false).await?,
        );

        debug!(
            subsystem = "db",
            component = "vocab",
            op = "option_lists",
            axes = options.len(),
            "collected option lists"
        );
        Ok(options)
    }

    async fn seed_defaults(&self) -> Result<()> {
        let seeds: &[(VocabTable, &[&str])] = &[
            (tables::AMB, defaults::AMB),
            (tables::FORM, defaults::FORM),
            (tables::SIDES_SHAPE, defaults::SIDES_SHAPE),
            (tables::ANGLES_SHAPE, defaults::ANGLES_SHAPE),
            (tables::OUTLINE, defaults::OUTLINE),
            (tables::AREA_PRESENCE, defaults::AREA_PRESENCE),
            (tables::LAESURAE, defaults::LAESURAE_SHAPE),
            (tables::LAESURAE_RAYS, defaults::LAESURAE_RAYS),
            (tables::EXINE_STRUCTURE, defaults::EXINE_STRUCTURE),
            (tables::EXINE_GROWTH_TYPE, defaults::EXINE_GROWTH_TYPE),
            (tables::SPORE_SIDE, defaults::SPORE_SIDE),
            (tables::SCULPTURE, defaults::SCULPTURE),
            (tables::ORNAMENTATION, defaults::ORNAMENTATION),
        ];

        let mut seeded = 0usize;
        for (vocab, values) in seeds {
            let sql = format!(
                "INSERT OR IGNORE INTO {} ({}) VALUES ($1)",
                vocab.table, vocab.column
            );
            for value in *values {
                let result = sqlx::query(&sql).bind(value).execute(&self.pool).await?;
                seeded += result.rows_affected() as usize;
            }
        }

        info!(
            subsystem = "db",
            component = "vocab",
            op = "seed_defaults",
            seeded,
            "seeded default vocabularies"
        );
        Ok(())
    }
}
