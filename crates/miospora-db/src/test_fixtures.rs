//! Shared fixtures for integration tests.
//!
//! Always compiled so the `tests/` directory can depend on it without
//! feature gymnastics. Helpers panic on setup failure; a broken fixture is
//! a broken test run.

use sqlx::Row;

use miospora_core::models::{DiagnosisPayload, GenusPayload, SpeciesPayload, SynonymPayload};

use crate::Database;

/// Fresh in-memory database with migrations applied.
pub async fn test_database() -> Database {
    let db = Database::connect_in_memory()
        .await
        .expect("failed to open in-memory database");
    db.migrate().await.expect("failed to run migrations");
    db
}

/// Minimal valid genus payload.
pub fn simple_genus(name: &str) -> GenusPayload {
    GenusPayload {
        name: name.to_string(),
        full_name: format!("{name} Naumova, 1953"),
        ..Default::default()
    }
}

/// Genus payload with a distinctive diagnosis, varied per name so two
/// fixtures never collide on the diagnosis signature.
pub fn diagnosed_genus(name: &str, form: &str, amb: &[&str]) -> GenusPayload {
    GenusPayload {
        diagnosis: DiagnosisPayload {
            form: Some(form.to_string()),
            amb: amb.iter().map(|a| a.to_string()).collect(),
            additional_features: Some(format!("diagnosis of {name}")),
            ..Default::default()
        },
        ..simple_genus(name)
    }
}

/// Genus payload with synonyms and a species attached.
pub fn full_genus(name: &str) -> GenusPayload {
    GenusPayload {
        type_species: Some(format!("{name} typicus")),
        length_min: Some(20.0),
        length_max: Some(45.0),
        width_min: Some(18.0),
        width_max: Some(40.0),
        synonyms: vec![SynonymPayload {
            name: format!("{name}ites"),
            source: Some("Potonié & Kremp, 1954".to_string()),
        }],
        species: vec![SpeciesPayload {
            name: format!("{name} minor"),
            length_min: Some(22.0),
            length_max: Some(30.0),
            ..Default::default()
        }],
        ..diagnosed_genus(name, "rounded", &["circular"])
    }
}

/// Insert a stratigraphic triple, returning its id.
pub async fn insert_period(
    db: &Database,
    period: Option<&str>,
    epoch: Option<&str>,
    stage: Option<&str>,
) -> i64 {
    sqlx::query(
        "INSERT INTO stratigraphic_periods (period, epoch, stage) \
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(period)
    .bind(epoch)
    .bind(stage)
    .fetch_one(db.pool())
    .await
    .expect("failed to insert stratigraphic period")
    .get("id")
}

/// Insert a geographic node, returning its id.
pub async fn insert_location(db: &Database, name: &str, parent_id: Option<i64>) -> i64 {
    sqlx::query(
        "INSERT INTO geographic_location (name, parent_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(parent_id)
    .fetch_one(db.pool())
    .await
    .expect("failed to insert geographic location")
    .get("id")
}

/// Count rows in a table; for cascade assertions.
pub async fn count_rows(db: &Database, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    sqlx::query(&sql)
        .fetch_one(db.pool())
        .await
        .expect("failed to count rows")
        .get(0)
}
