//! SQLite storage layer for the miospora taxon catalog.
//!
//! Owns the connection pool, migrations, the filter query compiler, the
//! diagnosis uniqueness matcher, the atomic record assembler and the
//! vocabulary service. Domain types and the repository traits live in
//! `miospora-core`.

use std::collections::BTreeMap;

use sqlx::SqlitePool;
use tracing::info;

use miospora_core::error::Result;
use miospora_core::filter::FilterMap;
use miospora_core::models::{GenusDetail, GenusHeader, GenusPayload, GenusSummary};
use miospora_core::traits::{GenusRepository, VocabularyRepository};

mod dedupe;
pub mod filter_query;
pub mod genera;
mod genera_tx;
pub mod pool;
pub mod test_fixtures;
pub mod vocab;

pub use filter_query::{FilterQueryResult, GenusFilterQueryBuilder, QueryParam};
pub use genera::SqliteGenusRepository;
pub use pool::{create_memory_pool, create_pool, create_pool_with_config, PoolConfig};
pub use vocab::SqliteVocabularyRepository;

/// Aggregate handle over every repository, sharing one pool.
#[derive(Clone)]
pub struct Database {
    pub genera: SqliteGenusRepository,
    pub vocab: SqliteVocabularyRepository,
    pool: SqlitePool,
}

impl Database {
    /// Wrap an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            genera: SqliteGenusRepository::new(pool.clone()),
            vocab: SqliteVocabularyRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to a SQLite database by URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = pool::create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Private in-memory database; the pool is pinned to one connection so
    /// every query sees the same memory store.
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = pool::create_memory_pool().await?;
        Ok(Self::new(pool))
    }

    /// Apply embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        info!(
            subsystem = "db",
            component = "database",
            op = "migrate",
            "migrations applied"
        );
        Ok(())
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // CATALOG OPERATIONS
    // =========================================================================

    /// Distinct summary-loaded genera matching the filter map.
    pub async fn find_genera(&self, filters: &FilterMap) -> Result<Vec<GenusSummary>> {
        self.genera.find(filters).await
    }

    /// Every genus, summary-loaded, ordered by name.
    pub async fn list_genera(&self) -> Result<Vec<GenusSummary>> {
        self.genera.find(&FilterMap::new()).await
    }

    /// Fully hydrated genus graph by name.
    pub async fn get_full_genus(&self, name: &str) -> Result<Option<GenusDetail>> {
        self.genera.get_detail(name).await
    }

    /// Summary row for one genus by name.
    pub async fn get_genus_summary(&self, name: &str) -> Result<Option<GenusSummary>> {
        self.genera.get_summary(name).await
    }

    /// Header fields only.
    pub async fn get_genus_header(&self, name: &str) -> Result<Option<GenusHeader>> {
        self.genera.get_header(name).await
    }

    /// Create a whole genus record atomically.
    pub async fn create_genus(&self, payload: &GenusPayload) -> Result<i64> {
        self.genera.create_full(payload).await
    }

    /// Replace a genus record atomically.
    pub async fn update_genus(&self, genus_id: i64, payload: &GenusPayload) -> Result<i64> {
        self.genera.update_full(genus_id, payload).await
    }

    /// Delete a genus by name; cascades to everything it owns.
    pub async fn delete_genus(&self, name: &str) -> Result<bool> {
        self.genera.delete_by_name(name).await
    }

    /// Display options per axis for filters and data-entry forms.
    pub async fn reference_option_lists(&self) -> Result<BTreeMap<String, Vec<String>>> {
        self.vocab.option_lists().await
    }

    /// Idempotently seed the initial vocabularies.
    pub async fn seed_defaults(&self) -> Result<()> {
        self.vocab.seed_defaults().await
    }
}
