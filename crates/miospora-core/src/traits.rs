//! Core traits for the storage seam.
//!
//! These traits define the interfaces the storage layer must satisfy,
//! keeping the catalog logic testable against alternative backends.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::FilterMap;
use crate::models::*;

/// Read/write access to the genus catalog.
#[async_trait]
pub trait GenusRepository {
    /// Distinct summary-loaded genera matching the filter map; the filter
    /// semantics live with the predicate builder.
    async fn find(&self, filters: &FilterMap) -> Result<Vec<GenusSummary>>;

    /// Fully hydrated genus graph, or `None` if the name is unknown.
    async fn get_detail(&self, name: &str) -> Result<Option<GenusDetail>>;

    /// Header fields only.
    async fn get_header(&self, name: &str) -> Result<Option<GenusHeader>>;

    /// Create a whole genus record atomically. Fails with a conflict error
    /// on a duplicate name or duplicate diagnosis signature.
    async fn create_full(&self, payload: &GenusPayload) -> Result<i64>;

    /// Replace a genus record atomically: scalars updated in place, every
    /// child/attribute collection deleted and recreated from the payload.
    async fn update_full(&self, genus_id: i64, payload: &GenusPayload) -> Result<i64>;

    /// Delete by name; cascades to diagnosis, species and join rows, never
    /// to shared vocabulary rows. Returns whether a row was removed.
    async fn delete_by_name(&self, name: &str) -> Result<bool>;

    /// Delete by id.
    async fn delete_by_id(&self, genus_id: i64) -> Result<bool>;
}

/// Reference vocabulary bootstrap and option lists.
#[async_trait]
pub trait VocabularyRepository {
    /// Display options per axis for search filters and data-entry forms.
    /// Stratigraphy and geography come in "used" (attached to ≥1 genus)
    /// and "all" variants.
    async fn option_lists(&self) -> Result<BTreeMap<String, Vec<String>>>;

    /// Idempotently seed the initial allowed-value set per vocabulary.
    async fn seed_defaults(&self) -> Result<()>;
}
