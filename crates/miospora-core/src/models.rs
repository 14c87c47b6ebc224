//! Core data models for the miospora taxon catalog.
//!
//! Read-side records mirror the normalized storage graph; write-side
//! payloads describe a whole genus submission (scalar fields, diagnosis
//! attribute axes, distribution strings, species) as one unit — the record
//! assembler persists a payload atomically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// READ-SIDE RECORDS
// =============================================================================

/// Lightweight identity of a genus, as carried by conflict errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenusRef {
    pub id: i64,
    pub name: String,
}

/// Scalar genus row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenusRecord {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub type_species: Option<String>,
    pub length_min: Option<f64>,
    pub length_max: Option<f64>,
    pub width_min: Option<f64>,
    pub width_max: Option<f64>,
    pub comparison: Option<String>,
    pub natural_affiliation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Summary row for result tables: synonyms, infraturma and stratigraphy
/// are eagerly attached; everything else needs a detail fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenusSummary {
    pub id: i64,
    pub name: String,
    pub synonyms: Vec<String>,
    pub infraturma: Option<String>,
    /// Encoded stratigraphic display strings (see `codec`).
    pub stratigraphy: Vec<String>,
}

/// Header fields shown before a detail fetch completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenusHeader {
    pub name: String,
    pub full_name: String,
    pub type_species: Option<String>,
}

/// Synonym vocabulary entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synonym {
    pub id: i64,
    pub name: String,
    pub source: Option<String>,
}

/// A value optionally scoped to a named side of the organism.
/// `side: None` means "unspecified/any".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidedValue {
    pub side: Option<String>,
    pub value: String,
}

/// Exine growth form sub-record, resolved to display values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExineGrowthDetail {
    pub growth_type: Option<String>,
    pub thickness: Option<String>,
    pub width: Option<String>,
    pub structure: Option<String>,
}

/// Exoexine/intexine layer sub-record, resolved to display values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExineLayerDetail {
    pub thickness: Option<String>,
    pub description: Option<String>,
}

/// Fully hydrated diagnosis with every attribute axis resolved to its
/// display values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosisDetail {
    pub infraturma: Option<String>,
    pub form: Option<String>,
    pub angles_shape: Option<String>,
    pub area_presence: Option<String>,
    pub outline: Option<String>,
    pub outline_uneven_cause: Option<String>,
    pub laesurae_rays_length_min: Option<String>,
    pub laesurae_rays_length_max: Option<String>,
    pub additional_features: Option<String>,

    pub amb: Vec<String>,
    pub sides_shape: Vec<String>,
    pub laesurae: Vec<String>,
    pub laesurae_rays: Vec<String>,
    pub exine_structure: Vec<String>,
    pub exine_thickness: Vec<String>,

    pub exine_growth_form: Option<ExineGrowthDetail>,
    pub exoexine: Option<ExineLayerDetail>,
    pub intexine: Option<ExineLayerDetail>,

    pub sculpture: Vec<SidedValue>,
    pub ornamentation: Vec<SidedValue>,
}

/// Species row with its own distribution links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesDetail {
    pub id: i64,
    pub name: String,
    pub old_name: Option<String>,
    pub source: Option<String>,
    pub length_min: Option<f64>,
    pub length_max: Option<f64>,
    pub width_min: Option<f64>,
    pub width_max: Option<f64>,
    /// Encoded stratigraphy display strings.
    pub stratigraphy: Vec<String>,
    /// Encoded `"parent: name"` display strings.
    pub geography: Vec<String>,
}

/// Complete genus graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenusDetail {
    pub genus: GenusRecord,
    pub synonyms: Vec<Synonym>,
    pub diagnosis: Option<DiagnosisDetail>,
    pub species: Vec<SpeciesDetail>,
    pub stratigraphy: Vec<String>,
    pub geography: Vec<String>,
}

// =============================================================================
// WRITE-SIDE PAYLOADS
// =============================================================================

/// Synonym submission; get-or-create-deduplicated by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynonymPayload {
    pub name: String,
    pub source: Option<String>,
}

/// Exine growth form submission. A form without a type is not persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrowthFormPayload {
    pub growth_type: Option<String>,
    pub thickness: Option<String>,
    pub width: Option<String>,
    pub structure: Option<String>,
}

/// Exoexine/intexine layer submission; persisted only when either field
/// is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExineLayerPayload {
    pub thickness: Option<String>,
    pub description: Option<String>,
}

/// Diagnosis submission: every attribute axis of the morphological
/// description, as display values. Reference values are resolved through
/// the vocabulary upsert service at write time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosisPayload {
    pub infraturma: Option<String>,
    pub form: Option<String>,
    pub angles_shape: Option<String>,
    pub area_presence: Option<String>,
    pub outline: Option<String>,
    pub outline_uneven_cause: Option<String>,
    pub laesurae_rays_length_min: Option<String>,
    pub laesurae_rays_length_max: Option<String>,
    pub additional_features: Option<String>,

    pub amb: Vec<String>,
    pub sides_shape: Vec<String>,
    pub laesurae: Vec<String>,
    pub laesurae_rays: Vec<String>,
    pub exine_structure: Vec<String>,
    pub exine_thickness: Option<String>,

    pub exine_growth_form: Option<GrowthFormPayload>,
    pub exoexine: Option<ExineLayerPayload>,
    pub intexine: Option<ExineLayerPayload>,

    pub sculpture: Vec<SidedValue>,
    pub ornamentation: Vec<SidedValue>,
}

/// Species submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeciesPayload {
    pub name: String,
    pub old_name: Option<String>,
    pub source: Option<String>,
    pub length_min: Option<f64>,
    pub length_max: Option<f64>,
    pub width_min: Option<f64>,
    pub width_max: Option<f64>,
    pub stratigraphy: Vec<String>,
    pub geography: Vec<String>,
}

/// Whole-genus submission; persisted atomically by the record assembler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenusPayload {
    pub name: String,
    pub full_name: String,
    pub type_species: Option<String>,
    pub length_min: Option<f64>,
    pub length_max: Option<f64>,
    pub width_min: Option<f64>,
    pub width_max: Option<f64>,
    pub comparison: Option<String>,
    pub natural_affiliation: Option<String>,

    pub synonyms: Vec<SynonymPayload>,
    pub diagnosis: DiagnosisPayload,
    /// Packed stratigraphy display strings; unmatched decodes are skipped.
    pub stratigraphy: Vec<String>,
    /// Packed geography display strings; unmatched decodes are skipped.
    pub geography: Vec<String>,
    pub species: Vec<SpeciesPayload>,
}

/// Form fields use `""` and `"-"` as "not filled in" placeholders; a value
/// is present only if it is neither.
pub fn present(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "-")
}
