//! Bootstrap vocabulary defaults.
//!
//! Initial allowed-value set per reference vocabulary, used to seed a fresh
//! database so data-entry forms have something to offer before the first
//! record is cataloged. Vocabularies are get-or-create-deduplicated, so
//! seeding is idempotent and user-entered values extend these lists freely.

/// Spore outline in polar view.
pub const AMB: &[&str] = &["circular", "triangular", "subtriangular", "oval"];

/// Overall spore form.
pub const FORM: &[&str] = &["rounded", "rounded-triangular", "triangular"];

/// Shape of the spore sides.
pub const SIDES_SHAPE: &[&str] = &["straight", "convex", "concave"];

/// Shape of the spore angles.
pub const ANGLES_SHAPE: &[&str] = &["rounded", "pointed", "truncate"];

/// Equatorial outline contour.
pub const OUTLINE: &[&str] = &["even", "uneven"];

/// Presence of the area around the laesurae.
pub const AREA_PRESENCE: &[&str] = &["present", "absent", "weakly expressed"];

/// Laesurae (trilete mark) shape.
pub const LAESURAE_SHAPE: &[&str] = &["straight", "sinuous", "open"];

/// Laesurae ray shape.
pub const LAESURAE_RAYS: &[&str] = &["simple", "forked", "with thickened lips"];

/// Exine structure.
pub const EXINE_STRUCTURE: &[&str] = &["homogeneous", "two-layered", "granular"];

/// Exine growth type.
pub const EXINE_GROWTH_TYPE: &[&str] = &["cingulum", "zona", "patina"];

/// Named sides a sculpture/ornamentation value can be scoped to.
pub const SPORE_SIDE: &[&str] = &["proximal", "distal", "equatorial"];

/// Sculpture element vocabulary.
pub const SCULPTURE: &[&str] = &["laevigate", "granulate", "verrucate", "spinose"];

/// Ornamentation element vocabulary.
pub const ORNAMENTATION: &[&str] = &["punctate", "reticulate", "rugulate"];
