//! # miospora-core
//!
//! Core types, traits, and codecs for the miospora paleobotanical taxon
//! catalog.
//!
//! This crate provides the foundational data structures the storage crate
//! depends on: the entity/payload model, the composite-field codec for
//! packed stratigraphy/geography display strings, the filter model consumed
//! by the predicate builder, the error taxonomy, and bootstrap vocabulary
//! defaults.

pub mod codec;
pub mod defaults;
pub mod error;
pub mod filter;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use codec::{encode_geography, encode_stratigraphy, GeoRef, StratComponent, StratExpr};
pub use error::{Error, Result};
pub use filter::{FilterMap, FilterMapExt, FilterValue, SidedTerm};
pub use models::*;
pub use traits::*;
