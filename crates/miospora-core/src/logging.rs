//! Structured logging field name constants for miospora.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log tooling can query by standardized names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Operation aborted, surfaced to the caller |
//! | WARN  | Recoverable issue, fallback applied |
//! | INFO  | Lifecycle events, write-operation completions |
//! | DEBUG | Decision points, skipped links, query shapes |
//! | TRACE | Per-row iteration |

/// Subsystem originating the log event.
/// Values: "db", "catalog"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "filter_query", "assembler", "dedupe", "vocab"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "find_genera", "create_full", "update_full", "delete"
pub const OPERATION: &str = "op";

/// Genus id being operated on.
pub const GENUS_ID: &str = "genus_id";

/// Genus name being operated on.
pub const GENUS_NAME: &str = "genus_name";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows returned by a query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of active filter axes in a compiled query.
pub const ACTIVE_AXES: &str = "active_axes";
