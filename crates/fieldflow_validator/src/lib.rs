//! Fieldflow Validator - rule-based tabular validation
//!
//! The engine takes typed tabular content and a declarative ruleset and
//! produces one pass/fail status per row plus one record per violation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐     ┌────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ RawFrame │────▶│ TableFrame │────▶│    Engine    │────▶│ Validation-   │
//! │ (CSV)    │     │ (coerced)  │     │ (field/row/  │     │ Outcome       │
//! │          │     │            │     │ group checks)│     │ (status+errs) │
//! └──────────┘     └────────────┘     └──────────────┘     └───────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Ruleset**: declarative rule table for one datatype - expected columns,
//!   nullability/format constraints, group invariants
//! - **TableFrame**: coerced in-memory content; unparseable dates become
//!   null, unparseable numbers become null plus a coercion error
//! - **ValidationOutcome**: owned result of one validation call; the engine
//!   keeps no state between calls

pub mod engine;
pub mod frame;
pub mod outcome;
pub mod ruleset;

// Re-exports for convenience
pub use engine::{Engine, EngineError};
pub use frame::{parse_date_dayfirst, read_csv_path, FrameError, RawFrame, TableFrame, Value};
pub use outcome::{codes, ErrorKind, RowError, RowStatus, ValidationOutcome};
pub use ruleset::{
    ColumnKind, ColumnRule, GeometryRule, GroupRules, Ruleset, RulesetRegistry, CRS_PATTERN,
};
