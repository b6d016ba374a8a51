//! Domain types for docwatch.
//!
//! - `record` - The per-file documentation record and its parts
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use dw_core::{FunctionRecord, SourceRecord, VariableRecord};
//! ```

mod record;

pub use record::{FunctionRecord, SourceRecord, VariableRecord};
