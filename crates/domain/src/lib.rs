//! # SpBridge Domain
//!
//! Pure types and wire rules for talking to SharePoint list endpoints.
//!
//! This crate contains:
//! - The error taxonomy and `Result` alias
//! - The per-client configuration value
//! - Record and field value models
//! - The value codec (native values → wire payload)
//! - The OData filter builder
//! - Response envelope rules and list item type naming
//!
//! ## Architecture
//! - No dependencies on other SpBridge crates
//! - No I/O, no clocks, no randomness
//! - Everything here is deterministic and unit-testable

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::codec::{cast_as_date, cast_to_date_data, cast_to_multi_value_data, cast_to_payload};
pub use utils::filter::{and_clause, encode_filter_value, or_clause, FilterValue};
