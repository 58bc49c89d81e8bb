//! Structural validation: presence and shape checks per specification kind,
//! independent of cross-file references.
//!
//! Each validator is a pure function from a tree to diagnostics and reports
//! everything it finds.

mod config;
mod schema;
mod service;

pub use config::validate_config;
pub use schema::{validate_schema, validate_schema_files};
pub use service::{validate_service, validate_service_file};
