//! IREX specification decoder.
//!
//! Reads the three specification kinds (project config, model catalogue,
//! service tree) from YAML into typed trees. The extension functions
//! `!only`, `!with`, `!except`, `!without` and `!env` are YAML tags
//! evaluated while decoding.

pub mod error;
pub mod functions;
pub mod model;
pub mod parser;

pub use error::ParseError;
pub use functions::{EnvKind, EnvRef, NameFilter, OptionValue, Selection, CRUD_ACTIONS};
pub use model::{ConfigTree, ModelCatalogue, ServiceTree, SpecDocument, SpecKind};
pub use parser::{decode, decode_file, decode_source, decode_str, Decoded};
