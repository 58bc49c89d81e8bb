//! Compiles IREX specifications into the generator IR.
//!
//! Validates the project config, model catalogue and service tree,
//! propagates inherited defaults, resolves cross-references and assembles
//! an [`IrBundle`] of models, services, operations and routes.

pub mod assemble;
pub mod error;
pub mod ir;
pub mod normalize;
pub mod pipeline;
pub mod semantic;
pub mod validate;

pub use assemble::{assemble, join_path, parse_limit};
pub use error::CompileError;
pub use ir::{route_id, IrBundle};
pub use normalize::normalize;
pub use pipeline::{build, check_source, inspect_source, validate, BuildOptions, BuildOutput, Inspection};
pub use semantic::validate_semantics;
