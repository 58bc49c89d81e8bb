//! Test harnesses for IREX.
//!
//! Provides `TestProject` for building throwaway projects on disk and
//! the CLI regression tests for the `irex` binary.

#[cfg(test)]
pub mod cli;
pub mod project;

pub use project::{TestError, TestProject};
