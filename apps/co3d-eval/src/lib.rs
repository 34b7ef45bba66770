//! # CO3D Eval Library
//!
//! This library exposes the CLI commands for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod cli;

// Re-export co3d_eval_core for convenience
pub use co3d_eval_core;
