//! # splice - annotation-driven source transformer for C/C++ libraries
//!
//! splice reads one set of annotated headers and sources and produces:
//!
//! - one filtered documentation tree per (language, version), ready for doxygen
//! - one C++20 module interface unit per declaration/definition pair
//!
//! ## Quick Start
//!
//! ```bash
//! # Filtered doc trees, Doxyfiles and the navigation page
//! splice docs
//!
//! # Regenerate .cppm/.ixx units beside the definitions
//! splice modules
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - Pure line-level transformations (no filesystem access)
//! - [`docs`] / [`modules`] - The filesystem shells driving the engine
//! - [`config`] - Configuration parsing (`splice.toml`)

/// Conventional-commit changelog and version bump.
pub mod changelog;

/// `extern "C"` guards for C headers.
pub mod ccompat;

/// Configuration file parsing (`splice.toml`).
pub mod config;

/// Documentation tree generation (doxygen input).
pub mod docs;

/// Tag scanning, block segmentation, slicing, gating and module synthesis.
pub mod engine;

/// Error types.
pub mod error;

/// Annotation syntax guides.
pub mod guide;

/// Module interface generation and watching.
pub mod modules;

/// Export directive removal.
pub mod strip;

/// Terminal UI utilities (tables, colors).
pub mod ui;
