#![deny(warnings)]
#![deny(clippy::all, clippy::pedantic, clippy::perf, clippy::suspicious)] // Catch correctness + perf + suspicious patterns early.
#![deny(clippy::unwrap_used, clippy::expect_used)]

//! Core library for the mocksmith test-double generator.
//!
//! The pipeline runs in four stages: a frozen declaration model ([`model`]),
//! per-type override resolution ([`resolve`]), constructor planning
//! ([`constructors`]), and source emission ([`emit`]). [`generator`] drives
//! the stages across a run; [`runtime`] is the library the generated mocks
//! call into at test time.

pub mod cli;
pub mod constructors;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod generator;
pub mod input;
pub mod logging;
pub mod model;
pub mod naming;
pub mod resolve;
pub mod runtime;

pub use error::{Error, Result};
pub use generator::{GenerationReport, Generator, GeneratorConfig, OutputLayout};
pub use model::DeclarationModel;
