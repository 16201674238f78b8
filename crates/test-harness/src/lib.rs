//! Test harness for end-to-end document evaluation.
//!
//! Scripts documents by name, pushes them through the worker dispatch path
//! and checks the DISPLAY_SHAPE output.
//!
//! # Key Components
//!
//! - [`DocumentBuilder`]: fluent API for building and evaluating documents
//! - [`oracle`]: mesh checks returning pass/fail verdicts
//! - [`helpers`]: object constructors and mesh math
//! - [`assertions`]: assertion helpers with diagnostics

pub mod assertions;
pub mod helpers;
pub mod oracle;
pub mod workflow;

pub use helpers::HarnessError;
pub use oracle::OracleVerdict;
pub use workflow::{DocumentBuilder, Evaluation};
