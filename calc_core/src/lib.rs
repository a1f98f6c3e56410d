//! # calc_core - Calculator Engine
//!
//! `calc_core` is the computational heart of calgo: a unit-aware expression
//! calculator built around a small, JSON-serializable value model.
//!
//! ## Design Philosophy
//!
//! - **Errors are values**: a failed line is a [`CalculatorValue`] with
//!   `isError = true`, never a panic or a thrown error at the boundary
//! - **JSON-First**: values and contexts serialize to the shape the web
//!   frontend consumes
//! - **One context per session**: variables and settings live in a
//!   [`CalculatorContext`] owned by a [`Session`]
//!
//! ## Quick Start
//!
//! ```rust
//! use calc_core::{Session, ValueType};
//!
//! let mut session = Session::default();
//! session.evaluate_line("width = 3 ft");
//! let area = session.evaluate_line("width + 6 inch in cm").into_value();
//!
//! assert_eq!(area.value_type(), ValueType::Unit);
//! assert!((area.number_value() - 106.68).abs() < 1e-9);
//! ```
//!
//! ## Modules
//!
//! - [`value`] - `CalculatorValue` and `ValueType`
//! - [`context`] - `CalculatorContext` (variables, timezone, ppi, em size)
//! - [`units`] - Unit registry and conversions
//! - [`lexer`] / [`parser`] / [`evaluator`] - Expression pipeline
//! - [`session`] - Line-by-line evaluation against one context
//! - [`format`] - Display formatting
//! - [`config`] - TOML configuration
//! - [`file_io`] - Session files with atomic saves and locking
//! - [`errors`] - Structured error types

pub mod config;
pub mod context;
pub mod errors;
pub mod evaluator;
pub mod file_io;
pub mod format;
pub mod lexer;
pub mod parser;
pub mod session;
pub mod units;
pub mod value;

// Re-export commonly used types at crate root for convenience
pub use config::CalcConfig;
pub use context::CalculatorContext;
pub use errors::{CalcError, CalcResult};
pub use file_io::{load_session, save_session, FileLock, SessionFile};
pub use session::{calculate, LineOutcome, Session};
pub use value::{CalculatorValue, ValueType};
