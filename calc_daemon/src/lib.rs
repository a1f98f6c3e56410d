//! # calc_daemon
//!
//! HTTP front end for calc_core. One JSON endpoint evaluates an expression
//! against a request-supplied context and returns the result together with
//! every variable binding.
//!
//! ```text
//! POST /api/calculate   {"expression": "x * 2", "context": {"variables": {"x": "21"}}}
//! GET  /health          {"status": "ok"}
//! ```

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;

use calc_core::CalculatorContext;

pub use error::ApiError;
pub use routes::router;

/// Shared state handed to every handler.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Settings and pre-bound variables from the configuration file.
    pub defaults: CalculatorContext,
}

impl AppState {
    pub fn new(defaults: CalculatorContext) -> Self {
        Self { defaults }
    }
}
