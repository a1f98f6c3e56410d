//! # Error Types
//!
//! Structured error types for calc_core. Inside the engine every failure is a
//! `CalcError` propagated with `?`; at the session boundary it is folded into
//! an error-valued [`CalculatorValue`](crate::value::CalculatorValue) so that
//! renderers only ever branch on `isError`.
//!
//! The `Display` text of the evaluation variants is the user-facing message
//! that ends up in `errorMsg`.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::errors::{CalcError, CalcResult};
//!
//! fn checked_div(a: f64, b: f64) -> CalcResult<f64> {
//!     if b == 0.0 {
//!         return Err(CalcError::DivisionByZero);
//!     }
//!     Ok(a / b)
//! }
//!
//! assert_eq!(checked_div(1.0, 0.0).unwrap_err().to_string(), "division by zero");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for calc_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for calculator operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// The input could not be tokenized or parsed
    #[error("{message}")]
    Parse { message: String },

    /// Division (or modulo) with a zero divisor
    #[error("division by zero")]
    DivisionByZero,

    /// A variable was referenced before being bound
    #[error("undefined variable: {name}")]
    UndefinedVariable { name: String },

    /// A function name that the evaluator does not know
    #[error("unknown function: {name}")]
    UnknownFunction { name: String },

    /// A function was called with the wrong number of arguments
    #[error("{function} requires {expected} {}", argument_word(.expected))]
    ArgumentCount { function: String, expected: usize },

    /// A function argument outside the function's domain
    #[error("{reason}")]
    Domain { function: String, reason: String },

    /// Two operands whose units cannot be combined
    #[error("incompatible units: {left} and {right}")]
    IncompatibleUnits { left: String, right: String },

    /// No conversion path between two units
    #[error("unsupported unit conversion: {from} to {to}")]
    UnsupportedConversion { from: String, to: String },

    /// A unit name that the registry does not know
    #[error("unknown unit: {unit}")]
    UnknownUnit { unit: String },

    /// The computation produced NaN or an infinity
    #[error("result is not a finite number")]
    NonFinite,

    /// An error value was used as an operand (e.g. a variable bound to a failure)
    #[error("{message}")]
    ErrorValue { message: String },

    /// A serialized value violated the isError/errorMsg invariant
    #[error("invalid calculator value: {reason}")]
    InvalidValue { reason: String },

    /// A configuration or CLI input value is invalid
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON/TOML serialization or deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Session file schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

fn argument_word(count: &usize) -> &'static str {
    if *count == 1 {
        "argument"
    } else {
        "arguments"
    }
}

impl CalcError {
    /// Create a Parse error
    pub fn parse(message: impl Into<String>) -> Self {
        CalcError::Parse {
            message: message.into(),
        }
    }

    /// Create an UndefinedVariable error
    pub fn undefined_variable(name: impl Into<String>) -> Self {
        CalcError::UndefinedVariable { name: name.into() }
    }

    /// Create an ArgumentCount error
    pub fn argument_count(function: impl Into<String>, expected: usize) -> Self {
        CalcError::ArgumentCount {
            function: function.into(),
            expected,
        }
    }

    /// Create a Domain error
    pub fn domain(function: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::Domain {
            function: function.into(),
            reason: reason.into(),
        }
    }

    /// Create an IncompatibleUnits error
    pub fn incompatible_units(left: impl Into<String>, right: impl Into<String>) -> Self {
        CalcError::IncompatibleUnits {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Create an UnsupportedConversion error
    pub fn unsupported_conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        CalcError::UnsupportedConversion {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        CalcError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a SerializationError from any displayable cause
    pub fn serialization(reason: impl std::fmt::Display) -> Self {
        CalcError::SerializationError {
            reason: reason.to_string(),
        }
    }

    /// Whether this error describes a failed evaluation (as opposed to I/O,
    /// configuration or serialization trouble).
    pub fn is_evaluation_error(&self) -> bool {
        matches!(
            self,
            CalcError::Parse { .. }
                | CalcError::DivisionByZero
                | CalcError::UndefinedVariable { .. }
                | CalcError::UnknownFunction { .. }
                | CalcError::ArgumentCount { .. }
                | CalcError::Domain { .. }
                | CalcError::IncompatibleUnits { .. }
                | CalcError::UnsupportedConversion { .. }
                | CalcError::UnknownUnit { .. }
                | CalcError::NonFinite
                | CalcError::ErrorValue { .. }
        )
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalcError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::Parse { .. } => "PARSE_ERROR",
            CalcError::DivisionByZero => "DIVISION_BY_ZERO",
            CalcError::UndefinedVariable { .. } => "UNDEFINED_VARIABLE",
            CalcError::UnknownFunction { .. } => "UNKNOWN_FUNCTION",
            CalcError::ArgumentCount { .. } => "ARGUMENT_COUNT",
            CalcError::Domain { .. } => "DOMAIN_ERROR",
            CalcError::IncompatibleUnits { .. } => "INCOMPATIBLE_UNITS",
            CalcError::UnsupportedConversion { .. } => "UNSUPPORTED_CONVERSION",
            CalcError::UnknownUnit { .. } => "UNKNOWN_UNIT",
            CalcError::NonFinite => "NON_FINITE",
            CalcError::ErrorValue { .. } => "ERROR_VALUE",
            CalcError::InvalidValue { .. } => "INVALID_VALUE",
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::FileLocked { .. } => "FILE_LOCKED",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}
