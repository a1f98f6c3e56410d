//! # Evaluation Sessions
//!
//! A [`Session`] owns one [`CalculatorContext`] and evaluates input lines
//! against it, one after another, the way a calculator sheet does:
//!
//! ```text
//! price = 40 USD        -> binds price
//! tax: price * 8%       -> labelled value
//! # shipping later      -> comment
//! price + tax           -> value, also bound to `ans`
//! ```
//!
//! Every failure is folded into an error [`CalculatorValue`]; nothing here
//! returns `Err`.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::session::{LineOutcome, Session};
//!
//! let mut session = Session::default();
//! session.evaluate_line("x = 2");
//! let outcome = session.evaluate_line("x * 21");
//! assert_eq!(outcome.value().map(|v| v.number_value()), Some(42.0));
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::CalculatorContext;
use crate::errors::CalcResult;
use crate::evaluator::evaluate;
use crate::parser::{parse_statement, split_label, Statement};
use crate::value::CalculatorValue;

/// Variable rebound to the last successful result
pub const ANSWER_VARIABLE: &str = "ans";

/// Result of evaluating one input line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LineOutcome {
    /// Empty or whitespace-only line
    Blank,
    /// `#` or `//` comment; holds the text after the marker
    Comment { text: String },
    /// A computed value (possibly an error value)
    Value {
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        /// Name bound by an assignment on this line
        #[serde(skip_serializing_if = "Option::is_none")]
        assigned: Option<String>,
        value: CalculatorValue,
    },
}

impl LineOutcome {
    pub fn value(&self) -> Option<&CalculatorValue> {
        match self {
            LineOutcome::Value { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Whether this line produced an error value
    pub fn is_error(&self) -> bool {
        self.value().is_some_and(CalculatorValue::is_error)
    }

    /// The value, with blank and comment lines mapped to plain `0`
    pub fn into_value(self) -> CalculatorValue {
        match self {
            LineOutcome::Value { value, .. } => value,
            _ => CalculatorValue::number(0.0),
        }
    }
}

/// Owner of one evaluation context
#[derive(Debug, Clone, Default)]
pub struct Session {
    context: CalculatorContext,
}

impl Session {
    pub fn new(context: CalculatorContext) -> Self {
        Session { context }
    }

    pub fn context(&self) -> &CalculatorContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut CalculatorContext {
        &mut self.context
    }

    pub fn into_context(self) -> CalculatorContext {
        self.context
    }

    /// Evaluate one line and apply its bindings to the context.
    pub fn evaluate_line(&mut self, line: &str) -> LineOutcome {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return LineOutcome::Blank;
        }
        if let Some(text) = trimmed.strip_prefix("//").or_else(|| trimmed.strip_prefix('#')) {
            return LineOutcome::Comment {
                text: text.trim().to_string(),
            };
        }

        let (label, body) = split_label(trimmed);
        let (assigned, value) = match self.run(body) {
            Ok((assigned, value)) => (assigned, value),
            Err(err) => (None, CalculatorValue::from(err)),
        };

        debug!(
            line = trimmed,
            is_error = value.is_error(),
            value_type = %value.value_type(),
            "evaluated line"
        );

        if !value.is_error() {
            self.context.bind(ANSWER_VARIABLE, value.clone());
        }

        LineOutcome::Value {
            label: label.map(str::to_string),
            assigned,
            value,
        }
    }

    /// Evaluate every line of `text` in order.
    pub fn evaluate_document(&mut self, text: &str) -> Vec<LineOutcome> {
        text.lines().map(|line| self.evaluate_line(line)).collect()
    }

    fn run(&mut self, body: &str) -> CalcResult<(Option<String>, CalculatorValue)> {
        match parse_statement(body)? {
            Statement::Expr(expr) => Ok((None, evaluate(&expr, &self.context)?)),
            Statement::Assign { name, expr } => {
                // Failures are bound too, so later references report the same message
                let value = evaluate(&expr, &self.context).unwrap_or_else(CalculatorValue::from);
                self.context.bind(name.clone(), value.clone());
                Ok((Some(name), value))
            }
        }
    }
}

/// Evaluate a single expression in a fresh default context.
///
/// Blank and comment input yields plain `0`.
///
/// # Example
/// ```
/// use calc_core::session::calculate;
///
/// assert_eq!(calculate("2 + 2").number_value(), 4.0);
/// assert_eq!(calculate("1 / 0").error_msg(), Some("division by zero"));
/// ```
pub fn calculate(expression: &str) -> CalculatorValue {
    Session::default().evaluate_line(expression).into_value()
}
