//! # Calculator Context
//!
//! The evaluation environment of one session: bound variables plus the
//! measurement and locale settings the evaluator reads.
//!
//! ```text
//! CalculatorContext
//! ├── variables: HashMap<String, CalculatorValue> (last write wins)
//! ├── timezone: String  (used when formatting Date values)
//! ├── ppi: f64          (px <-> physical length)
//! └── em_size: f64      (em/rem <-> px)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use calc_core::context::CalculatorContext;
//! use calc_core::value::CalculatorValue;
//!
//! let mut ctx = CalculatorContext::default();
//! ctx.bind("x", CalculatorValue::number(2.0));
//! let previous = ctx.bind("x", CalculatorValue::number(3.0));
//!
//! assert_eq!(previous.map(|v| v.number_value()), Some(2.0));
//! assert_eq!(ctx.len(), 1);
//! assert_eq!(ctx.get("x").map(|v| v.number_value()), Some(3.0));
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::CalculatorValue;

/// Timezone used when none is configured
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// CSS reference pixel density
pub const DEFAULT_PPI: f64 = 96.0;

/// Browser default font size in px
pub const DEFAULT_EM_SIZE: f64 = 16.0;

/// Per-session evaluation environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorContext {
    /// Variable name -> currently bound value
    #[serde(default)]
    pub variables: HashMap<String, CalculatorValue>,

    /// Timezone identifier, e.g. `"UTC"` or `"Europe/Berlin"`
    pub timezone: String,

    /// Pixels per inch
    pub ppi: f64,

    /// Font-relative size in px
    pub em_size: f64,
}

impl CalculatorContext {
    /// Create a context with no variables bound.
    pub fn new(timezone: impl Into<String>, ppi: f64, em_size: f64) -> Self {
        CalculatorContext {
            variables: HashMap::new(),
            timezone: timezone.into(),
            ppi,
            em_size,
        }
    }

    /// Builder-style bind, for pre-seeding a context.
    pub fn with_variable(mut self, name: impl Into<String>, value: CalculatorValue) -> Self {
        self.bind(name, value);
        self
    }

    /// Bind `name` to `value`, returning the value it replaced.
    pub fn bind(&mut self, name: impl Into<String>, value: CalculatorValue) -> Option<CalculatorValue> {
        self.variables.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&CalculatorValue> {
        self.variables.get(name)
    }

    /// Remove a binding, returning the value if it existed.
    pub fn unbind(&mut self, name: &str) -> Option<CalculatorValue> {
        self.variables.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Bound names in sorted order (the map itself is unordered).
    pub fn variable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.variables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Drop all bindings but keep the settings.
    pub fn clear_variables(&mut self) {
        self.variables.clear();
    }

    /// A context with the same settings and no variables.
    pub fn settings_only(&self) -> Self {
        CalculatorContext::new(self.timezone.clone(), self.ppi, self.em_size)
    }
}

impl Default for CalculatorContext {
    fn default() -> Self {
        CalculatorContext::new(DEFAULT_TIMEZONE, DEFAULT_PPI, DEFAULT_EM_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    #[test]
    fn test_defaults() {
        let ctx = CalculatorContext::default();
        assert_eq!(ctx.timezone, "UTC");
        assert_eq!(ctx.ppi, 96.0);
        assert_eq!(ctx.em_size, 16.0);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_rebind_replaces_entry() {
        let mut ctx = CalculatorContext::default().with_variable("x", CalculatorValue::number(2.0));
        let old = ctx.bind("x", CalculatorValue::new(7.0, "kg", ValueType::Unit));

        assert_eq!(old, Some(CalculatorValue::number(2.0)));
        assert_eq!(ctx.len(), 1);
        let x = ctx.get("x").unwrap();
        assert_eq!(x.number_value(), 7.0);
        assert_eq!(x.unit(), "kg");
    }

    #[test]
    fn test_unbind() {
        let mut ctx = CalculatorContext::default().with_variable("a", CalculatorValue::number(1.0));
        assert!(ctx.contains("a"));
        assert!(ctx.unbind("a").is_some());
        assert!(ctx.unbind("a").is_none());
        assert!(!ctx.contains("a"));
    }

    #[test]
    fn test_variable_names_sorted() {
        let ctx = CalculatorContext::default()
            .with_variable("b", CalculatorValue::number(1.0))
            .with_variable("a", CalculatorValue::number(2.0))
            .with_variable("c", CalculatorValue::number(3.0));
        assert_eq!(ctx.variable_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let ctx = CalculatorContext::new("Europe/Berlin", 144.0, 18.0)
            .with_variable("rate", CalculatorValue::percentage(5.0));
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["emSize"], 18.0);
        assert_eq!(json["timezone"], "Europe/Berlin");
        assert_eq!(json["variables"]["rate"]["type"], "Percentage");

        let parsed: CalculatorContext = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, ctx);
    }

    #[test]
    fn test_settings_only_drops_variables() {
        let ctx = CalculatorContext::new("UTC", 72.0, 12.0).with_variable("x", CalculatorValue::number(1.0));
        let bare = ctx.settings_only();
        assert!(bare.is_empty());
        assert_eq!(bare.ppi, 72.0);
        assert_eq!(bare.em_size, 12.0);
    }
}
