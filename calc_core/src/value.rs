//! # Calculator Values
//!
//! [`CalculatorValue`] is one computed or literal result: a magnitude, a free-form
//! unit label, a [`ValueType`] tag, and an error flag. Failures are ordinary
//! values with `isError = true`, so producers and renderers share one channel.
//!
//! Fields are private. The only ways to build a value are the success
//! constructors and [`CalculatorValue::error`], which keeps the
//! `isError`/`errorMsg` invariant structural:
//!
//! - success: `errorMsg` is absent
//! - failure: `errorMsg` is present and non-empty, `number`/`unit` mean nothing
//!
//! ## JSON Form
//!
//! ```json
//! { "number": 5.0, "unit": "USD", "type": "Currency", "isError": false }
//! { "number": 0.0, "unit": "", "type": "Number", "isError": true, "errorMsg": "division by zero" }
//! ```
//!
//! `type` is written as the variant name. Numeric-enum consumers can use
//! [`CalculatorValue::as_ordinal`] instead, which writes `"type": 1` and so on.
//! Reading accepts either form. Every field except `errorMsg` is required.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::value::{CalculatorValue, ValueType};
//!
//! let price = CalculatorValue::new(5.0, "USD", ValueType::Currency);
//! assert!(!price.is_error());
//! assert_eq!(price.error_msg(), None);
//!
//! let failed = CalculatorValue::error("division by zero");
//! assert!(failed.is_error());
//! assert_eq!(failed.error_msg(), Some("division by zero"));
//! ```

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::CalcError;

/// Fallback message for errors constructed without an explanation
const UNKNOWN_ERROR: &str = "unknown error";

/// Semantic kind of a calculator value.
///
/// Determines how `number` and `unit` are read by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "ValueTypeRepr")]
pub enum ValueType {
    /// Plain number, unit is usually empty
    #[default]
    Number,
    /// Money amount, unit is an ISO currency code
    Currency,
    /// Physical quantity (length, mass, volume, data, ...)
    Unit,
    /// Duration
    Time,
    /// Percentage, unit is `%`
    Percentage,
    /// Point in time, number is Unix seconds and unit the timezone
    Date,
    /// Temperature in C, F or K
    Temperature,
}

impl ValueType {
    /// All value types in declaration order
    pub const ALL: [ValueType; 7] = [
        ValueType::Number,
        ValueType::Currency,
        ValueType::Unit,
        ValueType::Time,
        ValueType::Percentage,
        ValueType::Date,
        ValueType::Temperature,
    ];

    /// Ordinal used by numeric-enum consumers (0 = Number ... 6 = Temperature)
    ///
    /// # Example
    /// ```
    /// use calc_core::value::ValueType;
    /// assert_eq!(ValueType::Currency.code(), 1);
    /// assert_eq!(ValueType::from_code(6), Some(ValueType::Temperature));
    /// assert_eq!(ValueType::from_code(7), None);
    /// ```
    pub fn code(&self) -> u8 {
        match self {
            ValueType::Number => 0,
            ValueType::Currency => 1,
            ValueType::Unit => 2,
            ValueType::Time => 3,
            ValueType::Percentage => 4,
            ValueType::Date => 5,
            ValueType::Temperature => 6,
        }
    }

    /// Inverse of [`ValueType::code`]
    pub fn from_code(code: u8) -> Option<ValueType> {
        ValueType::ALL.get(usize::from(code)).copied()
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ValueType::Number => "Number",
            ValueType::Currency => "Currency",
            ValueType::Unit => "Unit",
            ValueType::Time => "Time",
            ValueType::Percentage => "Percentage",
            ValueType::Date => "Date",
            ValueType::Temperature => "Temperature",
        }
    }
}

/// Wire form of a type tag: the variant name or its ordinal.
#[derive(Deserialize)]
#[serde(untagged)]
enum ValueTypeRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<ValueTypeRepr> for ValueType {
    type Error = CalcError;

    fn try_from(repr: ValueTypeRepr) -> Result<Self, Self::Error> {
        let found = match &repr {
            ValueTypeRepr::Code(code) => ValueType::from_code(*code),
            ValueTypeRepr::Name(name) => ValueType::ALL.into_iter().find(|ty| ty.display_name() == name.as_str()),
        };
        found.ok_or_else(|| CalcError::InvalidValue {
            reason: match repr {
                ValueTypeRepr::Code(code) => format!("unknown value type code: {}", code),
                ValueTypeRepr::Name(name) => format!("unknown value type: {}", name),
            },
        })
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One computed or literal result.
///
/// Immutable once built. Rebinding a variable replaces the stored value
/// rather than mutating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCalculatorValue", rename_all = "camelCase")]
pub struct CalculatorValue {
    number: f64,
    unit: String,
    #[serde(rename = "type")]
    value_type: ValueType,
    is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_msg: Option<String>,
}

impl CalculatorValue {
    /// Create a successful value.
    pub fn new(number: f64, unit: impl Into<String>, value_type: ValueType) -> Self {
        CalculatorValue {
            number,
            unit: unit.into(),
            value_type,
            is_error: false,
            error_msg: None,
        }
    }

    /// Create a plain unitless number.
    pub fn number(number: f64) -> Self {
        CalculatorValue::new(number, "", ValueType::Number)
    }

    /// Create a percentage (unit `%`).
    pub fn percentage(percent: f64) -> Self {
        CalculatorValue::new(percent, "%", ValueType::Percentage)
    }

    /// Create an error value.
    ///
    /// An empty message is replaced with `"unknown error"` so that `errorMsg`
    /// is never blank on a failure.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            message
        };
        CalculatorValue {
            number: 0.0,
            unit: String::new(),
            value_type: ValueType::Number,
            is_error: true,
            error_msg: Some(message),
        }
    }

    /// Copy of this value with the magnitude replaced (type and unit kept).
    ///
    /// Error values are returned unchanged.
    pub fn with_number(&self, number: f64) -> Self {
        if self.is_error {
            return self.clone();
        }
        CalculatorValue::new(number, self.unit.clone(), self.value_type)
    }

    /// The magnitude. Meaningless when [`is_error`](Self::is_error) is true.
    pub fn number_value(&self) -> f64 {
        self.number
    }

    /// The unit label. Meaningless when [`is_error`](Self::is_error) is true.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn error_msg(&self) -> Option<&str> {
        self.error_msg.as_deref()
    }

    /// Whether a unit label is attached
    pub fn has_unit(&self) -> bool {
        !self.unit.is_empty()
    }

    /// View that serializes `type` as its ordinal code.
    pub fn as_ordinal(&self) -> OrdinalValue<'_> {
        OrdinalValue(self)
    }
}

impl From<CalcError> for CalculatorValue {
    fn from(err: CalcError) -> Self {
        CalculatorValue::error(err.to_string())
    }
}

impl From<f64> for CalculatorValue {
    fn from(number: f64) -> Self {
        CalculatorValue::number(number)
    }
}

/// Serialization view of a value with `type` written as its ordinal.
///
/// # Example
/// ```
/// use calc_core::value::{CalculatorValue, ValueType};
///
/// let value = CalculatorValue::new(5.0, "USD", ValueType::Currency);
/// let json = serde_json::to_value(value.as_ordinal()).unwrap();
/// assert_eq!(json["type"], 1);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct OrdinalValue<'a>(&'a CalculatorValue);

impl Serialize for OrdinalValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.0;
        let len = if value.error_msg.is_some() { 5 } else { 4 };
        let mut state = serializer.serialize_struct("CalculatorValue", len)?;
        state.serialize_field("number", &value.number)?;
        state.serialize_field("unit", &value.unit)?;
        state.serialize_field("type", &value.value_type.code())?;
        state.serialize_field("isError", &value.is_error)?;
        if let Some(msg) = &value.error_msg {
            state.serialize_field("errorMsg", msg)?;
        }
        state.end()
    }
}

/// Unchecked wire shape; converted through [`TryFrom`] so that deserialized
/// values satisfy the same invariant as constructed ones.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCalculatorValue {
    number: f64,
    unit: String,
    #[serde(rename = "type")]
    value_type: ValueType,
    is_error: bool,
    #[serde(default)]
    error_msg: Option<String>,
}

impl TryFrom<RawCalculatorValue> for CalculatorValue {
    type Error = CalcError;

    fn try_from(raw: RawCalculatorValue) -> Result<Self, Self::Error> {
        match (raw.is_error, raw.error_msg) {
            (false, None) => Ok(CalculatorValue::new(raw.number, raw.unit, raw.value_type)),
            (false, Some(_)) => Err(CalcError::InvalidValue {
                reason: "errorMsg must be absent when isError is false".to_string(),
            }),
            (true, Some(msg)) if !msg.trim().is_empty() => Ok(CalculatorValue {
                number: raw.number,
                unit: raw.unit,
                value_type: raw.value_type,
                is_error: true,
                error_msg: Some(msg),
            }),
            (true, _) => Err(CalcError::InvalidValue {
                reason: "errorMsg must be present and non-empty when isError is true".to_string(),
            }),
        }
    }
}
