//! # Unit Registry
//!
//! Known unit names, their categories, and conversions between them.
//!
//! Linear categories (length, area, volume, weight, time, data, angle) store
//! one factor per unit relative to the category's base unit. Three categories
//! need more than a factor:
//!
//! - **Temperature**: offsets, converted through Kelvin
//! - **Currency**: exchange rates come from the context, bound as variables
//!   named by the currency code (`EUR = 0.92`, rates against a common base)
//! - **Screen**: `px` is the base, `pt` and `em`/`rem` depend on the
//!   context's `ppi` and `em_size`; screen units convert to physical lengths
//!   through `ppi`
//!
//! ## Example
//!
//! ```rust
//! use calc_core::context::CalculatorContext;
//! use calc_core::units::{convert, lookup};
//!
//! let ctx = CalculatorContext::default();
//! let ft = lookup("feet").unwrap();
//! let m = lookup("m").unwrap();
//! let meters = convert(10.0, &ft, &m, &ctx).unwrap();
//! assert!((meters - 3.048).abs() < 1e-9);
//! ```

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::context::CalculatorContext;
use crate::errors::{CalcError, CalcResult};
use crate::value::ValueType;

/// Physical or monetary dimension of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitCategory {
    Length,
    Area,
    Volume,
    Weight,
    Time,
    Data,
    Angle,
    Temperature,
    Currency,
    /// CSS-style screen units (px, pt, em, rem)
    Screen,
}

impl UnitCategory {
    /// The value type a quantity in this category carries
    pub fn value_type(&self) -> ValueType {
        match self {
            UnitCategory::Currency => ValueType::Currency,
            UnitCategory::Time => ValueType::Time,
            UnitCategory::Temperature => ValueType::Temperature,
            _ => ValueType::Unit,
        }
    }

    /// Whether two categories can be converted into each other
    pub fn converts_to(&self, other: UnitCategory) -> bool {
        *self == other
            || matches!(
                (self, other),
                (UnitCategory::Screen, UnitCategory::Length) | (UnitCategory::Length, UnitCategory::Screen)
            )
    }
}

/// A resolved unit: canonical symbol, category and base factor.
///
/// `factor` is meaningful for linear categories only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDef {
    pub symbol: &'static str,
    pub category: UnitCategory,
    pub factor: f64,
}

/// Metres per inch
const METERS_PER_INCH: f64 = 0.0254;

type LinearEntry = (&'static str, UnitCategory, f64, &'static [&'static str]);

#[rustfmt::skip]
const LINEAR_UNITS: &[LinearEntry] = &[
    // Length (base: metre)
    ("m", UnitCategory::Length, 1.0, &["meter", "meters", "metre", "metres"]),
    ("cm", UnitCategory::Length, 0.01, &["centimeter", "centimeters"]),
    ("mm", UnitCategory::Length, 0.001, &["millimeter", "millimeters"]),
    ("km", UnitCategory::Length, 1000.0, &["kilometer", "kilometers"]),
    ("inch", UnitCategory::Length, METERS_PER_INCH, &["inches"]),
    ("ft", UnitCategory::Length, 0.3048, &["feet", "foot"]),
    ("yd", UnitCategory::Length, 0.9144, &["yard", "yards"]),
    ("mil", UnitCategory::Length, 0.0000254, &[]),
    ("point", UnitCategory::Length, 0.000352778, &["points"]),
    ("line", UnitCategory::Length, 0.002116667, &["lines"]),
    ("hand", UnitCategory::Length, 0.1016, &["hands"]),
    ("rod", UnitCategory::Length, 5.0292, &["rods"]),
    ("chain", UnitCategory::Length, 20.1168, &["chains"]),
    ("furlong", UnitCategory::Length, 201.168, &["furlongs"]),
    ("mile", UnitCategory::Length, 1609.344, &["miles", "mi"]),
    ("cable", UnitCategory::Length, 185.2, &["cables"]),
    ("nauticalmile", UnitCategory::Length, 1852.0, &["nmi"]),
    ("league", UnitCategory::Length, 4828.032, &["leagues"]),
    // Area (base: square metre)
    ("m2", UnitCategory::Area, 1.0, &["sqm"]),
    ("cm2", UnitCategory::Area, 0.0001, &[]),
    ("mm2", UnitCategory::Area, 0.000001, &[]),
    ("km2", UnitCategory::Area, 1000000.0, &[]),
    ("hectare", UnitCategory::Area, 10000.0, &["hectares", "ha"]),
    ("are", UnitCategory::Area, 100.0, &["ares"]),
    ("acre", UnitCategory::Area, 4046.8564224, &["acres"]),
    ("sqft", UnitCategory::Area, 0.092903, &[]),
    ("sqyd", UnitCategory::Area, 0.836127, &[]),
    ("sqin", UnitCategory::Area, 0.00064516, &[]),
    // Volume (base: cubic metre)
    ("m3", UnitCategory::Volume, 1.0, &[]),
    ("cm3", UnitCategory::Volume, 0.000001, &["cc"]),
    ("mm3", UnitCategory::Volume, 0.000000001, &[]),
    ("liter", UnitCategory::Volume, 0.001, &["liters", "litre", "litres", "l", "L"]),
    ("ml", UnitCategory::Volume, 0.000001, &["milliliter", "milliliters"]),
    ("gallon", UnitCategory::Volume, 0.003785412, &["gallons", "gal"]),
    ("quart", UnitCategory::Volume, 0.000946353, &["quarts", "qt"]),
    ("pint", UnitCategory::Volume, 0.000473176, &["pints"]),
    ("cup", UnitCategory::Volume, 0.000236588, &["cups"]),
    ("floz", UnitCategory::Volume, 0.0000295735, &[]),
    ("tbsp", UnitCategory::Volume, 0.0000147868, &[]),
    ("tsp", UnitCategory::Volume, 0.00000492892, &[]),
    // Weight (base: gram)
    ("g", UnitCategory::Weight, 1.0, &["gram", "grams"]),
    ("kg", UnitCategory::Weight, 1000.0, &["kilogram", "kilograms"]),
    ("mg", UnitCategory::Weight, 0.001, &["milligram", "milligrams"]),
    ("tonne", UnitCategory::Weight, 1000000.0, &["tonnes", "t"]),
    ("lb", UnitCategory::Weight, 453.59237, &["lbs", "pound", "pounds"]),
    ("oz", UnitCategory::Weight, 28.349523125, &["ounce", "ounces"]),
    ("stone", UnitCategory::Weight, 6350.29318, &["stones"]),
    ("carat", UnitCategory::Weight, 0.2, &["carats", "ct"]),
    ("centner", UnitCategory::Weight, 100000.0, &[]),
    // Time (base: second)
    ("second", UnitCategory::Time, 1.0, &["seconds", "sec", "secs", "s"]),
    ("minute", UnitCategory::Time, 60.0, &["minutes", "min", "mins"]),
    ("hour", UnitCategory::Time, 3600.0, &["hours", "hr", "hrs", "h"]),
    ("day", UnitCategory::Time, 86400.0, &["days", "d"]),
    ("week", UnitCategory::Time, 604800.0, &["weeks", "wk"]),
    ("month", UnitCategory::Time, 2629746.0, &["months"]),
    ("year", UnitCategory::Time, 31556952.0, &["years", "yr"]),
    // Data (base: bit)
    ("bit", UnitCategory::Data, 1.0, &["bits"]),
    ("byte", UnitCategory::Data, 8.0, &["bytes", "B"]),
    ("kb", UnitCategory::Data, 8000.0, &[]),
    ("mb", UnitCategory::Data, 8000000.0, &[]),
    ("gb", UnitCategory::Data, 8000000000.0, &[]),
    ("tb", UnitCategory::Data, 8000000000000.0, &[]),
    ("kib", UnitCategory::Data, 8192.0, &[]),
    ("mib", UnitCategory::Data, 8388608.0, &[]),
    ("gib", UnitCategory::Data, 8589934592.0, &[]),
    ("tib", UnitCategory::Data, 8796093022208.0, &[]),
    // Angle (base: radian)
    ("radian", UnitCategory::Angle, 1.0, &["radians", "rad"]),
    ("degree", UnitCategory::Angle, 0.0174533, &["degrees", "deg"]),
];

const TEMPERATURE_UNITS: &[(&str, &[&str])] = &[
    ("C", &["celsius"]),
    ("F", &["fahrenheit"]),
    ("K", &["kelvin"]),
];

const SCREEN_UNITS: &[(&str, &[&str])] = &[
    ("px", &["pixel", "pixels"]),
    ("pt", &[]),
    ("em", &[]),
    ("rem", &[]),
];

/// ISO 4217 codes recognized as currency units
pub const CURRENCY_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "CAD", "AUD", "JPY", "CHF", "CNY", "HKD", "NZD", "SEK", "KRW", "SGD", "NOK",
    "MXN", "INR", "RUB", "ZAR", "TRY", "BRL", "TWD", "DKK", "PLN", "THB", "IDR", "HUF", "CZK", "ILS",
    "CLP", "PHP", "AED", "COP", "SAR", "MYR", "RON",
];

/// Exact-spelling index over every symbol and alias.
static EXACT: Lazy<HashMap<&'static str, UnitDef>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for &(symbol, category, factor, aliases) in LINEAR_UNITS {
        let def = UnitDef { symbol, category, factor };
        map.insert(symbol, def);
        for alias in aliases {
            map.insert(*alias, def);
        }
    }
    for &(symbol, aliases) in TEMPERATURE_UNITS {
        let def = UnitDef { symbol, category: UnitCategory::Temperature, factor: 1.0 };
        map.insert(symbol, def);
        for alias in aliases {
            map.insert(*alias, def);
        }
    }
    for &(symbol, aliases) in SCREEN_UNITS {
        let def = UnitDef { symbol, category: UnitCategory::Screen, factor: 1.0 };
        map.insert(symbol, def);
        for alias in aliases {
            map.insert(*alias, def);
        }
    }
    for &code in CURRENCY_CODES {
        map.insert(code, UnitDef { symbol: code, category: UnitCategory::Currency, factor: 1.0 });
    }
    map
});

/// Case-folded index. Single-letter names are left out, so `c`, `f` and `k`
/// stay free for variables and `b` never folds onto `B` (byte).
static FOLDED: Lazy<HashMap<String, UnitDef>> = Lazy::new(|| {
    let mut map = HashMap::new();
    let mut names: Vec<(&&str, &UnitDef)> = EXACT.iter().collect();
    // Canonical symbols win collisions over aliases
    names.sort_by_key(|(name, def)| (**name != def.symbol, **name));
    for (name, def) in names {
        if name.chars().count() == 1 {
            continue;
        }
        map.entry(name.to_lowercase()).or_insert(*def);
    }
    map
});

/// Resolve a unit name: exact spelling first, then case-insensitively.
pub fn lookup(name: &str) -> Option<UnitDef> {
    EXACT
        .get(name)
        .or_else(|| FOLDED.get(&name.to_lowercase()))
        .copied()
}

/// Whether `name` names a known unit
pub fn is_unit(name: &str) -> bool {
    lookup(name).is_some()
}

/// Convert `value` from one unit to another.
///
/// Fails with [`CalcError::UnsupportedConversion`] when the categories
/// differ or, for currencies, when an exchange rate is not bound.
pub fn convert(value: f64, from: &UnitDef, to: &UnitDef, ctx: &CalculatorContext) -> CalcResult<f64> {
    if from.symbol == to.symbol {
        return Ok(value);
    }

    let unsupported = || CalcError::unsupported_conversion(from.symbol, to.symbol);

    match (from.category, to.category) {
        (UnitCategory::Temperature, UnitCategory::Temperature) => {
            Ok(kelvin_to(to.symbol, to_kelvin(from.symbol, value)))
        }
        (UnitCategory::Currency, UnitCategory::Currency) => {
            let from_rate = exchange_rate(from.symbol, ctx).ok_or_else(unsupported)?;
            let to_rate = exchange_rate(to.symbol, ctx).ok_or_else(unsupported)?;
            Ok(value * to_rate / from_rate)
        }
        (UnitCategory::Screen, UnitCategory::Screen) => {
            Ok(value * screen_px(from.symbol, ctx) / screen_px(to.symbol, ctx))
        }
        (UnitCategory::Screen, UnitCategory::Length) => {
            if ctx.ppi <= 0.0 {
                return Err(unsupported());
            }
            let inches = value * screen_px(from.symbol, ctx) / ctx.ppi;
            Ok(inches * METERS_PER_INCH / to.factor)
        }
        (UnitCategory::Length, UnitCategory::Screen) => {
            let px = value * from.factor / METERS_PER_INCH * ctx.ppi;
            Ok(px / screen_px(to.symbol, ctx))
        }
        (a, b) if a == b => Ok(value * from.factor / to.factor),
        _ => Err(unsupported()),
    }
}

/// Pixels per one screen unit under the context's settings
fn screen_px(symbol: &str, ctx: &CalculatorContext) -> f64 {
    match symbol {
        "pt" => ctx.ppi / 72.0,
        "em" | "rem" => ctx.em_size,
        _ => 1.0,
    }
}

fn to_kelvin(symbol: &str, value: f64) -> f64 {
    match symbol {
        "C" => value + 273.15,
        "F" => (value - 32.0) * 5.0 / 9.0 + 273.15,
        _ => value,
    }
}

fn kelvin_to(symbol: &str, kelvin: f64) -> f64 {
    match symbol {
        "C" => kelvin - 273.15,
        "F" => (kelvin - 273.15) * 9.0 / 5.0 + 32.0,
        _ => kelvin,
    }
}

/// Rate bound for a currency code, read from the context's variables.
fn exchange_rate(code: &str, ctx: &CalculatorContext) -> Option<f64> {
    ctx.get(code)
        .or_else(|| ctx.get(&code.to_lowercase()))
        .filter(|value| !value.is_error())
        .map(|value| value.number_value())
        .filter(|rate| rate.is_finite() && *rate > 0.0)
}
