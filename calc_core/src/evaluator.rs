//! # Evaluator
//!
//! Walks an [`Expr`] against a [`CalculatorContext`] and produces a
//! [`CalculatorValue`]. Failures come back as `Err(CalcError)` so they can be
//! propagated with `?`; the session turns them into error values.
//!
//! ## Unit Rules
//!
//! | Operation | Operands                          | Result                              |
//! |-----------|-----------------------------------|-------------------------------------|
//! | `+ -`     | plain, plain                      | plain                               |
//! | `+ - * /` | unit, plain (either side for `+ - *`) | keeps the unit                  |
//! | `+ -`     | unit, unit (same category)        | right converted to left's unit      |
//! | `/`       | unit, unit (same category)        | plain ratio                         |
//! | `+ -`     | x, p%                             | `x * (1 ± p/100)`                   |
//! | `*`       | x, p%                             | `x * p/100`                         |
//! | `of`      | p%, x                             | `x * p/100`                         |
//! | `+ -`     | date, duration                    | date shifted                        |
//! | `-`       | date, date                        | duration in seconds                 |
//!
//! Everything else mixing units is an `incompatible units` error.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::context::CalculatorContext;
//! use calc_core::evaluator::evaluate;
//! use calc_core::parser::parse_expression;
//!
//! let ctx = CalculatorContext::default();
//! let expr = parse_expression("3 ft + 12 inch").unwrap();
//! let value = evaluate(&expr, &ctx).unwrap();
//! assert!((value.number_value() - 4.0).abs() < 1e-9);
//! assert_eq!(value.unit(), "ft");
//! ```

use chrono::Utc;

use crate::context::CalculatorContext;
use crate::errors::{CalcError, CalcResult};
use crate::parser::{BinaryOp, Expr};
use crate::units::{self, UnitCategory, UnitDef};
use crate::value::{CalculatorValue, ValueType};

/// Functions taking exactly one argument
const UNARY_FUNCTIONS: [&str; 10] = ["sqrt", "abs", "sin", "cos", "tan", "log", "ln", "round", "floor", "ceil"];

impl Expr {
    /// Evaluate this expression; see [`evaluate`].
    pub fn evaluate(&self, ctx: &CalculatorContext) -> CalcResult<CalculatorValue> {
        evaluate(self, ctx)
    }
}

/// Evaluate `expr` in `ctx`.
///
/// A NaN or infinite magnitude at any node, not just the root, is reported
/// as [`CalcError::NonFinite`].
pub fn evaluate(expr: &Expr, ctx: &CalculatorContext) -> CalcResult<CalculatorValue> {
    eval(expr, ctx)
}

fn eval(expr: &Expr, ctx: &CalculatorContext) -> CalcResult<CalculatorValue> {
    let value = eval_node(expr, ctx)?;
    if !value.number_value().is_finite() {
        return Err(CalcError::NonFinite);
    }
    Ok(value)
}

fn eval_node(expr: &Expr, ctx: &CalculatorContext) -> CalcResult<CalculatorValue> {
    match expr {
        Expr::Number(n) => Ok(CalculatorValue::number(*n)),
        Expr::Variable(name) => variable(name, ctx),
        Expr::Percent(inner) => {
            let value = eval(inner, ctx)?;
            if value.has_unit() {
                return Err(CalcError::incompatible_units(value.unit(), "%"));
            }
            Ok(CalculatorValue::percentage(value.number_value()))
        }
        Expr::WithUnit { expr, unit } => {
            let value = eval(expr, ctx)?;
            attach_unit(&value, unit)
        }
        Expr::Negate(inner) => {
            let value = eval(inner, ctx)?;
            Ok(value.with_number(-value.number_value()))
        }
        Expr::Binary { op, left, right } => {
            let left = eval(left, ctx)?;
            let right = eval(right, ctx)?;
            binary(*op, &left, &right, ctx)
        }
        Expr::Call { name, args } => {
            let values = args
                .iter()
                .map(|arg| eval(arg, ctx))
                .collect::<CalcResult<Vec<_>>>()?;
            call(name, &values, ctx)
        }
        Expr::Convert { expr, target } => {
            let value = eval(expr, ctx)?;
            convert_value(&value, target, ctx)
        }
    }
}

fn variable(name: &str, ctx: &CalculatorContext) -> CalcResult<CalculatorValue> {
    match ctx.get(name) {
        Some(value) if value.is_error() => Err(CalcError::ErrorValue {
            message: value.error_msg().unwrap_or_default().to_string(),
        }),
        Some(value) => Ok(value.clone()),
        None => match name {
            "pi" => Ok(CalculatorValue::number(std::f64::consts::PI)),
            "e" => Ok(CalculatorValue::number(std::f64::consts::E)),
            _ => Err(CalcError::undefined_variable(name)),
        },
    }
}

fn resolve_unit(name: &str) -> CalcResult<UnitDef> {
    units::lookup(name).ok_or_else(|| CalcError::UnknownUnit {
        unit: name.to_string(),
    })
}

fn attach_unit(value: &CalculatorValue, unit: &str) -> CalcResult<CalculatorValue> {
    let def = resolve_unit(unit)?;
    if value.has_unit() {
        return Err(CalcError::incompatible_units(value.unit(), def.symbol));
    }
    Ok(CalculatorValue::new(
        value.number_value(),
        def.symbol,
        def.category.value_type(),
    ))
}

fn is_plain(value: &CalculatorValue) -> bool {
    !value.has_unit() && value.value_type() == ValueType::Number
}

fn is_percent(value: &CalculatorValue) -> bool {
    value.value_type() == ValueType::Percentage
}

fn is_date(value: &CalculatorValue) -> bool {
    value.value_type() == ValueType::Date
}

/// Name of an operand's unit for error messages
fn unit_label(value: &CalculatorValue) -> &str {
    match value.unit() {
        "" if is_percent(value) => "%",
        "" => "number",
        unit => unit,
    }
}

fn incompatible(left: &CalculatorValue, right: &CalculatorValue) -> CalcError {
    CalcError::incompatible_units(unit_label(left), unit_label(right))
}

/// Express `right` in `left`'s unit, when both carry convertible units.
fn align_units(left: &CalculatorValue, right: &CalculatorValue, ctx: &CalculatorContext) -> CalcResult<f64> {
    if left.unit() == right.unit() {
        return Ok(right.number_value());
    }
    let (Some(to), Some(from)) = (units::lookup(left.unit()), units::lookup(right.unit())) else {
        return Err(incompatible(left, right));
    };
    if !from.category.converts_to(to.category) {
        return Err(incompatible(left, right));
    }
    units::convert(right.number_value(), &from, &to, ctx)
}

fn binary(
    op: BinaryOp,
    left: &CalculatorValue,
    right: &CalculatorValue,
    ctx: &CalculatorContext,
) -> CalcResult<CalculatorValue> {
    let (l, r) = (left.number_value(), right.number_value());

    match op {
        BinaryOp::Of => {
            if !is_percent(left) {
                return Err(CalcError::domain("of", "'of' expects a percentage on the left"));
            }
            Ok(right.with_number(r * l / 100.0))
        }
        BinaryOp::Add | BinaryOp::Sub => {
            let sign = if op == BinaryOp::Add { 1.0 } else { -1.0 };

            if is_percent(right) && !is_percent(left) {
                return Ok(left.with_number(l * (1.0 + sign * r / 100.0)));
            }
            if is_date(left) && right.value_type() == ValueType::Time {
                let seconds = units::convert(r, &resolve_unit(right.unit())?, &resolve_unit("second")?, ctx)?;
                return Ok(left.with_number(l + sign * seconds));
            }
            if is_date(left) && is_date(right) && op == BinaryOp::Sub {
                return Ok(CalculatorValue::new(l - r, "second", ValueType::Time));
            }
            if is_date(left) || is_date(right) {
                return Err(incompatible(left, right));
            }

            match (is_plain(left), is_plain(right)) {
                (true, true) => Ok(CalculatorValue::number(l + sign * r)),
                (false, true) => Ok(left.with_number(l + sign * r)),
                (true, false) => Ok(right.with_number(l + sign * r)),
                (false, false) => {
                    let r = align_units(left, right, ctx)?;
                    Ok(left.with_number(l + sign * r))
                }
            }
        }
        BinaryOp::Mul => {
            if is_percent(right) && !is_percent(left) {
                return Ok(left.with_number(l * r / 100.0));
            }
            if is_percent(left) && !is_percent(right) {
                return Ok(right.with_number(r * l / 100.0));
            }
            match (is_plain(left), is_plain(right)) {
                (true, true) => Ok(CalculatorValue::number(l * r)),
                (false, true) => Ok(left.with_number(l * r)),
                (true, false) => Ok(right.with_number(l * r)),
                (false, false) => Err(incompatible(left, right)),
            }
        }
        BinaryOp::Div => {
            if r == 0.0 {
                return Err(CalcError::DivisionByZero);
            }
            if is_percent(right) && !is_percent(left) {
                return Ok(left.with_number(l / (r / 100.0)));
            }
            match (is_plain(left), is_plain(right)) {
                (true, true) => Ok(CalculatorValue::number(l / r)),
                (false, true) => Ok(left.with_number(l / r)),
                (true, false) => Err(incompatible(left, right)),
                (false, false) => {
                    let r = align_units(left, right, ctx)?;
                    if r == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    Ok(CalculatorValue::number(l / r))
                }
            }
        }
        BinaryOp::Pow => {
            if !is_plain(left) {
                return Err(CalcError::domain("^", "cannot raise a value with a unit to a power"));
            }
            if !is_plain(right) {
                return Err(CalcError::domain("^", "exponent must be a plain number"));
            }
            Ok(CalculatorValue::number(l.powf(r)))
        }
    }
}

fn call(name: &str, args: &[CalculatorValue], ctx: &CalculatorContext) -> CalcResult<CalculatorValue> {
    if name == "now" {
        if !args.is_empty() {
            return Err(CalcError::argument_count(name, 0));
        }
        let seconds = Utc::now().timestamp_millis() as f64 / 1000.0;
        return Ok(CalculatorValue::new(seconds, ctx.timezone.clone(), ValueType::Date));
    }

    if !UNARY_FUNCTIONS.contains(&name) {
        return Err(CalcError::UnknownFunction {
            name: name.to_string(),
        });
    }
    let [arg] = args else {
        return Err(CalcError::argument_count(name, 1));
    };
    let x = arg.number_value();

    match name {
        "abs" => Ok(arg.with_number(x.abs())),
        "round" => Ok(arg.with_number(x.round())),
        "floor" => Ok(arg.with_number(x.floor())),
        "ceil" => Ok(arg.with_number(x.ceil())),
        "sqrt" => {
            if x < 0.0 {
                return Err(CalcError::domain(name, "cannot take square root of negative number"));
            }
            Ok(CalculatorValue::number(x.sqrt()))
        }
        "log" => Ok(CalculatorValue::number(x.log10())),
        "ln" => Ok(CalculatorValue::number(x.ln())),
        _ => {
            let radians = to_radians(arg, ctx)?;
            let result = match name {
                "sin" => radians.sin(),
                "cos" => radians.cos(),
                _ => radians.tan(),
            };
            Ok(CalculatorValue::number(result))
        }
    }
}

/// Magnitude in radians for trig functions; plain numbers are taken as radians.
fn to_radians(arg: &CalculatorValue, ctx: &CalculatorContext) -> CalcResult<f64> {
    if is_plain(arg) {
        return Ok(arg.number_value());
    }
    match units::lookup(arg.unit()) {
        Some(def) if def.category == UnitCategory::Angle => {
            units::convert(arg.number_value(), &def, &resolve_unit("radian")?, ctx)
        }
        _ => Err(CalcError::incompatible_units(arg.unit(), "radian")),
    }
}

fn convert_value(value: &CalculatorValue, target: &str, ctx: &CalculatorContext) -> CalcResult<CalculatorValue> {
    let to = resolve_unit(target)?;
    if is_plain(value) {
        return attach_unit(value, target);
    }
    let Some(from) = units::lookup(value.unit()).filter(|_| !is_percent(value) && !is_date(value)) else {
        return Err(CalcError::unsupported_conversion(value.unit(), to.symbol));
    };
    let converted = units::convert(value.number_value(), &from, &to, ctx)?;
    Ok(CalculatorValue::new(converted, to.symbol, to.category.value_type()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn eval_str(input: &str, ctx: &CalculatorContext) -> CalcResult<CalculatorValue> {
        evaluate(&parse_expression(input).unwrap(), ctx)
    }

    fn approx(input: &str, expected: f64) {
        let value = eval_str(input, &CalculatorContext::default()).unwrap();
        assert!(
            (value.number_value() - expected).abs() < 1e-6,
            "{} = {}, expected {}",
            input,
            value.number_value(),
            expected
        );
    }

    #[test]
    fn test_basic_arithmetic() {
        approx("2 + 2", 4.0);
        approx("3 * 4", 12.0);
        approx("10 / 2", 5.0);
        approx("2 ^ 3", 8.0);
        approx("2 + 3 * 4", 14.0);
        approx("(2 + 3) * 4", 20.0);
        approx("2 ^ 3 ^ 2", 512.0);
        approx("-2 ^ 2", -4.0);
    }

    #[test]
    fn test_functions() {
        approx("sqrt(16)", 4.0);
        approx("sin(0)", 0.0);
        approx("abs(-3)", 3.0);
        approx("log(1000)", 3.0);
        approx("ln(e)", 1.0);
        approx("round(2.5)", 3.0);
        approx("floor(2.7)", 2.0);
        approx("ceil(2.1)", 3.0);
        approx("cos(180 deg)", -1.0);
    }

    #[test]
    fn test_division_by_zero() {
        let err = eval_str("1 / 0", &CalculatorContext::default()).unwrap_err();
        assert_eq!(err.to_string(), "division by zero");
    }

    #[test]
    fn test_function_errors() {
        let ctx = CalculatorContext::default();
        assert_eq!(
            eval_str("sqrt(-1)", &ctx).unwrap_err().to_string(),
            "cannot take square root of negative number"
        );
        assert_eq!(eval_str("sqrt(1, 2)", &ctx).unwrap_err().to_string(), "sqrt requires 1 argument");
        assert_eq!(eval_str("frobnicate(1)", &ctx).unwrap_err().to_string(), "unknown function: frobnicate");
        assert_eq!(eval_str("ln(0)", &ctx).unwrap_err(), CalcError::NonFinite);
    }

    #[test]
    fn test_variables() {
        let ctx = CalculatorContext::default().with_variable("x", CalculatorValue::number(2.0));
        assert_eq!(eval_str("x * 10", &ctx).unwrap().number_value(), 20.0);
        assert_eq!(eval_str("y", &ctx).unwrap_err().to_string(), "undefined variable: y");
    }

    #[test]
    fn test_error_variable_propagates_message() {
        let ctx = CalculatorContext::default().with_variable("bad", CalculatorValue::error("division by zero"));
        let err = eval_str("bad + 1", &ctx).unwrap_err();
        assert_eq!(err.to_string(), "division by zero");
    }

    #[test]
    fn test_unit_literals_set_type() {
        let ctx = CalculatorContext::default();
        let money = eval_str("5 USD", &ctx).unwrap();
        assert_eq!(money.value_type(), ValueType::Currency);
        assert_eq!(money.unit(), "USD");

        let duration = eval_str("3 hours", &ctx).unwrap();
        assert_eq!(duration.value_type(), ValueType::Time);
        assert_eq!(duration.unit(), "hour");

        let temp = eval_str("20 C", &ctx).unwrap();
        assert_eq!(temp.value_type(), ValueType::Temperature);

        let length = eval_str("2 km", &ctx).unwrap();
        assert_eq!(length.value_type(), ValueType::Unit);
    }

    #[test]
    fn test_unit_arithmetic() {
        let ctx = CalculatorContext::default();
        let sum = eval_str("5 USD + 2", &ctx).unwrap();
        assert_eq!(sum.number_value(), 7.0);
        assert_eq!(sum.unit(), "USD");

        let ratio = eval_str("1 km / 250 m", &ctx).unwrap();
        assert_eq!(ratio.value_type(), ValueType::Number);
        assert!((ratio.number_value() - 4.0).abs() < 1e-9);

        let err = eval_str("1 kg + 1 m", &ctx).unwrap_err();
        assert_eq!(err.to_string(), "incompatible units: kg and m");

        assert!(eval_str("2 m * 3 m", &ctx).is_err());
    }

    #[test]
    fn test_conversions() {
        let ctx = CalculatorContext::default();
        let meters = eval_str("10 ft in m", &ctx).unwrap();
        assert!((meters.number_value() - 3.048).abs() < 1e-9);
        assert_eq!(meters.unit(), "m");

        let fahrenheit = eval_str("100 C to F", &ctx).unwrap();
        assert!((fahrenheit.number_value() - 212.0).abs() < 1e-9);
        assert_eq!(fahrenheit.value_type(), ValueType::Temperature);

        let px = eval_str("2 em in px", &ctx).unwrap();
        assert_eq!(px.number_value(), 32.0);

        let err = eval_str("5 kg in m", &ctx).unwrap_err();
        assert_eq!(err.to_string(), "unsupported unit conversion: kg to m");
    }

    #[test]
    fn test_conversion_keywords_are_interchangeable() {
        let ctx = CalculatorContext::default();
        for input in ["3 ft in inch", "3 ft to inch", "3 ft as inch"] {
            let inches = eval_str(input, &ctx).unwrap();
            assert!((inches.number_value() - 36.0).abs() < 1e-9, "{input}");
            assert_eq!(inches.unit(), "inch");
        }
    }

    #[test]
    fn test_trailing_in_means_inch() {
        let ctx = CalculatorContext::default();
        let length = eval_str("5 in", &ctx).unwrap();
        assert_eq!(length.unit(), "inch");
        assert_eq!(length.number_value(), 5.0);

        let sum = eval_str("1 ft + 6 in", &ctx).unwrap();
        assert!((sum.number_value() - 1.5).abs() < 1e-9);
        assert_eq!(sum.unit(), "ft");
    }

    #[test]
    fn test_non_finite_intermediate_is_error() {
        let ctx = CalculatorContext::default();
        assert_eq!(eval_str("1 / 10^400", &ctx).unwrap_err(), CalcError::NonFinite);
        assert_eq!(eval_str("10^400 * 0", &ctx).unwrap_err(), CalcError::NonFinite);
        assert_eq!(eval_str("1 / 1e400", &ctx).unwrap_err(), CalcError::NonFinite);
        assert_eq!(
            eval_str("1 / 10^400", &ctx).unwrap_err().to_string(),
            "result is not a finite number"
        );
    }

    #[test]
    fn test_plain_operand_is_named_in_unit_errors() {
        let ctx = CalculatorContext::default();
        let err = eval_str("2 / 3 m", &ctx).unwrap_err();
        assert_eq!(err.to_string(), "incompatible units: number and m");
    }

    #[test]
    fn test_date_minus_date_is_seconds() {
        let ctx = CalculatorContext::default();
        let elapsed = eval_str("now() - now()", &ctx).unwrap();
        assert_eq!(elapsed.value_type(), ValueType::Time);
        assert_eq!(elapsed.unit(), "second");
        assert!(elapsed.number_value().abs() < 1.0);

        let later = CalculatorValue::new(1_700_003_600.0, "UTC", ValueType::Date);
        let earlier = CalculatorValue::new(1_700_000_000.0, "UTC", ValueType::Date);
        let ctx = ctx.with_variable("later", later).with_variable("earlier", earlier);
        let hours = eval_str("later - earlier in hours", &ctx).unwrap();
        assert_eq!(hours.unit(), "hour");
        assert!((hours.number_value() - 1.0).abs() < 1e-9);

        assert!(eval_str("later + earlier", &ctx).is_err());
    }

    #[test]
    fn test_currency_conversion_with_rates() {
        let ctx = CalculatorContext::default()
            .with_variable("USD", CalculatorValue::number(1.0))
            .with_variable("EUR", CalculatorValue::number(0.9));
        let euros = eval_str("10 USD in EUR", &ctx).unwrap();
        assert!((euros.number_value() - 9.0).abs() < 1e-9);
        assert_eq!(euros.value_type(), ValueType::Currency);
        assert_eq!(euros.unit(), "EUR");
    }

    #[test]
    fn test_percentages() {
        let ctx = CalculatorContext::default();
        let pct = eval_str("15%", &ctx).unwrap();
        assert_eq!(pct.value_type(), ValueType::Percentage);
        assert_eq!(pct.unit(), "%");

        approx("20% of 50", 10.0);
        approx("100 + 10%", 110.0);
        approx("100 - 10%", 90.0);
        approx("200 * 5%", 10.0);

        let taxed = eval_str("40 USD + 25%", &ctx).unwrap();
        assert_eq!(taxed.number_value(), 50.0);
        assert_eq!(taxed.unit(), "USD");
    }

    #[test]
    fn test_now_is_date_in_context_timezone() {
        let ctx = CalculatorContext::new("Europe/Berlin", 96.0, 16.0);
        let now = eval_str("now()", &ctx).unwrap();
        assert_eq!(now.value_type(), ValueType::Date);
        assert_eq!(now.unit(), "Europe/Berlin");
        assert!(now.number_value() > 1_600_000_000.0);

        let later = eval_str("now() + 2 days", &ctx).unwrap();
        assert_eq!(later.value_type(), ValueType::Date);
        assert!(later.number_value() - now.number_value() >= 172_800.0 - 1.0);
    }
}
