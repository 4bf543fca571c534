//! Scalar result formatting.

use crate::store::ScalarValue;

/// Render a scalar query result for display.
///
/// Absent values render as `"0"`; integral floats drop the decimal point;
/// other floats round to two decimal places. Every value shape has a total
/// rendering, so formatting can never fail a request.
pub fn format_scalar(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Null => "0".to_string(),
        ScalarValue::Integer(n) => n.to_string(),
        ScalarValue::Real(x) => format_real(*x),
        ScalarValue::Text(s) => s.clone(),
    }
}

fn format_real(x: f64) -> String {
    if !x.is_finite() {
        return x.to_string();
    }
    if x.fract() == 0.0 {
        return format!("{x:.0}");
    }
    ((x * 100.0).round() / 100.0).to_string()
}
