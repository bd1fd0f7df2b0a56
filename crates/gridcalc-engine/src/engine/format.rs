//! Display formatting of computed values.
//!
//! Integral numbers print without decimals, other finite numbers with two.
//! Error values print their marker, e.g. `#DIV/0!`.

use super::cell::ComputedValue;

/// Format a computed value for display.
pub fn format_display(value: &ComputedValue) -> String {
    match value {
        ComputedValue::Empty => String::new(),
        ComputedValue::Number(n) => format_number(*n),
        ComputedValue::Text(s) => s.clone(),
        ComputedValue::Error(kind) => kind.marker().to_string(),
    }
}

/// Format a number for display: integers without decimals, anything else
/// to two decimal places.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "#NAN!".to_string()
    } else if n.is_infinite() {
        "#INF!".to_string()
    } else if n == 0.0 {
        // Avoid "-0".
        "0".to_string()
    } else if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        format!("{:.2}", n)
    }
}
