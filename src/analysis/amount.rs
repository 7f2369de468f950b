use crate::models::settings::DecimalConvention;
use serde_json::Value;

/// Normalize a stored or typed amount into a finite number. Never fails; anything
/// unreadable is 0.
///
/// Strings lose whitespace and currency symbols first. Under `Auto` a lone comma
/// is taken as the decimal point, so `"1,234"` reads as 1.234 rather than 1234.
/// Use `Dot` when amounts are entered with thousands separators.
pub fn parse_amount(value: &Value, convention: DecimalConvention) -> f64 {
    match value {
        Value::Number(number) => finite_or_zero(number.as_f64().unwrap_or(0.0)),
        Value::String(raw) => parse_amount_str(raw, convention),
        _ => 0.0,
    }
}

pub fn parse_amount_str(raw: &str, convention: DecimalConvention) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    if cleaned.is_empty() {
        return 0.0;
    }

    let normalized = match convention {
        DecimalConvention::Auto if !cleaned.contains('.') => cleaned.replace(',', "."),
        _ => cleaned.replace(',', ""),
    };

    normalized
        .parse::<f64>()
        .map(finite_or_zero)
        .unwrap_or(0.0)
}

/// Round to two decimals. Magnitudes too large to scale have no cents left
/// and come back unchanged; non-finite input reads as 0.
pub fn round_cents(value: f64) -> f64 {
    let scaled = value * 100.0;
    if !scaled.is_finite() {
        return finite_or_zero(value);
    }
    scaled.round() / 100.0
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rounding_huge_amounts_stays_finite() {
        assert_eq!(round_cents(1e307), 1e307);
        assert_eq!(round_cents(f64::INFINITY), 0.0);
        assert_eq!(round_cents(f64::NAN), 0.0);
        assert_eq!(round_cents(10.005_f64 + 0.001), 10.01);
    }

    #[test]
    fn unreadable_input_is_zero() {
        assert_eq!(parse_amount(&json!("abc"), DecimalConvention::Auto), 0.0);
        assert_eq!(parse_amount(&Value::Null, DecimalConvention::Auto), 0.0);
        assert_eq!(parse_amount(&json!(true), DecimalConvention::Auto), 0.0);
        assert_eq!(parse_amount(&json!("1.2.3"), DecimalConvention::Auto), 0.0);
        assert_eq!(parse_amount(&json!(""), DecimalConvention::Dot), 0.0);
    }

    #[test]
    fn currency_strings_with_both_separators_keep_the_dot_as_decimal() {
        assert_eq!(parse_amount(&json!("$1,234.50"), DecimalConvention::Auto), 1234.5);
        assert_eq!(parse_amount(&json!(" $ 99 "), DecimalConvention::Auto), 99.0);
        assert_eq!(parse_amount(&json!(42.25), DecimalConvention::Auto), 42.25);
    }

    #[test]
    fn lone_comma_depends_on_convention() {
        assert_eq!(parse_amount_str("12,50 €", DecimalConvention::Auto), 12.5);
        assert_eq!(parse_amount_str("1,234", DecimalConvention::Auto), 1.234);
        assert_eq!(parse_amount_str("1,234", DecimalConvention::Dot), 1234.0);
    }

    #[test]
    fn rounds_to_cents() {
        assert_eq!(round_cents(33.333_333), 33.33);
        assert_eq!(round_cents(0.125), 0.13);
    }
}
