//! CSV rendering of observation values.
//!
//! Strings are wrapped in double quotes without escaping, null becomes an
//! empty cell and numbers/booleans use their plain text form.

use crate::observation::ObservationValue;

/// Render a single value as a CSV cell
pub fn format_value(value: &ObservationValue) -> String {
    match value {
        ObservationValue::Null => String::new(),
        ObservationValue::Text(text) => quote(text),
        ObservationValue::Number(number) => number.to_string(),
        ObservationValue::Bool(flag) => flag.to_string(),
    }
}

/// Wrap text in double quotes
pub fn quote(text: &str) -> String {
    format!("\"{text}\"")
}

/// Comma-join formatted values
pub fn format_row<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a ObservationValue>,
{
    values
        .into_iter()
        .map(format_value)
        .collect::<Vec<_>>()
        .join(",")
}

/// Comma-join header names; headers are strings, so every cell is quoted
pub fn format_header_row(headers: &[String]) -> String {
    headers
        .iter()
        .map(|header| quote(header))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Number;

    #[test]
    fn test_format_null() {
        assert_eq!(format_value(&ObservationValue::Null), "");
    }

    #[test]
    fn test_format_text_is_quoted() {
        assert_eq!(format_value(&ObservationValue::from("x")), "\"x\"");
    }

    #[test]
    fn test_format_text_is_not_escaped() {
        assert_eq!(
            format_value(&ObservationValue::from("say \"hi\"")),
            "\"say \"hi\"\""
        );
    }

    #[test]
    fn test_format_numbers() {
        assert_eq!(format_value(&ObservationValue::from(42)), "42");
        assert_eq!(format_value(&ObservationValue::from(-7)), "-7");

        let float = Number::from_f64(24.5).unwrap();
        assert_eq!(format_value(&ObservationValue::Number(float)), "24.5");
    }

    #[test]
    fn test_format_booleans() {
        assert_eq!(format_value(&ObservationValue::from(true)), "true");
        assert_eq!(format_value(&ObservationValue::from(false)), "false");
    }

    #[test]
    fn test_format_row_keeps_empty_cells() {
        let values = vec![
            ObservationValue::from("x"),
            ObservationValue::Null,
            ObservationValue::from(1),
            ObservationValue::Null,
        ];
        assert_eq!(format_row(&values), "\"x\",,1,");
    }

    #[test]
    fn test_format_header_row() {
        let headers = vec!["a".to_string(), "b".to_string()];
        assert_eq!(format_header_row(&headers), "\"a\",\"b\"");
        assert_eq!(format_header_row(&[]), "");
    }
}
