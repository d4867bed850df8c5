//! Vector literal codec
//!
//! Embeddings travel to the database as bracketed, comma-joined decimal
//! literals such as `[0.1,0.2,0.3]`.

use sqlvec_core::{Result, SqlvecError};

/// Format an embedding as a vector literal
///
/// Each element uses the shortest digits that parse back to the same `f32`,
/// written in plain positional notation with a decimal point, so `[1.0, 2.0]`
/// becomes `"[1.0,2.0]"` and `1e-7` becomes `0.0000001`.
pub fn format_vector(values: &[f32]) -> String {
    let mut out = String::with_capacity(values.len() * 10 + 2);
    out.push('[');
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_element(&mut out, *value);
    }
    out.push(']');
    out
}

fn push_element(out: &mut String, value: f32) {
    // Display never switches to exponent notation
    let text = value.to_string();
    let needs_point = value.is_finite() && !text.contains('.');
    out.push_str(&text);
    if needs_point {
        out.push_str(".0");
    }
}

/// Parse a vector literal produced by [`format_vector`] or returned by the database
pub fn parse_vector(literal: &str) -> Result<Vec<f32>> {
    let inner = literal
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| {
            SqlvecError::ValidationError(format!("Vector literal must be bracketed: {literal}"))
        })?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|item| {
            item.trim().parse::<f32>().map_err(|_| {
                SqlvecError::ValidationError(format!("Invalid vector element: {}", item.trim()))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_format_vector() {
        assert_eq!(format_vector(&[0.1, 0.2, 0.3]), "[0.1,0.2,0.3]");
        assert_eq!(format_vector(&[1.0, 2.0]), "[1.0,2.0]");
        assert_eq!(format_vector(&[-0.5]), "[-0.5]");
        assert_eq!(format_vector(&[]), "[]");
    }

    #[test]
    fn test_format_vector_extreme_magnitudes() {
        let literal = format_vector(&[1e-7, 1e20, 0.5, -0.0]);
        assert_eq!(literal, "[0.0000001,100000000000000000000.0,0.5,-0.0]");
        assert!(!literal.contains('e'));
        assert_eq!(parse_vector(&literal).unwrap(), vec![1e-7, 1e20, 0.5, -0.0]);
    }

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("[0.1,0.2,0.3]").unwrap(), vec![0.1, 0.2, 0.3]);
        assert_eq!(parse_vector(" [1, 2.5 ,-3] ").unwrap(), vec![1.0, 2.5, -3.0]);
        assert!(parse_vector("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_vector_rejects_malformed() {
        assert!(parse_vector("0.1,0.2").is_err());
        assert!(parse_vector("[0.1,abc]").is_err());
        assert!(parse_vector("[0.1,,0.2]").is_err());
    }

    proptest! {
        #[test]
        fn prop_format_parse_roundtrip(values in prop::collection::vec(
            prop::num::f32::NORMAL | prop::num::f32::ZERO | prop::num::f32::SUBNORMAL,
            0..64,
        )) {
            let literal = format_vector(&values);
            let inner = &literal[1..literal.len() - 1];
            prop_assert!(inner.is_empty() || inner.split(',').all(|item| item.contains('.')));
            prop_assert!(!literal.contains('e'));

            let parsed = parse_vector(&literal).unwrap();
            prop_assert_eq!(parsed, values);
        }
    }
}
