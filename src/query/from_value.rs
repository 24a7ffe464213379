use serde_json::Value;

use crate::query::ProjectionError;

/// Conversion of one row value into a projected Rust value.
pub trait FromValue: Sized + Send + 'static {
    fn from_value(label: &str, value: &Value) -> Result<Self, ProjectionError>;
}

fn mismatch<T>(label: &str, expected: &'static str, value: &Value) -> Result<T, ProjectionError> {
    match value {
        Value::Null => Err(ProjectionError::UnexpectedNull { label: label.to_string() }),
        other => Err(ProjectionError::TypeMismatch { label: label.to_string(), expected, found: other.clone() }),
    }
}

impl FromValue for i64 {
    fn from_value(label: &str, value: &Value) -> Result<Self, ProjectionError> {
        match value.as_i64() {
            Some(i) => Ok(i),
            // whole floats come back from SUM/AVG over integral columns
            None => match value.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
                _ => mismatch(label, "integer", value),
            },
        }
    }
}

impl FromValue for f64 {
    fn from_value(label: &str, value: &Value) -> Result<Self, ProjectionError> {
        value.as_f64().map_or_else(|| mismatch(label, "number", value), Ok)
    }
}

impl FromValue for String {
    fn from_value(label: &str, value: &Value) -> Result<Self, ProjectionError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => mismatch(label, "string", other),
        }
    }
}

impl FromValue for bool {
    fn from_value(label: &str, value: &Value) -> Result<Self, ProjectionError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => mismatch(label, "boolean", other),
        }
    }
}

impl FromValue for Value {
    fn from_value(_label: &str, value: &Value) -> Result<Self, ProjectionError> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(label: &str, value: &Value) -> Result<Self, ProjectionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(label, other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_needs_an_option() {
        assert!(matches!(i64::from_value("m.age", &Value::Null), Err(ProjectionError::UnexpectedNull { .. })));
        assert_eq!(Option::<i64>::from_value("m.age", &Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::from_value("m.age", &json!(3)).unwrap(), Some(3));
    }

    #[test]
    fn integral_floats_map_to_integers() {
        assert_eq!(i64::from_value("s", &json!(100.0)).unwrap(), 100);
        assert!(matches!(i64::from_value("s", &json!(2.5)), Err(ProjectionError::TypeMismatch { .. })));
    }

    #[test]
    fn strings_do_not_coerce() {
        assert!(matches!(String::from_value("x", &json!(1)), Err(ProjectionError::TypeMismatch { expected: "string", .. })));
    }
}
