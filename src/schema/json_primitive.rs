use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coarse type of a stored column value, as inferred from row documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsonPrimitive {
    Null,
    Bool,
    Int,
    Float,
    String,
    /// Nested documents and arrays are stored but never compared.
    Object,
    Array,
}

impl JsonPrimitive {
    pub fn of_value(v: &Value) -> JsonPrimitive {
        match v {
            Value::Null => JsonPrimitive::Null,
            Value::Bool(_) => JsonPrimitive::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => JsonPrimitive::Int,
            Value::Number(_) => JsonPrimitive::Float,
            Value::String(_) => JsonPrimitive::String,
            Value::Array(_) => JsonPrimitive::Array,
            Value::Object(_) => JsonPrimitive::Object,
        }
    }

    /// Common type of two observations of the same column.
    ///
    /// `Int` and `Float` widen to `Float`; `Null` yields to the other side;
    /// any other disagreement keeps the type seen first.
    pub fn promote(a: JsonPrimitive, b: JsonPrimitive) -> JsonPrimitive {
        use JsonPrimitive::*;
        match (a, b) {
            _ if a == b => a,
            (Int, Float) | (Float, Int) => Float,
            (Null, other) => other,
            (first, _) => first,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, JsonPrimitive::Int | JsonPrimitive::Float)
    }
}

#[cfg(test)]
mod tests {
    use super::JsonPrimitive::{self, *};
    use serde_json::json;

    #[test]
    fn classifies_numbers_by_representation() {
        assert_eq!(JsonPrimitive::of_value(&json!(3)), Int);
        assert_eq!(JsonPrimitive::of_value(&json!(3.5)), Float);
        assert_eq!(JsonPrimitive::of_value(&json!(null)), Null);
    }

    #[test]
    fn promotion_widens_numbers_and_skips_null() {
        assert_eq!(JsonPrimitive::promote(Int, Float), Float);
        assert_eq!(JsonPrimitive::promote(Null, String), String);
        assert_eq!(JsonPrimitive::promote(String, Bool), String);
    }
}
