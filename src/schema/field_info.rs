use serde_json::Value;

use crate::schema::JsonPrimitive;

/// Inferred type and nullability of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub ty: JsonPrimitive,
    pub nullable: bool,
}

impl FieldInfo {
    pub fn infer(value: &Value) -> FieldInfo {
        let ty = JsonPrimitive::of_value(value);
        FieldInfo { ty, nullable: ty == JsonPrimitive::Null }
    }

    pub fn merge(&self, new: &FieldInfo) -> FieldInfo {
        FieldInfo {
            ty: JsonPrimitive::promote(self.ty, new.ty),
            nullable: self.nullable || new.nullable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_then_float_promotes() {
        let a = FieldInfo::infer(&json!(1));
        let b = FieldInfo::infer(&json!(1.5));
        let c = a.merge(&b);
        assert_eq!(c.ty, JsonPrimitive::Float);
        assert!(!c.nullable);
    }

    #[test]
    fn null_observation_marks_nullable_and_keeps_type() {
        let a = FieldInfo::infer(&json!("x"));
        let c = a.merge(&FieldInfo::infer(&json!(null)));
        assert_eq!(c.ty, JsonPrimitive::String);
        assert!(c.nullable);
    }
}
