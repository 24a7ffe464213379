use std::cmp::Ordering;

use serde_json::Value;

pub struct Helpers;

impl Helpers {
    /// Hashable identity of a value tuple, used for grouping and DISTINCT.
    pub fn canonical_tuple(vals: &[Value]) -> String {
        serde_json::to_string(vals).unwrap_or_default()
    }

    /// Orders two non-null scalars of compatible kinds; `None` when the
    /// kinds cannot be compared.
    pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
            (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
                (Some(ix), Some(iy)) => Some(ix.cmp(&iy)),
                _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
            },
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            _ => None,
        }
    }

    /// Sort comparator. Nulls go last when `nulls_last`, first otherwise,
    /// whatever the direction.
    pub fn cmp_json_for_sort(a: &Value, b: &Value, ascending: bool, nulls_last: bool) -> Ordering {
        let ord = match (a, b) {
            (Value::Null, Value::Null) => return Ordering::Equal,
            (Value::Null, _) => return if nulls_last { Ordering::Greater } else { Ordering::Less },
            (_, Value::Null) => return if nulls_last { Ordering::Less } else { Ordering::Greater },
            _ => Self::compare_values(a, b)
                .unwrap_or_else(|| Self::type_rank(a).cmp(&Self::type_rank(b))),
        };
        if ascending { ord } else { ord.reverse() }
    }

    fn type_rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0, Value::Bool(_) => 1, Value::Number(_) => 2, Value::String(_) => 3,
            Value::Array(_) => 4, Value::Object(_) => 5
        }
    }

    /// Text form used by concatenation and `string_value`.
    pub fn to_text(v: &Value) -> Option<String> {
        match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            other => Some(other.to_string()),
        }
    }
}
