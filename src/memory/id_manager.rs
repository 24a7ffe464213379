use std::fmt::Display;

use serde_json::Value;
use uuid::Uuid;

use crate::memory::IdType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdValue {
    Uuid(String),
    Int(i64),
}

impl IdValue {
    pub fn to_json(&self) -> Value {
        match self {
            IdValue::Uuid(s) => Value::String(s.clone()),
            IdValue::Int(i) => Value::from(*i),
        }
    }
}

impl Display for IdValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdValue::Uuid(uuid) => f.write_str(uuid),
            IdValue::Int(id) => write!(f, "{id}"),
        }
    }
}

/// Id generator of one table. Yields nothing for `IdType::None`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IdManager {
    pub id_type: IdType,
    pub current: Option<IdValue>,
}

impl IdManager {
    pub fn new(id_type: IdType) -> Self {
        Self { id_type, current: None }
    }

    /// Records a caller-supplied id so generated ids never collide with it.
    pub fn observe(&mut self, value: &Value) {
        if self.id_type != IdType::Int {
            return;
        }
        let Some(seen) = value.as_i64() else { return };
        match self.current {
            Some(IdValue::Int(cur)) if cur >= seen => {}
            _ => self.current = Some(IdValue::Int(seen)),
        }
    }
}

impl Iterator for IdManager {
    type Item = IdValue;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match (&self.id_type, &self.current) {
            (IdType::None, _) => return None,
            (IdType::Int, Some(IdValue::Int(id))) => IdValue::Int(id.checked_add(1)?),
            (IdType::Int, _) => IdValue::Int(1),
            (IdType::Uuid, _) => IdValue::Uuid(Uuid::new_v4().to_string()),
        };
        self.current = Some(item.clone());
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_ids_continue_after_observed_values() {
        let mut ids = IdManager::new(IdType::Int);
        assert_eq!(ids.next(), Some(IdValue::Int(1)));
        ids.observe(&json!(10));
        ids.observe(&json!(3));
        assert_eq!(ids.next(), Some(IdValue::Int(11)));
    }

    #[test]
    fn none_generates_nothing() {
        let mut ids = IdManager::new(IdType::None);
        assert_eq!(ids.next(), None);
    }

    #[test]
    fn uuid_ids_are_distinct_strings() {
        let mut ids = IdManager::new(IdType::Uuid);
        let (a, b) = (ids.next().unwrap(), ids.next().unwrap());
        assert_ne!(a, b);
        assert!(a.to_json().is_string());
    }
}
