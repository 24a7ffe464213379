use indexmap::IndexMap;
use serde_json::Value;

/// One result row: output label -> value, in projection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(pub IndexMap<String, Value>);

impl Row {
    pub fn get(&self, label: &str) -> Option<&Value> { self.0.get(label) }
    pub fn insert(&mut self, label: String, value: Value) { self.0.insert(label, value); }
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> { self.0.iter() }
    pub fn values(&self) -> impl Iterator<Item = &Value> { self.0.values() }
    pub fn first(&self) -> Option<&Value> { self.0.values().next() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn into_value(self) -> Value { Value::Object(self.0.into_iter().collect()) }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Row(iter.into_iter().collect())
    }
}
