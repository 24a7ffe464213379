use crate::memory::IdType;

/// Per-table settings of the memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub id_type: IdType,
    /// Key holding the row id inside each document.
    pub id_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { id_type: IdType::default(), id_key: "id".to_string() }
    }
}

impl StoreConfig {
    pub fn new() -> Self { Self::default() }

    pub fn int(id_key: &str) -> Self {
        Self { id_type: IdType::Int, id_key: id_key.to_string() }
    }

    pub fn uuid(id_key: &str) -> Self {
        Self { id_type: IdType::Uuid, id_key: id_key.to_string() }
    }

    pub fn none(id_key: &str) -> Self {
        Self { id_type: IdType::None, id_key: id_key.to_string() }
    }
}
