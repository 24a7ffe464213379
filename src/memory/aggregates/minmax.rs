use std::cmp::Ordering;

use serde_json::Value;

use crate::{
    memory::{aggregates::Accumulator, helpers::Helpers},
    storage::StorageError,
};

pub struct ExtremaAcc {
    keep: Ordering,
    current: Option<Value>,
}

impl ExtremaAcc {
    pub fn min() -> Self { Self { keep: Ordering::Less, current: None } }

    pub fn max() -> Self { Self { keep: Ordering::Greater, current: None } }
}

impl Accumulator for ExtremaAcc {
    fn update(&mut self, args: &[Value]) -> Result<(), StorageError> {
        let [v] = args else {
            return Err(StorageError::Evaluation("MIN/MAX takes one argument".into()));
        };
        if v.is_null() {
            return Ok(());
        }
        match &self.current {
            None => self.current = Some(v.clone()),
            Some(cur) => {
                let ord = Helpers::compare_values(v, cur)
                    .ok_or_else(|| StorageError::Evaluation(format!("MIN/MAX cannot compare {v} with {cur}")))?;
                if ord == self.keep {
                    self.current = Some(v.clone());
                }
            }
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        self.current.clone().unwrap_or(Value::Null)
    }
}
