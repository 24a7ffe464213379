use serde_json::Value;

use crate::{memory::aggregates::Accumulator, storage::StorageError};

#[derive(Default)]
pub struct CountAcc {
    cnt: i64,
}

impl Accumulator for CountAcc {
    fn update(&mut self, args: &[Value]) -> Result<(), StorageError> {
        match args {
            [] => self.cnt += 1,
            [Value::Null] => {}
            [_] => self.cnt += 1,
            _ => return Err(StorageError::Evaluation("COUNT takes one argument".into())),
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        Value::from(self.cnt)
    }
}
