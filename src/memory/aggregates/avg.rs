use serde_json::Value;

use crate::{memory::aggregates::Accumulator, storage::StorageError};

#[derive(Default)]
pub struct AvgAcc {
    sum: f64,
    cnt: i64,
}

impl Accumulator for AvgAcc {
    fn update(&mut self, args: &[Value]) -> Result<(), StorageError> {
        let [v] = args else {
            return Err(StorageError::Evaluation("AVG takes one argument".into()));
        };
        match v {
            Value::Null => {}
            Value::Number(n) => {
                let f = n.as_f64().ok_or_else(|| StorageError::Evaluation("AVG got non numeric number".into()))?;
                self.sum += f;
                self.cnt += 1;
            }
            other => return Err(StorageError::Evaluation(format!("AVG got non numeric value {other}"))),
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        if self.cnt == 0 {
            return Value::Null;
        }
        serde_json::Number::from_f64(self.sum / self.cnt as f64).map(Value::Number).unwrap_or(Value::Null)
    }
}
