use serde_json::Value;

use crate::{memory::aggregates::Accumulator, storage::StorageError};

/// Integer sums stay integral until a float shows up.
#[derive(Default)]
pub enum SumAcc {
    #[default]
    Empty,
    Int(i128),
    Float(f64),
}

impl Accumulator for SumAcc {
    fn update(&mut self, args: &[Value]) -> Result<(), StorageError> {
        let [v] = args else {
            return Err(StorageError::Evaluation("SUM takes one argument".into()));
        };
        let n = match v {
            Value::Null => return Ok(()),
            Value::Number(n) => n,
            other => return Err(StorageError::Evaluation(format!("SUM got non numeric value {other}"))),
        };
        *self = match (&*self, n.as_i64(), n.as_f64()) {
            (SumAcc::Empty, Some(i), _) => SumAcc::Int(i as i128),
            (SumAcc::Int(acc), Some(i), _) => SumAcc::Int(acc + i as i128),
            (SumAcc::Empty, None, Some(f)) => SumAcc::Float(f),
            (SumAcc::Int(acc), None, Some(f)) => SumAcc::Float(*acc as f64 + f),
            (SumAcc::Float(acc), _, Some(f)) => SumAcc::Float(acc + f),
            _ => return Err(StorageError::Evaluation(format!("SUM got non numeric value {n}"))),
        };
        Ok(())
    }

    fn finalize(&self) -> Value {
        match self {
            SumAcc::Empty => Value::Null,
            SumAcc::Int(i) => i64::try_from(*i).map(Value::from).unwrap_or_else(|_| float(*i as f64)),
            SumAcc::Float(f) => float(*f),
        }
    }
}

fn float(f: f64) -> Value {
    serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}
