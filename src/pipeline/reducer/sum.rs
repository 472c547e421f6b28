use crate::Value;

use super::Reducer;

#[derive(Clone, Debug, Default)]
pub struct Sum {
    sum: Option<f64>,
}

impl Reducer for Sum {
    fn feed(&mut self, value: &Value) {
        if let Some(v) = value.as_f64() {
            self.sum = Some(self.sum.unwrap_or_default() + v);
        }
    }

    fn get_result(&self) -> Value {
        self.sum.into()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Mean {
    sum: f64,
    count: usize,
}

impl Reducer for Mean {
    fn feed(&mut self, value: &Value) {
        if let Some(v) = value.as_f64() {
            self.sum += v;
            self.count += 1;
        }
    }

    fn get_result(&self) -> Value {
        if self.count == 0 {
            Value::Null
        } else {
            Value::Number(self.sum / self.count as f64)
        }
    }
}
