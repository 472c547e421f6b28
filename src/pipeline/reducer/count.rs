use std::collections::HashSet;

use crate::Value;

use super::Reducer;

/// Number of non-null values, the only reducer that doesn't yield null on empty input
#[derive(Clone, Debug, Default)]
pub struct Count {
    count: usize,
}

impl Reducer for Count {
    fn feed(&mut self, _value: &Value) {
        self.count += 1;
    }

    fn get_result(&self) -> Value {
        self.count.into()
    }
}

#[derive(Clone, Debug, Default)]
pub struct DistinctCount {
    buckets: HashSet<Value>,
}

impl Reducer for DistinctCount {
    fn feed(&mut self, value: &Value) {
        self.buckets.insert(value.clone());
    }

    fn get_result(&self) -> Value {
        if self.buckets.is_empty() {
            Value::Null
        } else {
            self.buckets.len().into()
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ChangeCount {
    last: Option<Value>,
    changes: usize,
}

impl Reducer for ChangeCount {
    fn feed(&mut self, value: &Value) {
        if let Some(last) = &self.last {
            if last != value {
                self.changes += 1;
            }
        }
        self.last = Some(value.clone());
    }

    fn get_result(&self) -> Value {
        match self.last {
            Some(_) => self.changes.into(),
            None => Value::Null,
        }
    }
}
