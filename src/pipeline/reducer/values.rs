use std::collections::HashSet;

use crate::Value;

use super::Reducer;

/// Collect values into an array, optionally only the first appearance of each value
#[derive(Clone, Debug)]
pub struct AllValues {
    values: Vec<Value>,
    seen: HashSet<Value>,
    unique: bool,
}

impl AllValues {
    pub fn new(unique: bool) -> Self {
        Self {
            values: vec![],
            seen: HashSet::new(),
            unique,
        }
    }
}

impl Reducer for AllValues {
    fn feed(&mut self, value: &Value) {
        if !self.unique || self.seen.insert(value.clone()) {
            self.values.push(value.clone());
        }
    }

    fn get_result(&self) -> Value {
        if self.values.is_empty() {
            return Value::Null;
        }
        Value::Other(serde_json::Value::Array(
            self.values.iter().cloned().map(Into::into).collect(),
        ))
    }
}
