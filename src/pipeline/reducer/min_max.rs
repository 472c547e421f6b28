use crate::Value;

use super::Reducer;

#[derive(Clone, Debug, Default)]
pub struct Min {
    min: Option<f64>,
}

impl Reducer for Min {
    fn feed(&mut self, value: &Value) {
        if let Some(v) = value.as_f64() {
            self.min = Some(self.min.map_or(v, |m| m.min(v)));
        }
    }

    fn get_result(&self) -> Value {
        self.min.into()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Max {
    max: Option<f64>,
}

impl Reducer for Max {
    fn feed(&mut self, value: &Value) {
        if let Some(v) = value.as_f64() {
            self.max = Some(self.max.map_or(v, |m| m.max(v)));
        }
    }

    fn get_result(&self) -> Value {
        self.max.into()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Range {
    min: Min,
    max: Max,
}

impl Reducer for Range {
    fn feed(&mut self, value: &Value) {
        self.min.feed(value);
        self.max.feed(value);
    }

    fn get_result(&self) -> Value {
        match (self.min.min, self.max.max) {
            (Some(min), Some(max)) => Value::Number(max - min),
            _ => Value::Null,
        }
    }
}
