use crate::Value;

use super::Reducer;

/// Cumulative increase, a drop is treated as a counter reset
#[derive(Clone, Debug, Default)]
pub struct Delta {
    previous: Option<f64>,
    delta: Option<f64>,
}

impl Reducer for Delta {
    fn feed(&mut self, value: &Value) {
        if let Some(v) = value.as_f64() {
            let delta = self.delta.unwrap_or_default();
            self.delta = Some(match self.previous {
                None => delta,
                Some(p) if v >= p => delta + (v - p),
                // Counter reset
                Some(_) => delta + v,
            });
            self.previous = Some(v);
        }
    }

    fn get_result(&self) -> Value {
        self.delta.into()
    }
}

/// Last value minus first value
#[derive(Clone, Debug, Default)]
pub struct Diff {
    first: Option<f64>,
    last: Option<f64>,
}

impl Reducer for Diff {
    fn feed(&mut self, value: &Value) {
        if let Some(v) = value.as_f64() {
            if self.first.is_none() {
                self.first = Some(v);
            }
            self.last = Some(v);
        }
    }

    fn get_result(&self) -> Value {
        match (self.first, self.last) {
            (Some(first), Some(last)) => Value::Number(last - first),
            _ => Value::Null,
        }
    }
}

/// Population variance, or standard deviation when `sqrt` is set
#[derive(Clone, Debug)]
pub struct Variance {
    count: usize,
    mean: f64,
    m2: f64,
    sqrt: bool,
}

impl Variance {
    pub fn new(sqrt: bool) -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            sqrt,
        }
    }
}

impl Reducer for Variance {
    fn feed(&mut self, value: &Value) {
        // Welford's online algorithm
        if let Some(v) = value.as_f64() {
            self.count += 1;
            let delta = v - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (v - self.mean);
        }
    }

    fn get_result(&self) -> Value {
        if self.count == 0 {
            return Value::Null;
        }
        let variance = self.m2 / self.count as f64;
        Value::Number(if self.sqrt { variance.sqrt() } else { variance })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Median {
    values: Vec<f64>,
}

impl Reducer for Median {
    fn feed(&mut self, value: &Value) {
        if let Some(v) = value.as_f64() {
            self.values.push(v);
        }
    }

    fn get_result(&self) -> Value {
        if self.values.is_empty() {
            return Value::Null;
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        Value::Number(if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        })
    }
}
