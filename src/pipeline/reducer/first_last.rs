use crate::Value;

use super::Reducer;

#[derive(Clone, Debug)]
pub struct First {
    first: Option<Value>,
    include_nulls: bool,
}

impl First {
    pub fn new(include_nulls: bool) -> Self {
        Self {
            first: None,
            include_nulls,
        }
    }
}

impl Reducer for First {
    fn feed(&mut self, value: &Value) {
        if self.first.is_none() {
            self.first = Some(value.clone());
        }
    }

    fn get_result(&self) -> Value {
        self.first.clone().unwrap_or_default()
    }

    fn includes_nulls(&self) -> bool {
        self.include_nulls
    }
}

#[derive(Clone, Debug)]
pub struct Last {
    last: Option<Value>,
    include_nulls: bool,
}

impl Last {
    pub fn new(include_nulls: bool) -> Self {
        Self {
            last: None,
            include_nulls,
        }
    }
}

impl Reducer for Last {
    fn feed(&mut self, value: &Value) {
        self.last = Some(value.clone());
    }

    fn get_result(&self) -> Value {
        self.last.clone().unwrap_or_default()
    }

    fn includes_nulls(&self) -> bool {
        self.include_nulls
    }
}
