use serde::{Deserialize, Serialize};

use crate::{
    pipeline::{reducer::reduce_values, DataFrame, Field, ReducerId},
    TransformError,
};

use super::{parse_options, FieldMatcher, MatcherRegistry};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOperator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
}

impl ComparisonOperator {
    pub fn compare(&self, left: f64, right: f64) -> bool {
        match self {
            ComparisonOperator::Gt => left > right,
            ComparisonOperator::Gte => left >= right,
            ComparisonOperator::Lt => left < right,
            ComparisonOperator::Lte => left <= right,
            ComparisonOperator::Eq => left == right,
            ComparisonOperator::Ne => left != right,
        }
    }
}

/// Selects numeric fields whose calculated value satisfies a comparison,
/// e.g. fields whose max is at least 10
#[derive(Debug, Deserialize)]
pub struct ByValue {
    reducer: ReducerId,
    op: ComparisonOperator,
    value: f64,
}

impl ByValue {
    pub fn build(
        options: &serde_json::Value,
        _registry: &MatcherRegistry,
    ) -> Result<Box<dyn FieldMatcher>, TransformError> {
        Ok(Box::new(parse_options::<ByValue>("byValue", options)?))
    }
}

impl FieldMatcher for ByValue {
    fn matches(&self, field: &Field, _frame: &DataFrame, _frames: &[DataFrame]) -> bool {
        if !field.field_type.is_numeric() {
            return false;
        }
        reduce_values(&field.values, self.reducer)
            .as_f64()
            .map(|v| self.op.compare(v, self.value))
            .unwrap_or(false)
    }
}
