use crate::{
    pipeline::{DataFrame, Field, FieldType},
    TransformError,
};

use super::{parse_options, FieldMatcher, MatcherRegistry};

#[derive(Debug)]
pub struct ByType(pub FieldType);

impl ByType {
    pub fn build(
        options: &serde_json::Value,
        _registry: &MatcherRegistry,
    ) -> Result<Box<dyn FieldMatcher>, TransformError> {
        Ok(Box::new(ByType(parse_options("byType", options)?)))
    }
}

impl FieldMatcher for ByType {
    fn matches(&self, field: &Field, _frame: &DataFrame, _frames: &[DataFrame]) -> bool {
        field.field_type == self.0
    }
}

/// The first field of its frame
#[derive(Debug)]
pub struct First;

impl FieldMatcher for First {
    fn matches(&self, field: &Field, frame: &DataFrame, _frames: &[DataFrame]) -> bool {
        frame
            .fields()
            .first()
            .map(|f| std::ptr::eq(f, field))
            .unwrap_or(false)
    }
}

/// The first time field of its frame
#[derive(Debug)]
pub struct FirstTimeField;

impl FieldMatcher for FirstTimeField {
    fn matches(&self, field: &Field, frame: &DataFrame, _frames: &[DataFrame]) -> bool {
        frame
            .time_field_index()
            .map(|idx| std::ptr::eq(&frame.fields()[idx], field))
            .unwrap_or(false)
    }
}
