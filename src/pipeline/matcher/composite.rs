use crate::{
    pipeline::{DataFrame, Field},
    TransformError,
};

use super::{parse_options, FieldMatcher, MatcherConfig, MatcherRegistry};

fn build_all(
    id: &str,
    options: &serde_json::Value,
    registry: &MatcherRegistry,
) -> Result<Vec<Box<dyn FieldMatcher>>, TransformError> {
    parse_options::<Vec<MatcherConfig>>(id, options)?
        .iter()
        .map(|c| registry.get(c))
        .collect()
}

/// Matches when every inner matcher matches, an empty list matches everything
#[derive(Debug)]
pub struct AllMatch(Vec<Box<dyn FieldMatcher>>);

impl AllMatch {
    pub fn build(
        options: &serde_json::Value,
        registry: &MatcherRegistry,
    ) -> Result<Box<dyn FieldMatcher>, TransformError> {
        Ok(Box::new(AllMatch(build_all("allMatch", options, registry)?)))
    }
}

impl FieldMatcher for AllMatch {
    fn matches(&self, field: &Field, frame: &DataFrame, frames: &[DataFrame]) -> bool {
        self.0.iter().all(|m| m.matches(field, frame, frames))
    }
}

/// Matches when at least one inner matcher matches
#[derive(Debug)]
pub struct AnyMatch(Vec<Box<dyn FieldMatcher>>);

impl AnyMatch {
    pub fn build(
        options: &serde_json::Value,
        registry: &MatcherRegistry,
    ) -> Result<Box<dyn FieldMatcher>, TransformError> {
        Ok(Box::new(AnyMatch(build_all("anyMatch", options, registry)?)))
    }
}

impl FieldMatcher for AnyMatch {
    fn matches(&self, field: &Field, frame: &DataFrame, frames: &[DataFrame]) -> bool {
        self.0.iter().any(|m| m.matches(field, frame, frames))
    }
}

#[derive(Debug)]
pub struct NotMatch(Box<dyn FieldMatcher>);

impl NotMatch {
    pub fn build(
        options: &serde_json::Value,
        registry: &MatcherRegistry,
    ) -> Result<Box<dyn FieldMatcher>, TransformError> {
        let inner: MatcherConfig = parse_options("notMatch", options)?;
        Ok(Box::new(NotMatch(registry.get(&inner)?)))
    }
}

impl FieldMatcher for NotMatch {
    fn matches(&self, field: &Field, frame: &DataFrame, frames: &[DataFrame]) -> bool {
        !self.0.matches(field, frame, frames)
    }
}

#[derive(Debug)]
pub struct Always(pub bool);

impl FieldMatcher for Always {
    fn matches(&self, _field: &Field, _frame: &DataFrame, _frames: &[DataFrame]) -> bool {
        self.0
    }
}
