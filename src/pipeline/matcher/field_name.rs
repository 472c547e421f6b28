use regex::Regex;
use serde::Deserialize;

use crate::{common::compile_regex, pipeline::{DataFrame, Field}, TransformError};

use super::{parse_options, FieldMatcher, MatcherRegistry};

/// Exact match on the name or the display name
#[derive(Debug)]
pub struct ByName(pub String);

impl ByName {
    pub fn build(
        options: &serde_json::Value,
        _registry: &MatcherRegistry,
    ) -> Result<Box<dyn FieldMatcher>, TransformError> {
        Ok(Box::new(ByName(parse_options("byName", options)?)))
    }
}

impl FieldMatcher for ByName {
    fn matches(&self, field: &Field, _frame: &DataFrame, _frames: &[DataFrame]) -> bool {
        field.name == self.0 || field.display_name() == self.0
    }
}

#[derive(Debug, Deserialize)]
struct ByNamesOptions {
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    pattern: Option<String>,
}

/// Any of a list of names, or a pattern
#[derive(Debug)]
pub struct ByNames {
    names: Vec<String>,
    pattern: Option<Regex>,
}

impl ByNames {
    pub fn build(
        options: &serde_json::Value,
        _registry: &MatcherRegistry,
    ) -> Result<Box<dyn FieldMatcher>, TransformError> {
        let options: ByNamesOptions = parse_options("byNames", options)?;
        Ok(Box::new(ByNames {
            names: options.names,
            pattern: options.pattern.as_deref().map(compile_regex).transpose()?,
        }))
    }
}

impl FieldMatcher for ByNames {
    fn matches(&self, field: &Field, _frame: &DataFrame, _frames: &[DataFrame]) -> bool {
        let name = field.display_name();
        self.names.iter().any(|n| n == &field.name || n == name)
            || self
                .pattern
                .as_ref()
                .map(|re| re.is_match(name))
                .unwrap_or(false)
    }
}

/// Regular expression on the display name
#[derive(Debug)]
pub struct ByRegexp(pub Regex);

impl ByRegexp {
    pub fn build(
        options: &serde_json::Value,
        _registry: &MatcherRegistry,
    ) -> Result<Box<dyn FieldMatcher>, TransformError> {
        let pattern: String = parse_options("byRegexp", options)?;
        Ok(Box::new(ByRegexp(compile_regex(&pattern)?)))
    }
}

impl FieldMatcher for ByRegexp {
    fn matches(&self, field: &Field, _frame: &DataFrame, _frames: &[DataFrame]) -> bool {
        self.0.is_match(field.display_name())
    }
}
