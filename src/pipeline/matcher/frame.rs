use regex::Regex;

use crate::{
    common::compile_regex,
    pipeline::{DataFrame, Field},
    TransformError,
};

use super::{parse_options, FieldMatcher, MatcherRegistry};

/// Fields of frames produced by a given query, `/pattern/` selects several queries
#[derive(Debug)]
pub enum ByFrameRefId {
    Exact(String),
    Pattern(Regex),
}

impl ByFrameRefId {
    pub fn build(
        options: &serde_json::Value,
        _registry: &MatcherRegistry,
    ) -> Result<Box<dyn FieldMatcher>, TransformError> {
        let ref_id: String = parse_options("byFrameRefID", options)?;
        Ok(Box::new(if ref_id.starts_with('/') {
            ByFrameRefId::Pattern(compile_regex(&ref_id)?)
        } else {
            ByFrameRefId::Exact(ref_id)
        }))
    }
}

impl FieldMatcher for ByFrameRefId {
    fn matches(&self, _field: &Field, frame: &DataFrame, _frames: &[DataFrame]) -> bool {
        match (self, frame.ref_id.as_deref()) {
            (ByFrameRefId::Exact(id), Some(ref_id)) => id == ref_id,
            (ByFrameRefId::Pattern(re), Some(ref_id)) => re.is_match(ref_id),
            (_, None) => false,
        }
    }
}
