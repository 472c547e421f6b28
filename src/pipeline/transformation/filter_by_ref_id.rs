use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    common::compile_regex,
    pipeline::{BuildContext, DataFrame, TransformError},
};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterByRefIdOptions {
    /// `A|B` keeps the frames of queries A and B, `/pattern/` is matched as a regex
    pub include: Option<String>,
}

impl TransformerOptions for FilterByRefIdOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        let include = match self.include.filter(|s| !s.is_empty()) {
            None => None,
            Some(p) if p.starts_with('/') => Some(RefIds::Pattern(compile_regex(&p)?)),
            Some(p) => Some(RefIds::Names(p.split('|').map(|s| s.trim().to_string()).collect())),
        };
        Ok(Box::new(FilterByRefId { include }))
    }
}

#[derive(Debug)]
enum RefIds {
    Names(HashSet<String>),
    Pattern(Regex),
}

#[derive(Debug)]
struct FilterByRefId {
    include: Option<RefIds>,
}

impl Transformation for FilterByRefId {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        let Some(include) = &self.include else {
            return Ok(frames.to_vec());
        };
        Ok(frames
            .iter()
            .filter(|f| match (include, f.ref_id.as_deref()) {
                (RefIds::Names(names), Some(ref_id)) => names.contains(ref_id),
                (RefIds::Pattern(re), Some(ref_id)) => re.is_match(ref_id),
                (_, None) => false,
            })
            .cloned()
            .collect())
    }

    fn dump(&self) -> String {
        format!("filter-by-ref-id {:?}", self.include)
    }
}
