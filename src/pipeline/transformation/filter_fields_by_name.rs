use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::pipeline::{
    BuildContext, DataFrame, FieldMatcher, MatcherConfig, TransformError,
};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterFieldsByNameOptions {
    pub include: Option<FieldNames>,
    pub exclude: Option<FieldNames>,
}

impl TransformerOptions for FilterFieldsByNameOptions {
    fn build(self, ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        let matcher = |names: Option<FieldNames>| {
            names
                .map(|n| ctx.matchers.get(&MatcherConfig::new("byNames", json!(n))))
                .transpose()
        };
        Ok(Box::new(FilterFieldsByName {
            include: matcher(self.include)?,
            exclude: matcher(self.exclude)?,
        }))
    }
}

#[derive(Debug)]
struct FilterFieldsByName {
    include: Option<Box<dyn FieldMatcher>>,
    exclude: Option<Box<dyn FieldMatcher>>,
}

impl Transformation for FilterFieldsByName {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        if self.include.is_none() && self.exclude.is_none() {
            return Ok(frames.to_vec());
        }
        let mut ret = vec![];
        for frame in frames {
            let fields: Vec<_> = frame
                .fields()
                .iter()
                .filter(|f| {
                    self.include
                        .as_ref()
                        .map(|m| m.matches(f, frame, frames))
                        .unwrap_or(true)
                        && !self
                            .exclude
                            .as_ref()
                            .map(|m| m.matches(f, frame, frames))
                            .unwrap_or(false)
                })
                .cloned()
                .collect();
            if !fields.is_empty() {
                ret.push(frame.with_fields(fields)?);
            }
        }
        Ok(ret)
    }

    fn dump(&self) -> String {
        format!(
            "filter-fields-by-name include={} exclude={}",
            self.include.is_some(),
            self.exclude.is_some()
        )
    }
}
