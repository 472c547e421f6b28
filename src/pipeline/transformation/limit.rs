use serde::{Deserialize, Serialize};

use crate::pipeline::{BuildContext, DataFrame, TransformError};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LimitOptions {
    pub limit_field: usize,
}

impl Default for LimitOptions {
    fn default() -> Self {
        Self { limit_field: 10 }
    }
}

impl TransformerOptions for LimitOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        Ok(Box::new(Limit {
            count: self.limit_field,
        }))
    }
}

#[derive(Clone, Debug)]
struct Limit {
    count: usize,
}

impl Transformation for Limit {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        Ok(frames
            .iter()
            .map(|f| {
                if f.len() <= self.count {
                    f.clone()
                } else {
                    f.take_rows(&(0..self.count).collect::<Vec<_>>())
                }
            })
            .collect())
    }

    fn dump(&self) -> String {
        format!("limit {}", self.count)
    }
}
