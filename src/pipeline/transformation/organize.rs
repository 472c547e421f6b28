use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::pipeline::{BuildContext, DataFrame, Field, TransformError};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrganizeOptions {
    pub exclude_by_name: HashMap<String, bool>,
    pub index_by_name: HashMap<String, i64>,
    pub rename_by_name: HashMap<String, String>,
}

impl TransformerOptions for OrganizeOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        Ok(Box::new(Organize { options: self }))
    }
}

#[derive(Debug)]
struct Organize {
    options: OrganizeOptions,
}

impl Organize {
    fn lookup<'a, T>(map: &'a HashMap<String, T>, field: &Field) -> Option<&'a T> {
        map.get(field.display_name()).or_else(|| map.get(&field.name))
    }
}

impl Transformation for Organize {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        frames
            .iter()
            .map(|frame| {
                let mut fields: Vec<&Field> = frame
                    .fields()
                    .iter()
                    .filter(|f| !Self::lookup(&self.options.exclude_by_name, f).copied().unwrap_or(false))
                    .collect();
                // Stable, fields without an index go last
                fields.sort_by_key(|f| {
                    Self::lookup(&self.options.index_by_name, f)
                        .copied()
                        .unwrap_or(i64::MAX)
                });
                let fields = fields
                    .into_iter()
                    .map(|f| {
                        let mut out = f.clone();
                        if let Some(name) = Self::lookup(&self.options.rename_by_name, f) {
                            if !name.is_empty() {
                                out.config.display_name = Some(name.clone());
                            }
                        }
                        out
                    })
                    .collect();
                frame.with_fields(fields)
            })
            .collect()
    }

    fn dump(&self) -> String {
        format!(
            "organize exclude={} index={} rename={}",
            self.options.exclude_by_name.len(),
            self.options.index_by_name.len(),
            self.options.rename_by_name.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::transformation::test_utils::apply;

    #[test]
    fn test_organize() {
        let frames = vec![DataFrame::new(vec![
            Field::time("time", [1]),
            Field::number("a", [1.0]),
            Field::number("b", [2.0]),
            Field::number("c", [3.0]),
            Field::number("d", [4.0]),
        ])
        .unwrap()];
        let ret = apply(
            "organize",
            json!({
                "excludeByName": {"b": true, "d": false},
                "indexByName": {"c": 0, "time": 1},
                "renameByName": {"c": "Charlie"},
            }),
            &frames,
        );
        let names: Vec<_> = ret[0].fields().iter().map(|f| f.display_name()).collect();
        assert_eq!(names, vec!["Charlie", "time", "a", "d"]);
        assert_eq!(ret[0].fields()[0].name, "c");
    }
}
