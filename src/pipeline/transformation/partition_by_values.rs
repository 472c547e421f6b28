use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::{BuildContext, DataFrame, TransformError, Value};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartitionNaming {
    /// Keep the frame name, the partition values are only set as labels
    pub as_labels: bool,
    /// Append the partition values to the original frame name instead of replacing it
    pub append: bool,
}

impl Default for PartitionNaming {
    fn default() -> Self {
        Self {
            as_labels: true,
            append: false,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartitionByValuesOptions {
    pub fields: Vec<String>,
    /// Keep the partition fields in the output frames
    pub keep_fields: bool,
    pub naming: PartitionNaming,
}

impl TransformerOptions for PartitionByValuesOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        Ok(Box::new(PartitionByValues { options: self }))
    }
}

#[derive(Debug)]
struct PartitionByValues {
    options: PartitionByValuesOptions,
}

impl PartitionByValues {
    fn partition(&self, frame: &DataFrame) -> Result<Vec<DataFrame>, TransformError> {
        let indices: Option<Vec<usize>> = self
            .options
            .fields
            .iter()
            .map(|name| frame.field_index(name))
            .collect();
        let indices = match indices {
            Some(indices) if !indices.is_empty() => indices,
            _ => {
                debug!("Frame lacks some partition fields, passed through");
                return Ok(vec![frame.clone()]);
            }
        };

        // Partitions in the order their first row appears
        let mut keys: Vec<Vec<Value>> = vec![];
        let mut rows: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
        for row in 0..frame.len() {
            let key: Vec<Value> = indices
                .iter()
                .map(|&idx| frame.fields()[idx].get(row).clone())
                .collect();
            rows.entry(key.clone())
                .or_insert_with(|| {
                    keys.push(key);
                    vec![]
                })
                .push(row);
        }

        keys.into_iter()
            .map(|key| {
                let part = frame.take_rows(&rows[&key]);
                let labels: Vec<(String, String)> = indices
                    .iter()
                    .zip(&key)
                    .map(|(&idx, v)| (frame.fields()[idx].name.clone(), v.to_display_string()))
                    .collect();
                let fields = part
                    .fields()
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| self.options.keep_fields || !indices.contains(idx))
                    .map(|(_, f)| {
                        let mut f = f.clone();
                        f.labels.extend(labels.iter().cloned());
                        f
                    })
                    .collect();
                let mut ret = part.with_fields(fields)?;
                if !self.options.naming.as_labels {
                    let suffix = key
                        .iter()
                        .map(Value::to_display_string)
                        .collect::<Vec<_>>()
                        .join(" ");
                    ret.name = Some(match (&frame.name, self.options.naming.append) {
                        (Some(name), true) => format!("{} {}", name, suffix),
                        _ => suffix,
                    });
                }
                Ok(ret)
            })
            .collect()
    }
}

impl Transformation for PartitionByValues {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        let mut ret = vec![];
        for frame in frames {
            ret.extend(self.partition(frame)?);
        }
        Ok(ret)
    }

    fn dump(&self) -> String {
        format!("partition-by-values {}", self.options.fields.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::{
        transformation::test_utils::{apply, values},
        Field,
    };

    fn frames() -> Vec<DataFrame> {
        vec![DataFrame::new(vec![
            Field::time("time", [1, 2, 3, 4, 5]),
            Field::string("region", ["eu", "us", "eu", "ap", "us"]),
            Field::string("tier", ["a", "a", "a", "b", "b"]),
            Field::number("value", [1.0, 2.0, 3.0, 4.0, 5.0]),
        ])
        .unwrap()
        .named("load")]
    }

    #[test]
    fn test_partition_rows() {
        let input = frames();
        let ret = apply("partitionByValues", json!({"fields": ["region"]}), &input);
        assert_eq!(ret.len(), 3);
        assert_eq!(values(&ret[0], "time"), json!([1, 3]));
        assert_eq!(values(&ret[1], "time"), json!([2, 5]));
        assert_eq!(values(&ret[2], "time"), json!([4]));
        assert!(ret[0].field("region").is_none());
        assert_eq!(ret[0].name.as_deref(), Some("load"));
        assert_eq!(ret[1].fields()[0].labels.get("region").map(String::as_str), Some("us"));

        // Every input row appears exactly once
        let mut times: Vec<i64> = ret
            .iter()
            .flat_map(|f| f.field("time").unwrap().values.iter().map(|v| v.as_f64().unwrap() as i64))
            .collect();
        times.sort();
        assert_eq!(times, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_multiple_fields_and_naming() {
        let ret = apply(
            "partitionByValues",
            json!({"fields": ["region", "tier"], "keepFields": true, "naming": {"asLabels": false, "append": true}}),
            &frames(),
        );
        let names: Vec<_> = ret.iter().map(|f| f.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["load eu a", "load us a", "load ap b", "load us b"]);
        for frame in &ret {
            let region = &frame.field("region").unwrap().values;
            assert!(region.iter().all(|v| v == &region[0]));
        }
    }

    #[test]
    fn test_missing_field_passes_through() {
        let input = frames();
        assert_eq!(apply("partitionByValues", json!({"fields": ["zone"]}), &input), input);
        assert_eq!(apply("partitionByValues", json!({}), &input), input);
    }

    #[test]
    fn test_existing_labels_are_kept() {
        let input = vec![DataFrame::new(vec![
            Field::string("region", ["eu", "us"]),
            Field::number("value", [1.0, 2.0]).with_labels([("host", "h1")]),
        ])
        .unwrap()];
        let ret = apply("partitionByValues", json!({"fields": ["region"]}), &input);
        let labels = &ret[0].field("value").unwrap().labels;
        assert_eq!(labels.get("host").map(String::as_str), Some("h1"));
        assert_eq!(labels.get("region").map(String::as_str), Some("eu"));
    }
}
