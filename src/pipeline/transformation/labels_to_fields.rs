use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::pipeline::{BuildContext, DataFrame, Field, TransformError};

use super::{merge::merge_frames, Transformation, TransformerOptions};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LabelsToFieldsMode {
    /// One field per label key, all frames merged into one table
    #[default]
    Columns,
    /// One `label`/`value` frame per labelled field
    Rows,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelsToFieldsOptions {
    pub mode: LabelsToFieldsMode,
    /// Only these label keys become fields, all of them when not set
    pub keep_labels: Option<Vec<String>>,
    /// The value of this label becomes the name of the field
    pub value_label: Option<String>,
}

impl TransformerOptions for LabelsToFieldsOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        Ok(Box::new(LabelsToFields { options: self }))
    }
}

#[derive(Debug)]
struct LabelsToFields {
    options: LabelsToFieldsOptions,
}

impl LabelsToFields {
    fn keeps(&self, key: &str) -> bool {
        self.options
            .keep_labels
            .as_ref()
            .map(|keys| keys.iter().any(|k| k == key))
            .unwrap_or(true)
    }

    fn to_columns(&self, frame: &DataFrame) -> Result<DataFrame, TransformError> {
        let mut label_fields = vec![];
        let mut seen = HashSet::new();
        let mut first_labelled = None;
        let mut fields = vec![];
        for field in frame.fields() {
            if field.labels.is_empty() {
                fields.push(field.clone());
                continue;
            }
            first_labelled.get_or_insert(fields.len());
            let mut out = field.clone();
            out.labels = Default::default();
            for (key, value) in &field.labels {
                if self.options.value_label.as_ref() == Some(key) {
                    out.name = value.clone();
                    out.config.display_name = None;
                } else if self.keeps(key) && seen.insert(key.clone()) {
                    label_fields.push(Field::string(key, std::iter::repeat(value.as_str()).take(frame.len())));
                }
            }
            fields.push(out);
        }
        // Label fields go in front of the first labelled field
        if let Some(at) = first_labelled {
            let rest = fields.split_off(at);
            fields.extend(label_fields);
            fields.extend(rest);
        }
        frame.with_fields(fields)
    }

    fn to_rows(&self, field: &Field) -> Result<DataFrame, TransformError> {
        let labels: Vec<(&String, &String)> = field.labels.iter().filter(|(k, _)| self.keeps(k)).collect();
        Ok(DataFrame::new(vec![
            Field::string("label", labels.iter().map(|(k, _)| k.as_str())),
            Field::string("value", labels.iter().map(|(_, v)| v.as_str())),
        ])?
        .named(field.display_name()))
    }
}

impl Transformation for LabelsToFields {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        match self.options.mode {
            LabelsToFieldsMode::Columns => {
                let converted = frames
                    .iter()
                    .map(|f| self.to_columns(f))
                    .collect::<Result<Vec<_>, _>>()?;
                if converted.len() < 2 {
                    return Ok(converted);
                }
                Ok(vec![merge_frames(&converted)?])
            }
            LabelsToFieldsMode::Rows => frames
                .iter()
                .flat_map(|f| f.fields())
                .filter(|f| !f.labels.is_empty())
                .map(|f| self.to_rows(f))
                .collect(),
        }
    }

    fn dump(&self) -> String {
        format!(
            "labels-to-fields {:?}{}",
            self.options.mode,
            self.options
                .value_label
                .as_ref()
                .map(|l| format!(" value={}", l))
                .unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::transformation::test_utils::{apply, values};

    fn series(server: &str, value: f64) -> DataFrame {
        DataFrame::new(vec![
            Field::time("Time", [1000]),
            Field::number("Value", [value]).with_labels([("Server", server), ("Datacenter", "EU")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_columns() {
        let frames = vec![series("A", 1.0), series("B", 2.0)];
        let ret = apply("labelsToFields", json!({}), &frames);
        assert_eq!(ret.len(), 1);
        let names: Vec<_> = ret[0].fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Time", "Datacenter", "Server", "Value"]);
        assert_eq!(values(&ret[0], "Server"), json!(["A", "B"]));
        assert_eq!(values(&ret[0], "Value"), json!([1, 2]));
        assert!(ret[0].fields().iter().all(|f| f.labels.is_empty()));
    }

    #[test]
    fn test_value_label() {
        let frames = vec![series("A", 1.0), series("B", 2.0)];
        let ret = apply("labelsToFields", json!({"valueLabel": "Server"}), &frames);
        let names: Vec<_> = ret[0].fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Time", "Datacenter", "A", "B"]);
        assert_eq!(ret[0].len(), 1);
        assert_eq!(values(&ret[0], "A"), json!([1]));
        assert_eq!(values(&ret[0], "B"), json!([2]));
    }

    #[test]
    fn test_keep_labels_and_rows() {
        let ret = apply("labelsToFields", json!({"keepLabels": ["Server"]}), &[series("A", 1.0)]);
        assert!(ret[0].field("Datacenter").is_none());
        assert_eq!(values(&ret[0], "Server"), json!(["A"]));

        let ret = apply("labelsToFields", json!({"mode": "rows"}), &[series("A", 1.0), series("B", 2.0)]);
        assert_eq!(ret.len(), 2);
        assert_eq!(ret[0].name.as_deref(), Some("Value"));
        assert_eq!(values(&ret[0], "label"), json!(["Datacenter", "Server"]));
        assert_eq!(values(&ret[1], "value"), json!(["EU", "B"]));
    }
}
