use serde::{Deserialize, Serialize};

use crate::pipeline::{BuildContext, DataFrame, TransformError, Value};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrameNameMode {
    /// Frame name goes into the field display name
    #[default]
    FieldName,
    /// Frame name goes into a label
    Label,
    Drop,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConcatenateOptions {
    pub frame_name_mode: FrameNameMode,
    pub frame_name_label: String,
}

impl Default for ConcatenateOptions {
    fn default() -> Self {
        Self {
            frame_name_mode: Default::default(),
            frame_name_label: "frame".to_string(),
        }
    }
}

impl TransformerOptions for ConcatenateOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        Ok(Box::new(Concatenate { options: self }))
    }
}

#[derive(Debug)]
struct Concatenate {
    options: ConcatenateOptions,
}

impl Transformation for Concatenate {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        if frames.is_empty() {
            return Ok(vec![]);
        }
        let length = frames.iter().map(|f| f.len()).max().unwrap_or_default();
        let mut fields = vec![];
        for frame in frames {
            for field in frame.fields() {
                let mut values = field.values.clone();
                values.resize(length, Value::Null);
                let mut out = field.with_values(values);
                if let Some(frame_name) = &frame.name {
                    match self.options.frame_name_mode {
                        FrameNameMode::FieldName => {
                            out.config.display_name = Some(if frame.fields().len() == 1 {
                                frame_name.clone()
                            } else {
                                format!("{} {}", frame_name, field.display_name())
                            });
                        }
                        FrameNameMode::Label => {
                            out.labels
                                .insert(self.options.frame_name_label.clone(), frame_name.clone());
                        }
                        FrameNameMode::Drop => {}
                    }
                }
                fields.push(out);
            }
        }
        Ok(vec![DataFrame::with_length(length, fields)?])
    }

    fn dump(&self) -> String {
        format!("concatenate {:?}", self.options.frame_name_mode)
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
        vec![
            DataFrame::new(vec![Field::number("v", [1.0, 2.0, 3.0])]).unwrap().named("A"),
            DataFrame::new(vec![Field::number("x", [4.0]), Field::string("y", ["s"])])
                .unwrap()
                .named("B"),
        ]
    }

    #[test]
    fn test_field_name_mode() {
        let ret = apply("concatenate", json!({}), &frames());
        assert_eq!(ret.len(), 1);
        let frame = &ret[0];
        assert_eq!(frame.len(), 3);
        let names: Vec<_> = frame.fields().iter().map(|f| f.display_name()).collect();
        assert_eq!(names, vec!["A", "B x", "B y"]);
        assert_eq!(values(frame, "x"), json!([4, null, null]));
    }

    #[test]
    fn test_label_mode() {
        let ret = apply("concatenate", json!({"frameNameMode": "label", "frameNameLabel": "source"}), &frames());
        let field = ret[0].field("y").unwrap();
        assert_eq!(field.labels.get("source").map(String::as_str), Some("B"));
        assert_eq!(field.display_name(), "y");
    }
}
