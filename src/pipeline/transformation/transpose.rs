use serde::{Deserialize, Serialize};

use crate::pipeline::{BuildContext, DataFrame, Field, FieldType, TransformError, Value};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransposeOptions {
    /// Name of the new first field, `Field` by default
    pub first_field_name: Option<String>,
    /// Prefix of the generated column names when the first field is not a string field
    pub rest_fields_name: Option<String>,
}

impl TransformerOptions for TransposeOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        Ok(Box::new(Transpose {
            first_field_name: self.first_field_name.unwrap_or_else(|| "Field".to_string()),
            rest_fields_name: self.rest_fields_name.unwrap_or_else(|| "Value".to_string()),
        }))
    }
}

#[derive(Debug)]
struct Transpose {
    first_field_name: String,
    rest_fields_name: String,
}

impl Transpose {
    fn transpose(&self, frame: &DataFrame) -> Result<DataFrame, TransformError> {
        let Some(first) = frame.fields().first() else {
            return Ok(frame.clone());
        };
        // A string first field holds the headers, otherwise every field becomes a row
        let (headers, rows): (Vec<String>, &[Field]) = if first.field_type == FieldType::String {
            (
                first.values.iter().map(Value::to_display_string).collect(),
                &frame.fields()[1..],
            )
        } else {
            (
                (1..=frame.len())
                    .map(|i| format!("{} {}", self.rest_fields_name, i))
                    .collect(),
                frame.fields(),
            )
        };
        let mut fields = vec![Field::string(
            &self.first_field_name,
            rows.iter().map(|f| f.display_name()),
        )];
        for (row, header) in headers.into_iter().enumerate() {
            let values: Vec<Value> = rows.iter().map(|f| f.get(row).clone()).collect();
            fields.push(Field::guessed(header, values));
        }
        frame.with_fields(fields)
    }
}

impl Transformation for Transpose {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        frames.iter().map(|f| self.transpose(f)).collect()
    }

    fn dump(&self) -> String {
        format!("transpose {} {}", self.first_field_name, self.rest_fields_name)
    }
}
