use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::{parse_time, BuildContext, DataFrame, Field, FieldType, TransformError, Value};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Conversion {
    pub target_field: Option<String>,
    pub destination_type: Option<FieldType>,
    /// `chrono` format of time strings, e.g. `%Y-%m-%d %H:%M:%S`
    pub date_format: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConvertFieldTypeOptions {
    pub conversions: Vec<Conversion>,
}

impl TransformerOptions for ConvertFieldTypeOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        let conversions = self
            .conversions
            .into_iter()
            .filter_map(|c| match (c.target_field, c.destination_type) {
                (Some(target), Some(destination)) => Some((target, destination, c.date_format)),
                _ => None,
            })
            .collect();
        Ok(Box::new(ConvertFieldType { conversions }))
    }
}

#[derive(Debug)]
struct ConvertFieldType {
    conversions: Vec<(String, FieldType, Option<String>)>,
}

/**
 * Convert one cell, cells that cannot be converted become null
 */
fn convert(value: &Value, destination: FieldType, date_format: Option<&str>) -> Value {
    match (value, destination, date_format) {
        (Value::String(s), FieldType::Time, Some(fmt)) => parse_time(s, Some(fmt)).into(),
        // Formatting epoch milliseconds
        (Value::Number(ms), FieldType::String, Some(fmt)) => {
            DateTime::<Utc>::from_timestamp_millis(*ms as i64)
                .map(|t| Value::String(t.format(fmt).to_string()))
                .unwrap_or_default()
        }
        (v, _, _) => v.convert_to(destination).unwrap_or_default(),
    }
}

impl ConvertFieldType {
    fn convert_field(&self, field: &Field) -> Field {
        self.conversions
            .iter()
            .filter(|(target, _, _)| target == &field.name || target == field.display_name())
            .fold(field.clone(), |field, (_, destination, date_format)| {
                let values = field
                    .values
                    .iter()
                    .map(|v| convert(v, *destination, date_format.as_deref()))
                    .collect();
                let mut converted = field.with_values(values);
                converted.field_type = *destination;
                converted
            })
    }
}

impl Transformation for ConvertFieldType {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        frames
            .iter()
            .map(|frame| frame.with_fields(frame.fields().iter().map(|f| self.convert_field(f)).collect()))
            .collect()
    }

    fn dump(&self) -> String {
        format!(
            "convert-field-type {}",
            self.conversions
                .iter()
                .map(|(target, destination, _)| format!("{} as {}", target, destination))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
