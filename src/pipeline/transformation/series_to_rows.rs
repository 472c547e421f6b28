use serde::{Deserialize, Serialize};

use crate::pipeline::{BuildContext, DataFrame, Field, FieldType, TransformError, Value};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SeriesToRowsOptions {}

impl TransformerOptions for SeriesToRowsOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        Ok(Box::new(SeriesToRows))
    }
}

#[derive(Debug)]
struct SeriesToRows;

impl Transformation for SeriesToRows {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        let time_indices: Option<Vec<usize>> = frames.iter().map(|f| f.time_field_index()).collect();
        let Some(time_indices) = time_indices.filter(|t| !t.is_empty()) else {
            return Ok(frames.to_vec());
        };

        // (time, metric, value)
        let mut rows: Vec<(Value, String, Value)> = vec![];
        for (frame, time_idx) in frames.iter().zip(time_indices) {
            let numeric: Vec<&Field> = frame
                .fields()
                .iter()
                .filter(|f| f.field_type == FieldType::Number)
                .collect();
            for field in &numeric {
                let metric = match &frame.name {
                    Some(name) if numeric.len() == 1 => name.clone(),
                    _ => field.display_name().to_string(),
                };
                for row in 0..frame.len() {
                    rows.push((
                        frame.fields()[time_idx].get(row).clone(),
                        metric.clone(),
                        field.get(row).clone(),
                    ));
                }
            }
        }
        // Newest first, stable for equal times
        rows.sort_by(|a, b| b.0.cmp(&a.0));

        let mut time = Vec::with_capacity(rows.len());
        let mut metric = Vec::with_capacity(rows.len());
        let mut value = Vec::with_capacity(rows.len());
        for (t, m, v) in rows {
            time.push(t);
            metric.push(m);
            value.push(v);
        }
        Ok(vec![DataFrame::new(vec![
            Field::time("Time", time),
            Field::string("Metric", metric),
            Field::number("Value", value),
        ])?])
    }

    fn dump(&self) -> String {
        "series-to-rows".to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::transformation::test_utils::{apply, values};

    #[test]
    fn test_series_to_rows() {
        let frames = vec![
            DataFrame::new(vec![Field::time("time", [1000, 3000]), Field::number("v", [1.0, 3.0])])
                .unwrap()
                .named("cpu"),
            DataFrame::new(vec![
                Field::time("time", [2000]),
                Field::number("rx", [20.0]),
                Field::number("tx", [21.0]),
            ])
            .unwrap()
            .named("net"),
        ];
        let ret = apply("seriesToRows", json!({}), &frames);
        let frame = &ret[0];
        assert_eq!(values(frame, "Time"), json!([3000, 2000, 2000, 1000]));
        assert_eq!(values(frame, "Metric"), json!(["cpu", "rx", "tx", "cpu"]));
        assert_eq!(values(frame, "Value"), json!([3, 20, 21, 1]));
    }

    #[test]
    fn test_not_time_series() {
        let frames = vec![DataFrame::new(vec![Field::number("v", [1.0])]).unwrap()];
        assert_eq!(apply("seriesToRows", json!({}), &frames), frames);
    }
}
