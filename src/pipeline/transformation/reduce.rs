use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::pipeline::{
    matching_fields, reduce_values, BuildContext, DataFrame, Field, FieldMatcher, FieldType,
    MatcherConfig, ReducerId, TransformError, Value,
};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReduceMode {
    /// One row per field, one column per reducer
    #[default]
    SeriesToRows,
    /// One single-row frame per input frame
    ReduceFields,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReduceOptions {
    pub reducers: Vec<ReducerId>,
    pub mode: ReduceMode,
    /// Numeric fields when not set
    pub fields: Option<MatcherConfig>,
    pub include_time_field: bool,
    pub labels_to_fields: bool,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self {
            reducers: vec![ReducerId::Max],
            mode: Default::default(),
            fields: None,
            include_time_field: false,
            labels_to_fields: false,
        }
    }
}

impl TransformerOptions for ReduceOptions {
    fn build(self, ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        let matcher = ctx
            .matchers
            .get(&self.fields.unwrap_or_else(MatcherConfig::numeric))?;
        Ok(Box::new(Reduce {
            reducers: self.reducers,
            mode: self.mode,
            matcher,
            include_time_field: self.include_time_field,
            labels_to_fields: self.labels_to_fields,
        }))
    }
}

#[derive(Debug)]
struct Reduce {
    reducers: Vec<ReducerId>,
    mode: ReduceMode,
    matcher: Box<dyn FieldMatcher>,
    include_time_field: bool,
    labels_to_fields: bool,
}

/**
 * Type of the reduced column, taken from the values, or from the reducer when they are all null
 */
fn reduced_type(reducer: ReducerId, input_type: FieldType, values: &[Value]) -> FieldType {
    match FieldType::guess(values) {
        FieldType::Other if values.iter().all(Value::is_null) => reducer.output_type(input_type),
        t => t,
    }
}

impl Reduce {
    fn selected<'a>(&self, frame: &'a DataFrame, frames: &[DataFrame]) -> Vec<&'a Field> {
        let matched = matching_fields(self.matcher.as_ref(), frame, frames);
        frame
            .fields()
            .iter()
            .enumerate()
            .filter(|(idx, f)| {
                if f.field_type == FieldType::Time {
                    self.include_time_field
                } else {
                    matched.contains(idx)
                }
            })
            .map(|(_, f)| f)
            .collect()
    }

    fn series_to_rows(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        let selected: Vec<&Field> = frames
            .iter()
            .flat_map(|frame| self.selected(frame, frames))
            .collect();

        let mut fields = vec![Field::string(
            "Field",
            selected.iter().map(|f| f.display_name()),
        )];
        if self.labels_to_fields {
            let keys: BTreeSet<&String> = selected.iter().flat_map(|f| f.labels.keys()).collect();
            for key in keys {
                fields.push(Field::string(
                    key,
                    selected
                        .iter()
                        .map(|f| f.labels.get(key).cloned().map(Value::from).unwrap_or_default()),
                ));
            }
        }
        for reducer in &self.reducers {
            let values: Vec<Value> = selected
                .iter()
                .map(|f| reduce_values(&f.values, *reducer))
                .collect();
            let input_type = selected.first().map(|f| f.field_type).unwrap_or(FieldType::Number);
            fields.push(Field::new(
                reducer.name(),
                reduced_type(*reducer, input_type, &values),
                values,
            ));
        }
        Ok(vec![DataFrame::with_length(selected.len(), fields)?])
    }

    fn reduce_fields(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        frames
            .iter()
            .map(|frame| {
                let fields = self
                    .selected(frame, frames)
                    .into_iter()
                    .flat_map(|field| {
                        self.reducers.iter().map(move |reducer| {
                            let value = reduce_values(&field.values, *reducer);
                            let mut out = Field::new(
                                &field.name,
                                reduced_type(*reducer, field.field_type, std::slice::from_ref(&value)),
                                [value],
                            );
                            if self.reducers.len() > 1 {
                                out.name = format!("{} {}", field.name, reducer.name());
                            }
                            out.config = field.config.clone();
                            out.labels = field.labels.clone();
                            out
                        })
                    })
                    .collect();
                frame.with_fields(fields)
            })
            .collect()
    }
}

impl Transformation for Reduce {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        if frames.is_empty() {
            return Ok(vec![]);
        }
        match self.mode {
            ReduceMode::SeriesToRows => self.series_to_rows(frames),
            ReduceMode::ReduceFields => self.reduce_fields(frames),
        }
    }

    fn dump(&self) -> String {
        format!(
            "reduce {:?} [{}]",
            self.mode,
            self.reducers.iter().map(|r| r.id()).collect::<Vec<_>>().join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::transformation::test_utils::{apply, values};

    fn frames() -> Vec<DataFrame> {
        vec![
            DataFrame::new(vec![
                Field::time("time", [1, 2, 3]),
                Field::number("temp", [1.0, 5.0, 3.0]).with_labels([("host", "a")]),
                Field::string("state", ["ok", "ok", "bad"]),
            ])
            .unwrap()
            .named("A"),
            DataFrame::new(vec![
                Field::time("time", [1, 2]),
                Field::number("empty", [Value::Null, Value::Null]),
            ])
            .unwrap()
            .named("B"),
        ]
    }

    #[test]
    fn test_series_to_rows() {
        let ret = apply(
            "reduce",
            json!({"reducers": ["max", "count", "last"], "labelsToFields": true}),
            &frames(),
        );
        assert_eq!(ret.len(), 1);
        let frame = &ret[0];
        assert_eq!(values(frame, "Field"), json!(["temp", "empty"]));
        assert_eq!(values(frame, "host"), json!(["a", null]));
        assert_eq!(values(frame, "Max"), json!([5, null]));
        assert_eq!(values(frame, "Count"), json!([3, 0]));
        assert_eq!(values(frame, "Last"), json!([3, null]));
        assert_eq!(frame.field("Max").unwrap().field_type, FieldType::Number);
    }

    #[test]
    fn test_reduce_fields() {
        let ret = apply(
            "reduce",
            json!({"mode": "reduceFields", "reducers": ["mean"], "includeTimeField": true}),
            &frames(),
        );
        assert_eq!(ret.len(), 2);
        assert_eq!(ret[0].name.as_deref(), Some("A"));
        assert_eq!(ret[0].len(), 1);
        assert_eq!(values(&ret[0], "time"), json!([2]));
        assert_eq!(values(&ret[0], "temp"), json!([3]));
        assert!(ret[0].field("state").is_none());
        assert_eq!(values(&ret[1], "empty"), json!([null]));
    }

    #[test]
    fn test_selected_fields() {
        let ret = apply(
            "reduce",
            json!({
                "reducers": ["distinctCount", "first"],
                "mode": "reduceFields",
                "fields": {"id": "byName", "options": "state"},
            }),
            &frames(),
        );
        assert_eq!(values(&ret[0], "state Distinct Count"), json!([2]));
        assert_eq!(values(&ret[0], "state First"), json!(["ok"]));
        assert!(ret[1].fields().is_empty());
    }

    #[test]
    fn test_all_null_field() {
        let frames = vec![DataFrame::new(vec![Field::number("n", [Value::Null, Value::Null])]).unwrap()];
        let reducers: Vec<_> = ReducerId::ALL.iter().map(|r| r.id()).collect();
        let ret = apply("reduce", json!({"reducers": reducers}), &frames);
        for (field, reducer) in ret[0].fields()[1..].iter().zip(ReducerId::ALL) {
            let expected = if reducer == ReducerId::Count { Value::from(0) } else { Value::Null };
            assert_eq!(field.values, vec![expected], "{}", reducer.id());
        }
    }
}
