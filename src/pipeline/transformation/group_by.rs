use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::pipeline::{
    reducer::feed_all, BuildContext, DataFrame, Field, FieldType, ReducerId, TransformError,
    Value,
};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupByOperation {
    Groupby,
    Aggregate,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupByFieldOptions {
    /// Fields without an operation are dropped
    pub operation: Option<GroupByOperation>,
    pub aggregations: Vec<ReducerId>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupByOptions {
    pub fields: HashMap<String, GroupByFieldOptions>,
}

impl TransformerOptions for GroupByOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        Ok(Box::new(GroupBy {
            fields: self.fields,
        }))
    }
}

#[derive(Debug)]
struct GroupBy {
    fields: HashMap<String, GroupByFieldOptions>,
}

impl GroupBy {
    fn options(&self, field: &Field) -> Option<&GroupByFieldOptions> {
        self.fields
            .get(field.display_name())
            .or_else(|| self.fields.get(&field.name))
    }

    fn group(&self, frame: &DataFrame) -> Result<DataFrame, TransformError> {
        let by_operation = |op: GroupByOperation| {
            frame
                .fields()
                .iter()
                .filter(|f| self.options(f).and_then(|o| o.operation) == Some(op))
                .collect::<Vec<_>>()
        };
        let keys = by_operation(GroupByOperation::Groupby);
        if keys.is_empty() {
            return Ok(frame.clone());
        }

        let mut groups: Vec<Vec<usize>> = vec![];
        let mut index: HashMap<Vec<&Value>, usize> = HashMap::new();
        for row in 0..frame.len() {
            let key: Vec<&Value> = keys.iter().map(|f| f.get(row)).collect();
            let idx = *index.entry(key).or_insert_with(|| {
                groups.push(vec![]);
                groups.len() - 1
            });
            groups[idx].push(row);
        }

        let mut fields: Vec<Field> = keys
            .iter()
            .map(|f| f.with_values(groups.iter().map(|rows| f.get(rows[0]).clone()).collect()))
            .collect();
        for field in by_operation(GroupByOperation::Aggregate) {
            for reducer in &self.options(field).map(|o| o.aggregations.clone()).unwrap_or_default() {
                let values: Vec<Value> = groups
                    .iter()
                    .map(|rows| {
                        let mut r = reducer.create();
                        feed_all(r.as_mut(), rows.iter().map(|&row| field.get(row)));
                        r.get_result()
                    })
                    .collect();
                let field_type = match FieldType::guess(&values) {
                    FieldType::Other if values.iter().all(Value::is_null) => {
                        reducer.output_type(field.field_type)
                    }
                    t => t,
                };
                let mut out = Field::new(
                    format!("{} ({})", field.display_name(), reducer.id()),
                    field_type,
                    values,
                );
                out.labels = field.labels.clone();
                fields.push(out);
            }
        }
        frame.with_fields(fields)
    }
}

impl Transformation for GroupBy {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        frames.iter().map(|f| self.group(f)).collect()
    }

    fn dump(&self) -> String {
        let mut keys: Vec<_> = self.fields.keys().cloned().collect();
        keys.sort();
        format!("group-by {}", keys.join(", "))
    }
}
