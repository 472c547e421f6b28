use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::pipeline::{BuildContext, DataFrame, TransformError};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortField {
    pub field: String,
    #[serde(default)]
    pub desc: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SortByOptions {
    pub sort: Vec<SortField>,
}

impl TransformerOptions for SortByOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        Ok(Box::new(SortBy { sort: self.sort }))
    }
}

#[derive(Debug)]
struct SortBy {
    sort: Vec<SortField>,
}

impl SortBy {
    fn sort_frame(&self, frame: &DataFrame) -> DataFrame {
        let keys: Vec<(usize, bool)> = self
            .sort
            .iter()
            .filter_map(|s| frame.field_index(&s.field).map(|idx| (idx, s.desc)))
            .collect();
        if keys.is_empty() {
            return frame.clone();
        }
        let mut rows: Vec<usize> = (0..frame.len()).collect();
        rows.sort_by(|&a, &b| {
            keys.iter()
                .map(|&(idx, desc)| {
                    let field = &frame.fields()[idx];
                    let (x, y) = (field.get(a), field.get(b));
                    // Nulls go last in both directions
                    match (x.is_null(), y.is_null()) {
                        (true, true) => Ordering::Equal,
                        (true, false) => Ordering::Greater,
                        (false, true) => Ordering::Less,
                        _ if desc => y.cmp(x),
                        _ => x.cmp(y),
                    }
                })
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        frame.take_rows(&rows)
    }
}

impl Transformation for SortBy {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        Ok(frames.iter().map(|f| self.sort_frame(f)).collect())
    }

    fn dump(&self) -> String {
        format!(
            "sort-by {}",
            self.sort
                .iter()
                .map(|s| format!("{}{}", s.field, if s.desc { " desc" } else { "" }))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::{
        transformation::test_utils::{apply, values},
        Field, Value,
    };

    fn frames() -> Vec<DataFrame> {
        vec![DataFrame::new(vec![
            Field::string("group", ["b", "a", "b", "a", "a"]),
            Field::number("v", [Value::from(1), Value::Null, Value::from(3), Value::from(2), Value::from(5)]),
            Field::number("id", [1, 2, 3, 4, 5]),
        ])
        .unwrap()]
    }

    #[test]
    fn test_multi_key() {
        let ret = apply(
            "sortBy",
            json!({"sort": [{"field": "group"}, {"field": "v", "desc": true}]}),
            &frames(),
        );
        assert_eq!(values(&ret[0], "id"), json!([5, 4, 2, 3, 1]));
    }

    #[test]
    fn test_nulls_last_and_stable() {
        let ret = apply("sortBy", json!({"sort": [{"field": "v"}]}), &frames());
        assert_eq!(values(&ret[0], "id"), json!([1, 4, 3, 5, 2]));
        let ret = apply("sortBy", json!({"sort": [{"field": "group", "desc": true}]}), &frames());
        assert_eq!(values(&ret[0], "id"), json!([1, 3, 2, 4, 5]));
        assert_eq!(apply("sortBy", json!({"sort": [{"field": "nope"}]}), &frames()), frames());
    }
}
