use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    common::compile_regex,
    pipeline::{BuildContext, DataFrame, TransformError, Value},
};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    #[default]
    Include,
    Exclude,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterMatch {
    #[default]
    Any,
    All,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionConfig {
    pub id: String,
    #[serde(default)]
    pub options: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueFilter {
    pub field_name: String,
    pub config: ConditionConfig,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterByValueOptions {
    pub filters: Vec<ValueFilter>,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    #[serde(rename = "match")]
    pub filter_match: FilterMatch,
}

/**
 * A condition on a single cell, null cells only satisfy `isNull`
 */
#[derive(Debug)]
enum Condition {
    IsNull,
    IsNotNull,
    Equal(Value),
    NotEqual(Value),
    Greater(f64),
    GreaterOrEqual(f64),
    Lower(f64),
    LowerOrEqual(f64),
    Range(f64, f64),
    Regex(regex::Regex),
}

fn number_option(options: &serde_json::Value, key: &str) -> Option<f64> {
    match options.get(key)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl Condition {
    fn parse(config: &ConditionConfig) -> Result<Self, String> {
        let opts = &config.options;
        let value = || Value::from(opts.get("value").cloned().unwrap_or_default());
        let number = |key: &str| number_option(opts, key).ok_or_else(|| format!("'{}' must be a number", key));
        Ok(match config.id.as_str() {
            "isNull" => Condition::IsNull,
            "isNotNull" => Condition::IsNotNull,
            "equal" => Condition::Equal(value()),
            "notEqual" => Condition::NotEqual(value()),
            "greater" => Condition::Greater(number("value")?),
            "greaterOrEqual" => Condition::GreaterOrEqual(number("value")?),
            "lower" => Condition::Lower(number("value")?),
            "lowerOrEqual" => Condition::LowerOrEqual(number("value")?),
            "range" => Condition::Range(number("from")?, number("to")?),
            "regex" => {
                let pattern = opts
                    .get("value")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| "'value' must be a pattern".to_string())?;
                Condition::Regex(compile_regex(pattern).map_err(|e| e.to_string())?)
            }
            other => return Err(format!("unknown condition '{}'", other)),
        })
    }

    fn matches(&self, cell: &Value) -> bool {
        if cell.is_null() {
            return matches!(self, Condition::IsNull);
        }
        let number = || match cell {
            Value::String(s) => s.trim().parse::<f64>().ok(),
            v => v.as_f64(),
        };
        let compare = |f: &dyn Fn(f64) -> bool| number().map(f).unwrap_or(false);
        match self {
            Condition::IsNull => false,
            Condition::IsNotNull => true,
            Condition::Equal(v) => loosely_equal(cell, v),
            Condition::NotEqual(v) => !loosely_equal(cell, v),
            Condition::Greater(v) => compare(&|n| n > *v),
            Condition::GreaterOrEqual(v) => compare(&|n| n >= *v),
            Condition::Lower(v) => compare(&|n| n < *v),
            Condition::LowerOrEqual(v) => compare(&|n| n <= *v),
            Condition::Range(from, to) => compare(&|n| n >= *from && n < *to),
            Condition::Regex(re) => re.is_match(&cell.to_display_string()),
        }
    }
}

/// Numbers compare numerically, everything else by display text
fn loosely_equal(cell: &Value, expected: &Value) -> bool {
    match (cell.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => cell.to_display_string() == expected.to_display_string(),
    }
}

impl TransformerOptions for FilterByValueOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        let filters = self
            .filters
            .into_iter()
            .filter_map(|f| match Condition::parse(&f.config) {
                Ok(condition) => Some((f.field_name, condition)),
                Err(e) => {
                    warn!("Ignoring filter on field '{}': {}", f.field_name, e);
                    None
                }
            })
            .collect();
        Ok(Box::new(FilterByValue {
            filters,
            filter_type: self.filter_type,
            filter_match: self.filter_match,
        }))
    }
}

#[derive(Debug)]
struct FilterByValue {
    filters: Vec<(String, Condition)>,
    filter_type: FilterType,
    filter_match: FilterMatch,
}

impl FilterByValue {
    fn filter(&self, frame: &DataFrame) -> DataFrame {
        let applicable: Vec<(usize, &Condition)> = self
            .filters
            .iter()
            .filter_map(|(name, c)| frame.field_index(name).map(|idx| (idx, c)))
            .collect();
        if applicable.is_empty() {
            return frame.clone();
        }
        let rows: Vec<usize> = (0..frame.len())
            .filter(|&row| {
                let mut results = applicable
                    .iter()
                    .map(|(idx, c)| c.matches(frame.fields()[*idx].get(row)));
                let matched = match self.filter_match {
                    FilterMatch::All => results.all(|r| r),
                    FilterMatch::Any => results.any(|r| r),
                };
                matched == (self.filter_type == FilterType::Include)
            })
            .collect();
        frame.take_rows(&rows)
    }
}

impl Transformation for FilterByValue {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        Ok(frames.iter().map(|f| self.filter(f)).collect())
    }

    fn dump(&self) -> String {
        format!(
            "filter-by-value {:?} {:?} {} filters",
            self.filter_type,
            self.filter_match,
            self.filters.len()
        )
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
            Field::number("temp", [Value::from(10.0), Value::from(25.0), Value::Null, Value::from(30.0), Value::from(15.0)]),
            Field::string("host", ["web-1", "db-1", "web-2", "db-2", "web-3"]),
        ])
        .unwrap()]
    }

    fn filter(field: &str, id: &str, options: serde_json::Value) -> serde_json::Value {
        json!({"fieldName": field, "config": {"id": id, "options": options}})
    }

    #[test]
    fn test_include_any() {
        let ret = apply(
            "filterByValue",
            json!({"filters": [
                filter("temp", "greater", json!({"value": 20})),
                filter("temp", "isNull", json!({})),
            ]}),
            &frames(),
        );
        assert_eq!(values(&ret[0], "time"), json!([2, 3, 4]));
    }

    #[test]
    fn test_exclude_all() {
        let ret = apply(
            "filterByValue",
            json!({
                "type": "exclude",
                "match": "all",
                "filters": [
                    filter("host", "regex", json!({"value": "^web"})),
                    filter("temp", "range", json!({"from": 10, "to": 20})),
                ],
            }),
            &frames(),
        );
        assert_eq!(values(&ret[0], "time"), json!([2, 3, 4]));
    }

    #[test]
    fn test_equality() {
        let ret = apply(
            "filterByValue",
            json!({"filters": [filter("host", "equal", json!({"value": "db-2"})), filter("temp", "equal", json!({"value": "10"}))]}),
            &frames(),
        );
        assert_eq!(values(&ret[0], "time"), json!([1, 4]));
    }

    #[test]
    fn test_invalid_filters_ignored() {
        let ret = apply(
            "filterByValue",
            json!({"filters": [
                filter("temp", "greater", json!({"value": "lots"})),
                filter("temp", "bogus", json!({})),
                filter("host", "regex", json!({"value": "("})),
                filter("missing", "isNull", json!({})),
            ]}),
            &frames(),
        );
        assert_eq!(ret, frames());
    }
}
