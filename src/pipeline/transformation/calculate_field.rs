use serde::{Deserialize, Serialize};

use crate::pipeline::{
    format_number, reduce_values, BuildContext, DataFrame, Field, FieldType, ReducerId,
    TransformError, Value,
};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalculateMode {
    /// Reduce the selected fields of every row
    #[default]
    ReduceRow,
    Binary,
    Unary,
    /// Row number, optionally as a fraction of the row count
    Index,
    /// Running total or mean over the current and all preceding rows
    CumulativeFunctions,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReduceRowOptions {
    /// Numeric fields when not set
    pub include: Option<Vec<String>>,
    pub reducer: ReducerId,
}

impl Default for ReduceRowOptions {
    fn default() -> Self {
        Self {
            include: None,
            reducer: ReducerId::Sum,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[default]
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
    #[serde(rename = "%")]
    Modulo,
    #[serde(rename = "**", alias = "^")]
    Power,
}

impl BinaryOperator {
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Power => "**",
        }
    }

    fn calculate(&self, left: f64, right: f64) -> f64 {
        match self {
            BinaryOperator::Add => left + right,
            BinaryOperator::Subtract => left - right,
            BinaryOperator::Multiply => left * right,
            BinaryOperator::Divide => left / right,
            BinaryOperator::Modulo => left % right,
            BinaryOperator::Power => left.powf(right),
        }
    }
}

/// Operands are field names or number literals
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BinaryOptions {
    pub left: String,
    pub operator: BinaryOperator,
    pub right: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnaryOperator {
    #[default]
    Abs,
    Exp,
    Ln,
    Floor,
    Ceil,
}

impl UnaryOperator {
    fn name(&self) -> &'static str {
        match self {
            UnaryOperator::Abs => "abs",
            UnaryOperator::Exp => "exp",
            UnaryOperator::Ln => "ln",
            UnaryOperator::Floor => "floor",
            UnaryOperator::Ceil => "ceil",
        }
    }

    fn calculate(&self, v: f64) -> f64 {
        match self {
            UnaryOperator::Abs => v.abs(),
            UnaryOperator::Exp => v.exp(),
            UnaryOperator::Ln => v.ln(),
            UnaryOperator::Floor => v.floor(),
            UnaryOperator::Ceil => v.ceil(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnaryOptions {
    pub operator: UnaryOperator,
    pub field_name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexOptions {
    pub as_percentile: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CumulativeOptions {
    pub field: String,
    /// `sum` or `mean`
    pub reducer: ReducerId,
}

impl Default for CumulativeOptions {
    fn default() -> Self {
        Self {
            field: Default::default(),
            reducer: ReducerId::Sum,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalculateFieldOptions {
    pub mode: CalculateMode,
    pub reduce: ReduceRowOptions,
    pub binary: BinaryOptions,
    pub unary: UnaryOptions,
    pub index: IndexOptions,
    pub cumulative: CumulativeOptions,
    /// Name of the new field, derived from the calculation when not set
    pub alias: Option<String>,
    /// Keep only the time field and the new field
    pub replace_fields: bool,
}

#[derive(Clone, Debug, PartialEq)]
enum Operand {
    Field(String),
    Number(f64),
}

impl Operand {
    fn parse(s: &str) -> Result<Self, TransformError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TransformError::InvalidOptions(
                "calculateField".to_string(),
                "Binary operands must not be empty".to_string(),
            ));
        }
        Ok(s.parse::<f64>()
            .map(Operand::Number)
            .unwrap_or_else(|_| Operand::Field(s.to_string())))
    }

    fn label(&self) -> String {
        match self {
            Operand::Field(name) => name.clone(),
            Operand::Number(v) => format_number(*v),
        }
    }

    /**
     * Per row numeric values, `None` if the field doesn't exist in the frame
     */
    fn values(&self, frame: &DataFrame) -> Option<Vec<Option<f64>>> {
        match self {
            Operand::Field(name) => frame
                .field(name)
                .map(|f| f.values.iter().map(Value::as_f64).collect()),
            Operand::Number(v) => Some(vec![Some(*v); frame.len()]),
        }
    }
}

#[derive(Clone, Debug)]
enum Calculation {
    ReduceRow {
        include: Option<Vec<String>>,
        reducer: ReducerId,
    },
    Binary {
        left: Operand,
        operator: BinaryOperator,
        right: Operand,
    },
    Unary {
        operator: UnaryOperator,
        field: String,
    },
    Index {
        as_percentile: bool,
    },
    Cumulative {
        field: String,
        mean: bool,
    },
}

impl Calculation {
    fn default_name(&self) -> String {
        match self {
            Calculation::ReduceRow { reducer, .. } => reducer.name().to_string(),
            Calculation::Binary {
                left,
                operator,
                right,
            } => format!("{} {} {}", left.label(), operator.symbol(), right.label()),
            Calculation::Unary { operator, field } => format!("{}({})", operator.name(), field),
            Calculation::Index { .. } => "Row".to_string(),
            Calculation::Cumulative { field, mean: false } => format!("Total {}", field),
            Calculation::Cumulative { field, mean: true } => format!("Mean {}", field),
        }
    }

    /**
     * Values of the new field, `None` when the frame lacks an input field
     */
    fn calculate(&self, frame: &DataFrame) -> Option<Vec<Value>> {
        match self {
            Calculation::ReduceRow { include, reducer } => {
                let fields: Vec<&Field> = frame
                    .fields()
                    .iter()
                    .filter(|f| match include {
                        Some(names) => names
                            .iter()
                            .any(|n| n == &f.name || n == f.display_name()),
                        None => f.field_type.is_numeric(),
                    })
                    .collect();
                if fields.is_empty() {
                    return None;
                }
                Some(
                    (0..frame.len())
                        .map(|row| reduce_values(fields.iter().copied().map(|f| f.get(row)), *reducer))
                        .collect(),
                )
            }
            Calculation::Binary {
                left,
                operator,
                right,
            } => {
                let (left, right) = (left.values(frame)?, right.values(frame)?);
                Some(
                    left.into_iter()
                        .zip(right)
                        .map(|pair| match pair {
                            (Some(l), Some(r)) => Value::Number(operator.calculate(l, r)),
                            _ => Value::Null,
                        })
                        .collect(),
                )
            }
            Calculation::Unary { operator, field } => Some(
                frame
                    .field(field)?
                    .values
                    .iter()
                    .map(|v| Value::from(v.as_f64().map(|v| operator.calculate(v))))
                    .collect(),
            ),
            Calculation::Index { as_percentile } => {
                let len = frame.len();
                Some(
                    (0..len)
                        .map(|row| match *as_percentile {
                            true if len > 1 => Value::Number(row as f64 / (len - 1) as f64),
                            true => Value::Number(0.0),
                            false => Value::from(row),
                        })
                        .collect(),
                )
            }
            Calculation::Cumulative { field, mean } => {
                let (mut total, mut count) = (0.0, 0usize);
                Some(
                    frame
                        .field(field)?
                        .values
                        .iter()
                        .map(|v| {
                            if let Some(v) = v.as_f64() {
                                total += v;
                                count += 1;
                            }
                            match (*mean, count) {
                                (_, 0) => Value::Null,
                                (true, n) => Value::Number(total / n as f64),
                                (false, _) => Value::Number(total),
                            }
                        })
                        .collect(),
                )
            }
        }
    }
}

impl TransformerOptions for CalculateFieldOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        let calculation = match self.mode {
            CalculateMode::ReduceRow => Calculation::ReduceRow {
                include: self.reduce.include,
                reducer: self.reduce.reducer,
            },
            CalculateMode::Binary => Calculation::Binary {
                left: Operand::parse(&self.binary.left)?,
                operator: self.binary.operator,
                right: Operand::parse(&self.binary.right)?,
            },
            CalculateMode::Unary => Calculation::Unary {
                operator: self.unary.operator,
                field: self.unary.field_name,
            },
            CalculateMode::Index => Calculation::Index {
                as_percentile: self.index.as_percentile,
            },
            CalculateMode::CumulativeFunctions => Calculation::Cumulative {
                field: self.cumulative.field,
                mean: match self.cumulative.reducer {
                    ReducerId::Sum => false,
                    ReducerId::Mean => true,
                    r => {
                        return Err(TransformError::InvalidOptions(
                            "calculateField".to_string(),
                            format!("Reducer '{}' is not a cumulative function", r.id()),
                        ))
                    }
                },
            },
        };
        let name = self
            .alias
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| calculation.default_name());
        Ok(Box::new(CalculateField {
            calculation,
            name,
            replace_fields: self.replace_fields,
        }))
    }
}

#[derive(Debug)]
struct CalculateField {
    calculation: Calculation,
    name: String,
    replace_fields: bool,
}

impl CalculateField {
    fn calculate_frame(&self, frame: &DataFrame) -> Result<DataFrame, TransformError> {
        let values = match self.calculation.calculate(frame) {
            Some(values) => values,
            None => return Ok(frame.clone()),
        };
        let field = Field::new(&self.name, FieldType::Number, values);
        let mut fields: Vec<Field> = if self.replace_fields {
            frame
                .time_field_index()
                .map(|idx| frame.fields()[idx].clone())
                .into_iter()
                .collect()
        } else {
            frame.fields().to_vec()
        };
        fields.push(field);
        frame.with_fields(fields)
    }
}

impl Transformation for CalculateField {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        frames.iter().map(|f| self.calculate_frame(f)).collect()
    }

    fn dump(&self) -> String {
        format!(
            "calculate-field {}{}",
            self.name,
            if self.replace_fields { " replace" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::{
        transformation::test_utils::{apply, build, values},
        TransformerRegistry,
    };

    fn frames() -> Vec<DataFrame> {
        vec![DataFrame::new(vec![
            Field::time("time", [1000, 2000, 3000]),
            Field::number("a", [Value::from(1.0), Value::Null, Value::from(-2.5)]),
            Field::number("b", [Value::from(10.0), Value::Null, Value::from(4.0)]),
            Field::string("host", ["x", "y", "z"]),
        ])
        .unwrap()]
    }

    #[test]
    fn test_reduce_row() {
        let ret = apply("calculateField", json!({}), &frames());
        assert_eq!(ret[0].fields().len(), 5);
        assert_eq!(values(&ret[0], "Total"), json!([11, null, 1.5]));

        let ret = apply(
            "calculateField",
            json!({"reduce": {"include": ["a", "host"], "reducer": "count"}, "alias": "n"}),
            &frames(),
        );
        assert_eq!(values(&ret[0], "n"), json!([2, 1, 2]));
    }

    #[test]
    fn test_binary() {
        let ret = apply(
            "calculateField",
            json!({"mode": "binary", "binary": {"left": "a", "operator": "*", "right": "2"}}),
            &frames(),
        );
        assert_eq!(values(&ret[0], "a * 2"), json!([2, null, -5]));

        let ret = apply(
            "calculateField",
            json!({
                "mode": "binary",
                "binary": {"left": "b", "operator": "^", "right": "2"},
                "alias": "square",
                "replaceFields": true,
            }),
            &frames(),
        );
        let names: Vec<&str> = ret[0].fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["time", "square"]);
        assert_eq!(values(&ret[0], "square"), json!([100, null, 16]));
    }

    #[test]
    fn test_missing_field_passes_through() {
        let input = frames();
        let ret = apply(
            "calculateField",
            json!({"mode": "binary", "binary": {"left": "a", "operator": "+", "right": "missing"}}),
            &input,
        );
        assert_eq!(ret, input);
        let ret = apply(
            "calculateField",
            json!({"mode": "unary", "unary": {"operator": "abs", "fieldName": "missing"}}),
            &input,
        );
        assert_eq!(ret, input);
    }

    #[test]
    fn test_unary() {
        let ret = apply(
            "calculateField",
            json!({"mode": "unary", "unary": {"operator": "abs", "fieldName": "a"}}),
            &frames(),
        );
        assert_eq!(values(&ret[0], "abs(a)"), json!([1, null, 2.5]));
        let ret = apply(
            "calculateField",
            json!({"mode": "unary", "unary": {"operator": "floor", "fieldName": "a"}}),
            &frames(),
        );
        assert_eq!(values(&ret[0], "floor(a)"), json!([1, null, -3]));
    }

    #[test]
    fn test_index_and_cumulative() {
        let ret = apply("calculateField", json!({"mode": "index"}), &frames());
        assert_eq!(values(&ret[0], "Row"), json!([0, 1, 2]));
        let ret = apply(
            "calculateField",
            json!({"mode": "index", "index": {"asPercentile": true}}),
            &frames(),
        );
        assert_eq!(values(&ret[0], "Row"), json!([0, 0.5, 1]));

        let ret = apply(
            "calculateField",
            json!({"mode": "cumulativeFunctions", "cumulative": {"field": "b"}}),
            &frames(),
        );
        assert_eq!(values(&ret[0], "Total b"), json!([10, 10, 14]));
        let ret = apply(
            "calculateField",
            json!({"mode": "cumulativeFunctions", "cumulative": {"field": "b", "reducer": "mean"}}),
            &frames(),
        );
        assert_eq!(values(&ret[0], "Mean b"), json!([10, 10, 7]));
    }

    #[test]
    fn test_cumulative_leading_nulls() {
        let frames = vec![DataFrame::new(vec![Field::number(
            "v",
            [Value::Null, Value::from(2.0), Value::Null, Value::from(4.0)],
        )])
        .unwrap()];
        for (reducer, name, expected) in [
            ("sum", "Total v", json!([null, 2, 2, 6])),
            ("mean", "Mean v", json!([null, 2, 2, 3])),
        ] {
            let ret = apply(
                "calculateField",
                json!({"mode": "cumulativeFunctions", "cumulative": {"field": "v", "reducer": reducer}}),
                &frames,
            );
            assert_eq!(values(&ret[0], name), expected);
        }
    }

    #[test]
    fn test_invalid_options() {
        let ctx = BuildContext::default();
        let definition = TransformerRegistry::with_standard_transformers()
            .get("calculateField")
            .unwrap();
        assert!(matches!(
            definition.create(&json!({"mode": "binary", "binary": {"left": "a"}}), &ctx),
            Err(TransformError::InvalidOptions(_, _))
        ));
        assert!(matches!(
            definition.create(
                &json!({"mode": "cumulativeFunctions", "cumulative": {"field": "a", "reducer": "max"}}),
                &ctx
            ),
            Err(TransformError::InvalidOptions(_, _))
        ));
        assert_eq!(
            build("calculateField", json!({"mode": "index", "alias": "n", "replaceFields": true})).dump(),
            "calculate-field n replace"
        );
    }
}
