use std::{fmt::Debug, str::FromStr};

use dyn_clonable::clonable;
use serde::{Deserialize, Serialize};

use super::{Field, FieldType, TransformError, Value};

mod count;
mod first_last;
mod min_max;
mod stats;
mod sum;
mod values;

/**
 * A calculation that collapses a sequence of values into one value.
 * Reducers are fed one value at a time, nulls are filtered out before feeding
 * unless the reducer asks for them.
 */
#[clonable]
pub trait Reducer: Send + Sync + Clone + Debug {
    fn feed(&mut self, value: &Value);

    /**
     * Result of the reduction, null if nothing has been fed
     */
    fn get_result(&self) -> Value;

    fn includes_nulls(&self) -> bool {
        false
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReducerId {
    Sum,
    #[serde(alias = "avg")]
    Mean,
    Min,
    Max,
    Count,
    First,
    Last,
    FirstNotNull,
    LastNotNull,
    Range,
    Delta,
    Diff,
    DistinctCount,
    ChangeCount,
    Variance,
    StdDev,
    Median,
    AllValues,
    UniqueValues,
}

impl ReducerId {
    pub const ALL: [ReducerId; 19] = [
        ReducerId::Sum,
        ReducerId::Mean,
        ReducerId::Min,
        ReducerId::Max,
        ReducerId::Count,
        ReducerId::First,
        ReducerId::Last,
        ReducerId::FirstNotNull,
        ReducerId::LastNotNull,
        ReducerId::Range,
        ReducerId::Delta,
        ReducerId::Diff,
        ReducerId::DistinctCount,
        ReducerId::ChangeCount,
        ReducerId::Variance,
        ReducerId::StdDev,
        ReducerId::Median,
        ReducerId::AllValues,
        ReducerId::UniqueValues,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ReducerId::Sum => "sum",
            ReducerId::Mean => "mean",
            ReducerId::Min => "min",
            ReducerId::Max => "max",
            ReducerId::Count => "count",
            ReducerId::First => "first",
            ReducerId::Last => "last",
            ReducerId::FirstNotNull => "firstNotNull",
            ReducerId::LastNotNull => "lastNotNull",
            ReducerId::Range => "range",
            ReducerId::Delta => "delta",
            ReducerId::Diff => "diff",
            ReducerId::DistinctCount => "distinctCount",
            ReducerId::ChangeCount => "changeCount",
            ReducerId::Variance => "variance",
            ReducerId::StdDev => "stdDev",
            ReducerId::Median => "median",
            ReducerId::AllValues => "allValues",
            ReducerId::UniqueValues => "uniqueValues",
        }
    }

    /**
     * Human readable name, used as column header
     */
    pub fn name(&self) -> &'static str {
        match self {
            ReducerId::Sum => "Total",
            ReducerId::Mean => "Mean",
            ReducerId::Min => "Min",
            ReducerId::Max => "Max",
            ReducerId::Count => "Count",
            ReducerId::First => "First",
            ReducerId::Last => "Last",
            ReducerId::FirstNotNull => "First *",
            ReducerId::LastNotNull => "Last *",
            ReducerId::Range => "Range",
            ReducerId::Delta => "Delta",
            ReducerId::Diff => "Difference",
            ReducerId::DistinctCount => "Distinct Count",
            ReducerId::ChangeCount => "Change Count",
            ReducerId::Variance => "Variance",
            ReducerId::StdDev => "StdDev",
            ReducerId::Median => "Median",
            ReducerId::AllValues => "All values",
            ReducerId::UniqueValues => "All unique values",
        }
    }

    pub fn create(&self) -> Box<dyn Reducer> {
        match self {
            ReducerId::Sum => Box::<sum::Sum>::default(),
            ReducerId::Mean => Box::<sum::Mean>::default(),
            ReducerId::Min => Box::<min_max::Min>::default(),
            ReducerId::Max => Box::<min_max::Max>::default(),
            ReducerId::Count => Box::<count::Count>::default(),
            ReducerId::First => Box::new(first_last::First::new(true)),
            ReducerId::Last => Box::new(first_last::Last::new(true)),
            ReducerId::FirstNotNull => Box::new(first_last::First::new(false)),
            ReducerId::LastNotNull => Box::new(first_last::Last::new(false)),
            ReducerId::Range => Box::<min_max::Range>::default(),
            ReducerId::Delta => Box::<stats::Delta>::default(),
            ReducerId::Diff => Box::<stats::Diff>::default(),
            ReducerId::DistinctCount => Box::<count::DistinctCount>::default(),
            ReducerId::ChangeCount => Box::<count::ChangeCount>::default(),
            ReducerId::Variance => Box::new(stats::Variance::new(false)),
            ReducerId::StdDev => Box::new(stats::Variance::new(true)),
            ReducerId::Median => Box::<stats::Median>::default(),
            ReducerId::AllValues => Box::new(values::AllValues::new(false)),
            ReducerId::UniqueValues => Box::new(values::AllValues::new(true)),
        }
    }

    /**
     * The type of the reduced value for a field of the given type
     */
    pub fn output_type(&self, input_type: FieldType) -> FieldType {
        match self {
            ReducerId::First
            | ReducerId::Last
            | ReducerId::FirstNotNull
            | ReducerId::LastNotNull
            | ReducerId::Min
            | ReducerId::Max => {
                if input_type == FieldType::Time {
                    FieldType::Time
                } else {
                    match self {
                        ReducerId::Min | ReducerId::Max => FieldType::Number,
                        _ => input_type,
                    }
                }
            }
            ReducerId::AllValues | ReducerId::UniqueValues => FieldType::Other,
            _ => FieldType::Number,
        }
    }
}

impl FromStr for ReducerId {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| TransformError::InvalidOptions("reducer".to_string(), format!("Unknown reducer '{}'", s)))
    }
}

/**
 * Feed all values to a reducer and return the result
 */
pub fn reduce_values<'a, T>(values: T, reducer: ReducerId) -> Value
where
    T: IntoIterator<Item = &'a Value>,
{
    let mut r = reducer.create();
    feed_all(r.as_mut(), values);
    r.get_result()
}

/**
 * Calculate all requested reducers over the values of a field
 */
pub fn reduce_field(field: &Field, reducers: &[ReducerId]) -> Vec<Value> {
    reducers
        .iter()
        .map(|r| reduce_values(&field.values, *r))
        .collect()
}

pub(crate) fn feed_all<'a, T>(reducer: &mut dyn Reducer, values: T)
where
    T: IntoIterator<Item = &'a Value>,
{
    let include_nulls = reducer.includes_nulls();
    values
        .into_iter()
        .filter(|v| include_nulls || !v.is_null())
        .for_each(|v| reducer.feed(v));
}
