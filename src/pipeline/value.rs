use std::{
    cmp::Ordering,
    fmt::Display,
    hash::{Hash, Hasher},
};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::TransformError;

/**
 * The type of a field
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    /**
     * Epoch milliseconds, stored as numbers
     */
    Time,
    Number,
    String,
    Boolean,
    #[default]
    Other,
    Trace,
    Geo,
}

impl FieldType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Number)
    }

    /**
     * Guess the field type from the values, nulls are ignored.
     * Mixed values make an `Other` field.
     */
    pub fn guess<'a, T>(values: T) -> FieldType
    where
        T: IntoIterator<Item = &'a Value>,
    {
        let mut guessed = None;
        for v in values {
            let t = match v {
                Value::Null => continue,
                Value::Bool(_) => FieldType::Boolean,
                Value::Number(_) => FieldType::Number,
                Value::String(_) => FieldType::String,
                Value::Other(_) => FieldType::Other,
            };
            match guessed {
                None => guessed = Some(t),
                Some(g) if g == t => {}
                Some(_) => return FieldType::Other,
            }
        }
        guessed.unwrap_or_default()
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Time => write!(f, "time"),
            FieldType::Number => write!(f, "number"),
            FieldType::String => write!(f, "string"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Other => write!(f, "other"),
            FieldType::Trace => write!(f, "trace"),
            FieldType::Geo => write!(f, "geo"),
        }
    }
}

/**
 * Value is the type of a cell in a field, any cell can be null.
 */
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /**
     * Objects, arrays and anything else the other variants can't hold
     */
    Other(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /**
     * Numeric view of the value, strings are not parsed.
     */
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /**
     * Text form of the value, used for display names, keys and string conversion.
     */
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(v) => v.to_string(),
            Value::Number(v) => format_number(*v),
            Value::String(v) => v.clone(),
            Value::Other(v) => v.to_string(),
        }
    }

    /**
     * Convert the value into the given field type, null stays null.
     */
    pub fn convert_to(&self, field_type: FieldType) -> Result<Value, TransformError> {
        let err = || TransformError::InvalidTypeConversion(field_type);
        if self.is_null() {
            return Ok(Value::Null);
        }
        Ok(match field_type {
            FieldType::Number => match self {
                Value::Number(_) => self.clone(),
                Value::Bool(v) => Value::Number(if *v { 1.0 } else { 0.0 }),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Number)
                    .map_err(|_| err())?,
                _ => Err(err())?,
            },
            FieldType::String => Value::String(self.to_display_string()),
            FieldType::Boolean => match self {
                Value::Bool(_) => self.clone(),
                Value::Number(v) => Value::Bool(*v != 0.0),
                Value::String(s) => match s.trim().to_lowercase().as_str() {
                    "true" | "yes" | "1" => Value::Bool(true),
                    "false" | "no" | "0" | "" => Value::Bool(false),
                    _ => Err(err())?,
                },
                _ => Err(err())?,
            },
            FieldType::Time => match self {
                Value::Number(_) => self.clone(),
                Value::String(s) => parse_time(s, None).map(Value::Number).ok_or_else(err)?,
                _ => Err(err())?,
            },
            FieldType::Other | FieldType::Trace | FieldType::Geo => match self {
                Value::String(s) => serde_json::from_str::<serde_json::Value>(s)
                    .map(Value::from)
                    .unwrap_or_else(|_| self.clone()),
                _ => self.clone(),
            },
        })
    }

    pub fn dump(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::String(v) => format!("{:?}", v),
            v => v.to_display_string(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Other(_) => 4,
        }
    }
}

/**
 * Integral numbers are printed without a fraction part.
 */
pub fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

/**
 * Parse a time string into epoch milliseconds.
 * Without a format, numbers and RFC 3339 strings are accepted.
 * With a format, the string is parsed with `chrono` format specifiers as a UTC time.
 */
pub fn parse_time(s: &str, format: Option<&str>) -> Option<f64> {
    let s = s.trim();
    match format {
        Some(fmt) => NaiveDateTime::parse_from_str(s, fmt)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, fmt)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .map(|t| t.and_utc().timestamp_millis() as f64),
        None => s.parse::<f64>().ok().or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.timestamp_millis() as f64)
        }),
    }
}

fn normalize(v: f64) -> f64 {
    if v.is_nan() {
        f64::NAN
    } else if v == 0.0 {
        // -0.0 and 0.0 are the same key
        0.0
    } else {
        v
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(l0), Self::Bool(r0)) => l0 == r0,
            (Self::Number(l0), Self::Number(r0)) => {
                l0 == r0 || (l0.is_nan() && r0.is_nan())
            }
            (Self::String(l0), Self::String(r0)) => l0 == r0,
            (Self::Other(l0), Self::Other(r0)) => l0 == r0,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::Number(v) => normalize(*v).to_bits().hash(state),
            Value::String(v) => v.hash(state),
            Value::Other(v) => v.to_string().hash(state),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => match (x.is_nan(), y.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => normalize(*x).total_cmp(&normalize(*y)),
            },
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Other(x), Value::Other(y)) => x.to_string().cmp(&y.to_string()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(v),
            Value::Number(v) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 {
                    serde_json::Value::Number((v as i64).into())
                } else {
                    // NaN and infinity have no JSON form
                    Number::from_f64(v)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Value::String(v) => serde_json::Value::String(v),
            Value::Other(v) => v,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(v) => Self::Bool(v),
            serde_json::Value::Number(v) => v.as_f64().map(Self::Number).unwrap_or_default(),
            serde_json::Value::String(v) => Self::String(v),
            v => Self::Other(v),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
