use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{FieldType, TransformError, Value};

/**
 * Display and formatting metadata of a field.
 * Transformers treat it as opaque unless they explicitly rewrite it.
 */
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<serde_json::Value>,
    /**
     * Everything else, kept as is
     */
    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

impl FieldConfig {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

pub type Labels = BTreeMap<String, String>;

/**
 * One column of a data frame
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    #[serde(default)]
    pub values: Vec<Value>,

    #[serde(default, skip_serializing_if = "FieldConfig::is_empty")]
    pub config: FieldConfig,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: Labels,
}

impl Field {
    pub fn new<T, V>(name: T, field_type: FieldType, values: V) -> Self
    where
        T: ToString,
        V: IntoIterator,
        V::Item: Into<Value>,
    {
        Self {
            name: name.to_string(),
            field_type,
            values: values.into_iter().map(Into::into).collect(),
            config: Default::default(),
            labels: Default::default(),
        }
    }

    pub fn time<T, V>(name: T, values: V) -> Self
    where
        T: ToString,
        V: IntoIterator,
        V::Item: Into<Value>,
    {
        Self::new(name, FieldType::Time, values)
    }

    pub fn number<T, V>(name: T, values: V) -> Self
    where
        T: ToString,
        V: IntoIterator,
        V::Item: Into<Value>,
    {
        Self::new(name, FieldType::Number, values)
    }

    pub fn string<T, V>(name: T, values: V) -> Self
    where
        T: ToString,
        V: IntoIterator,
        V::Item: Into<Value>,
    {
        Self::new(name, FieldType::String, values)
    }

    /**
     * Create a field and guess its type from the values
     */
    pub fn guessed<T>(name: T, values: Vec<Value>) -> Self
    where
        T: ToString,
    {
        let field_type = FieldType::guess(&values);
        Self::new(name, field_type, values)
    }

    pub fn with_labels<K, V, L>(mut self, labels: L) -> Self
    where
        K: ToString,
        V: ToString,
        L: IntoIterator<Item = (K, V)>,
    {
        self.labels = labels
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    pub fn with_config(mut self, config: FieldConfig) -> Self {
        self.config = config;
        self
    }

    /**
     * A copy of this field with the same name, type, config and labels, but other values
     */
    pub fn with_values(&self, values: Vec<Value>) -> Self {
        Self {
            name: self.name.clone(),
            field_type: self.field_type,
            values,
            config: self.config.clone(),
            labels: self.labels.clone(),
        }
    }

    /**
     * The name consumers should show, `config.displayName` wins over `name`
     */
    pub fn display_name(&self) -> &str {
        self.config.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize) -> &Value {
        self.values.get(row).unwrap_or(&Value::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeSeverity {
    Info,
    Warning,
    Error,
}

/**
 * A message attached to a frame, e.g. a condition a transformer wants to surface
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameMeta {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,

    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

/**
 * One table or series result.
 * All fields have exactly `length` values.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataFrame", rename_all = "camelCase")]
pub struct DataFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<FrameMeta>,

    fields: Vec<Field>,

    #[serde(skip)]
    length: usize,
}

impl DataFrame {
    /**
     * Create a frame, all fields must have the same length
     */
    pub fn new(fields: Vec<Field>) -> Result<Self, TransformError> {
        let length = fields.first().map(|f| f.len()).unwrap_or_default();
        Self::with_length(length, fields)
    }

    /**
     * Create a frame with explicit row count, useful for frames without fields
     */
    pub fn with_length(length: usize, fields: Vec<Field>) -> Result<Self, TransformError> {
        if let Some(f) = fields.iter().find(|f| f.len() != length) {
            return Err(TransformError::InvalidFieldLength(
                f.name.clone(),
                f.len(),
                length,
            ));
        }
        Ok(Self {
            name: None,
            ref_id: None,
            meta: None,
            fields,
            length,
        })
    }

    pub fn empty() -> Self {
        Self {
            name: None,
            ref_id: None,
            meta: None,
            fields: vec![],
            length: 0,
        }
    }

    pub fn named<T>(mut self, name: T) -> Self
    where
        T: ToString,
    {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_ref_id<T>(mut self, ref_id: T) -> Self
    where
        T: ToString,
    {
        self.ref_id = Some(ref_id.to_string());
        self
    }

    /**
     * Same name, refId and meta, but different fields
     */
    pub fn with_fields(&self, fields: Vec<Field>) -> Result<Self, TransformError> {
        let mut ret = Self::new(fields)?;
        ret.name = self.name.clone();
        ret.ref_id = self.ref_id.clone();
        ret.meta = self.meta.clone();
        Ok(ret)
    }

    pub fn with_notice(mut self, severity: NoticeSeverity, text: String) -> Self {
        self.meta
            .get_or_insert_with(Default::default)
            .notices
            .push(Notice { severity, text });
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.field_index(name).map(|idx| &self.fields[idx])
    }

    /**
     * Find a field by name, falling back to the display name
     */
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .or_else(|| self.fields.iter().position(|f| f.display_name() == name))
    }

    pub fn time_field_index(&self) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.field_type == FieldType::Time)
    }

    pub fn row(&self, row: usize) -> Vec<Value> {
        self.fields.iter().map(|f| f.get(row).clone()).collect()
    }

    /**
     * A new frame with the selected rows, in the given order
     */
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        let fields = self
            .fields
            .iter()
            .map(|f| f.with_values(rows.iter().map(|&r| f.get(r).clone()).collect()))
            .collect();
        Self {
            name: self.name.clone(),
            ref_id: self.ref_id.clone(),
            meta: self.meta.clone(),
            fields,
            length: rows.len(),
        }
    }

    pub fn dump(&self) -> String {
        let header = self
            .fields
            .iter()
            .map(|f| format!("{} as {}", f.display_name(), f.field_type))
            .collect::<Vec<_>>()
            .join(", ");
        let mut ret = String::new();
        if let Some(name) = &self.name {
            ret.push_str(name);
            ret.push('\n');
        }
        ret.push_str(&header);
        ret.push('\n');
        ret.push_str("-".repeat(header.len()).as_str());
        ret.push('\n');
        for row in 0..self.length {
            ret.push_str(
                self.row(row)
                    .iter()
                    .map(|v| v.dump())
                    .collect::<Vec<_>>()
                    .join(", ")
                    .as_str(),
            );
            ret.push('\n');
        }
        ret
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDataFrame {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    ref_id: Option<String>,
    #[serde(default)]
    meta: Option<FrameMeta>,
    #[serde(default)]
    fields: Vec<Field>,
    #[serde(default)]
    length: Option<usize>,
}

impl TryFrom<RawDataFrame> for DataFrame {
    type Error = TransformError;

    fn try_from(raw: RawDataFrame) -> Result<Self, Self::Error> {
        let mut frame = match raw.length {
            Some(length) => DataFrame::with_length(length, raw.fields)?,
            None => DataFrame::new(raw.fields)?,
        };
        frame.name = raw.name;
        frame.ref_id = raw.ref_id;
        frame.meta = raw.meta;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_validation() {
        let ret = DataFrame::new(vec![
            Field::time("time", [1, 2, 3]),
            Field::number("value", [1.0, 2.0]),
        ]);
        assert_eq!(
            ret.unwrap_err(),
            TransformError::InvalidFieldLength("value".to_string(), 2, 3)
        );
        let frame = DataFrame::with_length(5, vec![]).unwrap();
        assert_eq!(frame.len(), 5);
        assert!(frame.fields().is_empty());
    }

    #[test]
    fn test_json() {
        let frame: DataFrame = serde_json::from_str(
            r#"{
                "name": "A",
                "refId": "A",
                "fields": [
                    {"name": "time", "type": "time", "values": [1000, 2000]},
                    {"name": "temp", "type": "number", "values": [1.5, null], "config": {"unit": "celsius"}, "labels": {"host": "a"}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.ref_id.as_deref(), Some("A"));
        assert_eq!(frame.fields()[1].values, vec![Value::Number(1.5), Value::Null]);
        assert_eq!(frame.fields()[1].config.unit.as_deref(), Some("celsius"));
        assert_eq!(frame.time_field_index(), Some(0));

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["fields"][0]["values"], serde_json::json!([1000, 2000]));
        assert!(json.get("length").is_none());
        let back: DataFrame = serde_json::from_value(json).unwrap();
        assert_eq!(back, frame);

        let bad = serde_json::from_str::<DataFrame>(
            r#"{"fields": [{"name": "a", "values": [1]}, {"name": "b", "values": []}]}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_take_rows() {
        let frame = DataFrame::new(vec![
            Field::time("time", [1, 2, 3]),
            Field::string("host", ["a", "b", "c"]),
        ])
        .unwrap()
        .named("hosts");
        let taken = frame.take_rows(&[2, 0]);
        assert_eq!(taken.len(), 2);
        assert_eq!(taken.name.as_deref(), Some("hosts"));
        assert_eq!(taken.row(0), vec![Value::from(3), Value::from("c")]);
        assert_eq!(taken.row(1), vec![Value::from(1), Value::from("a")]);
        assert_eq!(frame.len(), 3);
    }
}
