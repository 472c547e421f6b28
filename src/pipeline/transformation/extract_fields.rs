use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::{BuildContext, DataFrame, Field, FieldType, TransformError, Value};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtractFormat {
    /// JSON when the cell parses as a JSON object, key/value pairs otherwise
    #[default]
    Auto,
    Json,
    Kvp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonPath {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractFieldsOptions {
    pub source: Option<String>,
    pub format: ExtractFormat,
    /// Only with the JSON format, extract these paths instead of the top level keys
    pub json_paths: Vec<JsonPath>,
    /// Drop all other fields
    pub replace: bool,
    /// Keep the time field when replacing
    pub keep_time: bool,
}

impl TransformerOptions for ExtractFieldsOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        let mut json_paths = vec![];
        for p in self.json_paths {
            let path = if p.path.starts_with('$') {
                p.path.clone()
            } else {
                format!("$.{}", p.path)
            };
            jsonpath_lib::select(&serde_json::Value::Null, &path).map_err(|e| {
                TransformError::InvalidOptions("extractFields".to_string(), format!("{}: {:?}", p.path, e))
            })?;
            json_paths.push((p.alias.unwrap_or(p.path), path));
        }
        Ok(Box::new(ExtractFields {
            source: self.source,
            format: self.format,
            json_paths,
            replace: self.replace,
            keep_time: self.keep_time,
        }))
    }
}

#[derive(Debug)]
struct ExtractFields {
    source: Option<String>,
    format: ExtractFormat,
    /// (output name, path)
    json_paths: Vec<(String, String)>,
    replace: bool,
    keep_time: bool,
}

/**
 * Parse `key=value` or `key: value` pairs, separated by spaces, commas, semicolons or `&`.
 * Values may be quoted.
 */
fn parse_kvp(text: &str) -> Option<Vec<(String, Value)>> {
    let mut ret = vec![];
    let mut chars = text.chars().peekable();
    let is_sep = |c: char| c.is_whitespace() || ",;&".contains(c);
    loop {
        while chars.peek().map(|&c| is_sep(c)).unwrap_or(false) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ':' || is_sep(c) {
                break;
            }
            key.push(c);
            chars.next();
        }
        while chars.peek().map(|c| c.is_whitespace()).unwrap_or(false) {
            chars.next();
        }
        match chars.next() {
            Some('=') | Some(':') => {}
            _ => return None,
        }
        while chars.peek().map(|c| c.is_whitespace()).unwrap_or(false) {
            chars.next();
        }
        let mut value = String::new();
        match chars.peek().copied() {
            Some(q) if q == '"' || q == '\'' => {
                chars.next();
                for c in chars.by_ref() {
                    if c == q {
                        break;
                    }
                    value.push(c);
                }
            }
            _ => {
                while let Some(&c) = chars.peek() {
                    if is_sep(c) {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
            }
        }
        let key = key.trim_matches(|c| c == '"' || c == '\'').to_string();
        if key.is_empty() {
            return None;
        }
        ret.push((key, Value::String(value)));
    }
    (!ret.is_empty()).then_some(ret)
}

impl ExtractFields {
    fn parse_cell(&self, cell: &Value) -> Option<Vec<(String, Value)>> {
        let json = match cell {
            Value::Other(json) => Some(json.clone()),
            Value::String(s) if self.format != ExtractFormat::Kvp => {
                serde_json::from_str::<serde_json::Value>(s).ok()
            }
            _ => None,
        };
        if !self.json_paths.is_empty() && self.format != ExtractFormat::Kvp {
            let json = json?;
            return Some(
                self.json_paths
                    .iter()
                    .map(|(name, path)| {
                        let value = match jsonpath_lib::select(&json, path) {
                            Ok(found) if found.len() == 1 => Value::from(found[0].clone()),
                            Ok(found) if found.len() > 1 => Value::from(serde_json::Value::Array(
                                found.into_iter().cloned().collect(),
                            )),
                            _ => Value::Null,
                        };
                        (name.clone(), value)
                    })
                    .collect(),
            );
        }
        match (json, self.format) {
            (Some(serde_json::Value::Object(map)), _) => {
                Some(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
            (_, ExtractFormat::Json) => None,
            _ => cell.as_str().and_then(parse_kvp),
        }
    }
}

impl Transformation for ExtractFields {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        let Some(source) = &self.source else {
            return Ok(frames.to_vec());
        };
        frames
            .iter()
            .map(|frame| {
                let Some(field) = frame.field(source) else {
                    debug!("Frame has no field '{}', passed through", source);
                    return Ok(frame.clone());
                };
                let mut names: Vec<String> = vec![];
                let mut columns: HashMap<String, Vec<Value>> = HashMap::new();
                for (row, cell) in field.values.iter().enumerate() {
                    for (key, value) in self.parse_cell(cell).unwrap_or_default() {
                        let column = columns.entry(key.clone()).or_insert_with(|| {
                            names.push(key);
                            vec![Value::Null; frame.len()]
                        });
                        column[row] = value;
                    }
                }
                let extracted = names.into_iter().map(|name| {
                    let values = columns.remove(&name).unwrap_or_default();
                    Field::guessed(name, values)
                });
                let fields = if self.replace {
                    frame
                        .fields()
                        .iter()
                        .filter(|f| self.keep_time && f.field_type == FieldType::Time)
                        .cloned()
                        .chain(extracted)
                        .collect()
                } else {
                    frame.fields().iter().cloned().chain(extracted).collect()
                };
                frame.with_fields(fields)
            })
            .collect()
    }

    fn dump(&self) -> String {
        format!(
            "extract-fields {} format={:?}",
            self.source.as_deref().unwrap_or("<none>"),
            self.format
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::transformation::test_utils::{apply, build, values};

    fn frame(cells: Vec<Value>) -> Vec<DataFrame> {
        let len = cells.len();
        vec![DataFrame::new(vec![
            Field::time("time", (0..len).map(|i| i as i64)),
            Field::string("line", cells),
        ])
        .unwrap()]
    }

    #[test]
    fn test_json_round_trip() {
        let originals = vec![
            json!({"a": 1, "b": "x"}),
            json!({"a": 2.5, "c": true}),
            json!({"b": "y", "d": [1, 2]}),
        ];
        let frames = frame(originals.iter().map(|o| Value::from(o.to_string())).collect());
        let ret = apply("extractFields", json!({"source": "line", "format": "json"}), &frames);
        let frame = &ret[0];
        assert_eq!(frame.fields().len(), 6);
        for (row, original) in originals.iter().enumerate() {
            let mut rebuilt = serde_json::Map::new();
            for field in &frame.fields()[2..] {
                let v = field.get(row);
                if !v.is_null() {
                    rebuilt.insert(field.name.clone(), v.clone().into());
                }
            }
            assert_eq!(&serde_json::Value::Object(rebuilt), original);
        }
        assert_eq!(frame.field("a").unwrap().field_type, FieldType::Number);
        assert_eq!(frame.field("c").unwrap().field_type, FieldType::Boolean);
    }

    #[test]
    fn test_parse_failure_gives_null() {
        let frames = frame(vec![
            Value::from(r#"{"a": 1}"#),
            Value::from("not json"),
            Value::Null,
        ]);
        let ret = apply("extractFields", json!({"source": "line", "format": "json", "replace": true}), &frames);
        assert_eq!(ret[0].fields().len(), 1);
        assert_eq!(values(&ret[0], "a"), json!([1, null, null]));
    }

    #[test]
    fn test_kvp_and_auto() {
        let frames = frame(vec![
            Value::from(r#"level=info msg="hello world" code=200"#),
            Value::from(r#"{"level": "warn"}"#),
            Value::from("level: debug, msg: 'x'"),
        ]);
        let ret = apply("extractFields", json!({"source": "line", "replace": true, "keepTime": true}), &frames);
        let frame = &ret[0];
        let names: Vec<_> = frame.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["time", "level", "msg", "code"]);
        assert_eq!(values(frame, "level"), json!(["info", "warn", "debug"]));
        assert_eq!(values(frame, "msg"), json!(["hello world", null, "x"]));
        assert_eq!(values(frame, "code"), json!(["200", null, null]));
    }

    #[test]
    fn test_json_paths() {
        let frames = frame(vec![
            Value::from(r#"{"user": {"name": "ann", "tags": ["a", "b"]}}"#),
            Value::from(r#"{"user": {}}"#),
        ]);
        let ret = apply(
            "extractFields",
            json!({
                "source": "line",
                "format": "json",
                "jsonPaths": [{"path": "user.name", "alias": "name"}, {"path": "$.user.tags[*]"}],
            }),
            &frames,
        );
        assert_eq!(values(&ret[0], "name"), json!(["ann", null]));
        assert_eq!(values(&ret[0], "$.user.tags[*]"), json!([["a", "b"], null]));
    }

    #[test]
    fn test_missing_source() {
        let frames = frame(vec![Value::from("a=1")]);
        assert_eq!(apply("extractFields", json!({"source": "nope"}), &frames), frames);
        assert_eq!(build("extractFields", json!({})).apply(&frames).unwrap(), frames);
    }
}
