use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::pipeline::{TransformError, Value};

/**
 * Where a gazetteer comes from, either a path/URL or the entries themselves
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GazetteerSource {
    Location(String),
    Inline(serde_json::Value),
}

/**
 * One entry of a gazetteer
 */
#[derive(Clone, Debug, PartialEq)]
pub struct Place {
    pub id: String,
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/**
 * Name to coordinate lookup table
 */
#[derive(Clone, Debug, Default)]
pub struct Gazetteer {
    places: Vec<Place>,
    exact: HashMap<String, usize>,
    upper: HashMap<String, usize>,
}

impl Gazetteer {
    pub fn parse(text: &str) -> Result<Self, TransformError> {
        Self::from_json(&serde_json::from_str(text)?)
    }

    /**
     * Build from an array of entries, or an object keyed by id.
     * Entries look like `{"key": "US", "keys": ["USA"], "latitude": 37.1, "longitude": -95.7, "name": "United States"}`,
     * `id` is accepted instead of `key`, and `lat`/`lon`/`lng` instead of the long forms.
     */
    pub fn from_json(json: &serde_json::Value) -> Result<Self, TransformError> {
        let mut ret = Self::default();
        match json {
            serde_json::Value::Array(entries) => {
                for entry in entries {
                    let entry = entry.as_object().ok_or_else(|| {
                        TransformError::InvalidJson(format!("gazetteer entry must be an object, got {}", entry))
                    })?;
                    ret.add(None, entry);
                }
            }
            serde_json::Value::Object(entries) => {
                for (id, entry) in entries {
                    if let Some(entry) = entry.as_object() {
                        ret.add(Some(id), entry);
                    }
                }
            }
            other => {
                return Err(TransformError::InvalidJson(format!(
                    "gazetteer must be an array or an object, got {}",
                    other
                )))
            }
        }
        Ok(ret)
    }

    fn add(&mut self, id: Option<&String>, entry: &serde_json::Map<String, serde_json::Value>) {
        let get = |names: &[&str]| {
            names
                .iter()
                .find_map(|n| entry.get(*n))
                .map(|v| Value::from(v.clone()))
        };
        let text = |v: Value| (!v.is_null()).then(|| v.to_display_string());
        let primary = id
            .cloned()
            .or_else(|| get(&["key", "id"]).and_then(text));
        let mut keys: Vec<String> = primary.iter().cloned().collect();
        if let Some(serde_json::Value::Array(more)) = entry.get("keys") {
            keys.extend(more.iter().map(|k| Value::from(k.clone())).filter_map(text));
        }
        let Some(place_id) = primary.or_else(|| keys.first().cloned()) else {
            return;
        };
        let idx = self.places.len();
        self.places.push(Place {
            id: place_id,
            name: get(&["name"]).and_then(text),
            latitude: get(&["latitude", "lat"]).and_then(|v| v.as_f64()),
            longitude: get(&["longitude", "lon", "lng"]).and_then(|v| v.as_f64()),
        });
        for key in keys {
            self.upper.entry(key.to_uppercase()).or_insert(idx);
            self.exact.entry(key).or_insert(idx);
        }
    }

    /**
     * Exact match first, then case-insensitive
     */
    pub fn find(&self, key: &str) -> Option<&Place> {
        self.exact
            .get(key)
            .or_else(|| self.upper.get(&key.to_uppercase()))
            .map(|&idx| &self.places[idx])
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_array_form() {
        let g = Gazetteer::from_json(&json!([
            {"key": "US", "keys": ["USA", "United States"], "latitude": 37.1, "longitude": -95.7, "name": "United States"},
            {"id": "fr", "lat": 46.2, "lng": 2.2, "name": "France"},
            {"name": "nowhere"},
        ]))
        .unwrap();
        assert_eq!(g.len(), 2);
        assert_eq!(g.find("USA").unwrap().id, "US");
        assert_eq!(g.find("us").unwrap().latitude, Some(37.1));
        let fr = g.find("FR").unwrap();
        assert_eq!(fr.name.as_deref(), Some("France"));
        assert_eq!(fr.longitude, Some(2.2));
        assert!(g.find("de").is_none());
    }

    #[test]
    fn test_object_form() {
        let g = Gazetteer::parse(r#"{"CA": {"lat": 56.1, "lon": -106.3, "name": "Canada"}}"#).unwrap();
        assert_eq!(g.find("ca").unwrap().id, "CA");
        assert!(Gazetteer::parse("42").is_err());
        assert!(Gazetteer::parse("[1, 2]").is_err());
    }

    #[test]
    fn test_exact_match_first() {
        let g = Gazetteer::from_json(&json!([
            {"key": "ab", "lat": 1, "lon": 1},
            {"key": "AB", "lat": 2, "lon": 2},
        ]))
        .unwrap();
        assert_eq!(g.find("AB").unwrap().latitude, Some(2.0));
        assert_eq!(g.find("ab").unwrap().latitude, Some(1.0));
        assert_eq!(g.find("Ab").unwrap().latitude, Some(1.0));
    }

    #[test]
    fn test_source_forms() {
        let s: GazetteerSource = serde_json::from_value(json!("public/countries.json")).unwrap();
        assert_eq!(s, GazetteerSource::Location("public/countries.json".to_string()));
        let s: GazetteerSource = serde_json::from_value(json!([{"key": "x"}])).unwrap();
        assert!(matches!(s, GazetteerSource::Inline(_)));
    }
}
