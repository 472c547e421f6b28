use std::{collections::HashMap, fmt::Debug, sync::Arc};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use super::{DataFrame, Field, FieldType, TransformError};

mod composite;
mod field_name;
mod field_type;
mod field_value;
mod frame;

pub use field_value::ComparisonOperator;

/**
 * Serialized form of a field matcher, e.g. `{"id": "byName", "options": "temperature"}`
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    pub id: String,
    #[serde(default)]
    pub options: serde_json::Value,
}

impl MatcherConfig {
    pub fn new<T>(id: T, options: serde_json::Value) -> Self
    where
        T: ToString,
    {
        Self {
            id: id.to_string(),
            options,
        }
    }

    pub fn by_name(name: &str) -> Self {
        Self::new("byName", json!(name))
    }

    pub fn by_names<T>(names: T) -> Self
    where
        T: IntoIterator,
        T::Item: ToString,
    {
        let names: Vec<String> = names.into_iter().map(|n| n.to_string()).collect();
        Self::new("byNames", json!({ "names": names }))
    }

    pub fn by_regexp(pattern: &str) -> Self {
        Self::new("byRegexp", json!(pattern))
    }

    pub fn by_type(field_type: FieldType) -> Self {
        Self::new("byType", json!(field_type))
    }

    pub fn numeric() -> Self {
        Self::new("numeric", serde_json::Value::Null)
    }

    pub fn all_of(matchers: Vec<MatcherConfig>) -> Self {
        Self::new("allMatch", json!(matchers))
    }

    pub fn any_of(matchers: Vec<MatcherConfig>) -> Self {
        Self::new("anyMatch", json!(matchers))
    }

    pub fn not(matcher: MatcherConfig) -> Self {
        Self::new("notMatch", json!(matcher))
    }
}

/**
 * A predicate deciding whether a field is selected.
 * The parent frame and all sibling frames are available for cross-frame matchers.
 */
pub trait FieldMatcher: Sync + Send + Debug {
    fn matches(&self, field: &Field, frame: &DataFrame, frames: &[DataFrame]) -> bool;
}

pub type MatcherBuilder = Arc<
    dyn Fn(&serde_json::Value, &MatcherRegistry) -> Result<Box<dyn FieldMatcher>, TransformError>
        + Send
        + Sync,
>;

/**
 * Mapping from matcher id to the function that builds the matcher from its options
 */
#[derive(Clone, Default)]
pub struct MatcherRegistry {
    builders: HashMap<String, MatcherBuilder>,
}

impl Debug for MatcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.builders.keys().collect();
        ids.sort();
        f.debug_struct("MatcherRegistry").field("ids", &ids).finish()
    }
}

impl MatcherRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_standard_matchers() -> Self {
        let mut registry = Self::new();
        registry.insert("byName", field_name::ByName::build);
        registry.insert("byNames", field_name::ByNames::build);
        registry.insert("byRegexp", field_name::ByRegexp::build);
        registry.insert("byType", field_type::ByType::build);
        registry.insert("numeric", |_, _| Ok(Box::new(field_type::ByType(FieldType::Number)) as Box<dyn FieldMatcher>));
        registry.insert("time", |_, _| Ok(Box::new(field_type::ByType(FieldType::Time)) as Box<dyn FieldMatcher>));
        registry.insert("first", |_, _| Ok(Box::new(field_type::First) as Box<dyn FieldMatcher>));
        registry.insert("firstTimeField", |_, _| Ok(Box::new(field_type::FirstTimeField) as Box<dyn FieldMatcher>));
        registry.insert("byFrameRefID", frame::ByFrameRefId::build);
        registry.insert("byValue", field_value::ByValue::build);
        registry.insert("allMatch", composite::AllMatch::build);
        registry.insert("anyMatch", composite::AnyMatch::build);
        registry.insert("notMatch", composite::NotMatch::build);
        registry.insert("alwaysMatch", |_, _| Ok(Box::new(composite::Always(true)) as Box<dyn FieldMatcher>));
        registry.insert("neverMatch", |_, _| Ok(Box::new(composite::Always(false)) as Box<dyn FieldMatcher>));
        registry
    }

    /**
     * Add a matcher, ids must be unique
     */
    pub fn register<T, F>(&mut self, id: T, builder: F) -> Result<(), TransformError>
    where
        T: ToString,
        F: Fn(&serde_json::Value, &MatcherRegistry) -> Result<Box<dyn FieldMatcher>, TransformError>
            + Send
            + Sync
            + 'static,
    {
        let id = id.to_string();
        if self.builders.contains_key(&id) {
            return Err(TransformError::MatcherAlreadyRegistered(id));
        }
        self.insert(&id, builder);
        Ok(())
    }

    fn insert<F>(&mut self, id: &str, builder: F)
    where
        F: Fn(&serde_json::Value, &MatcherRegistry) -> Result<Box<dyn FieldMatcher>, TransformError>
            + Send
            + Sync
            + 'static,
    {
        self.builders.insert(id.to_string(), Arc::new(builder));
    }

    /**
     * Build the matcher described by the config
     */
    pub fn get(&self, config: &MatcherConfig) -> Result<Box<dyn FieldMatcher>, TransformError> {
        let builder = self
            .builders
            .get(&config.id)
            .ok_or_else(|| TransformError::MatcherNotFound(config.id.clone()))?;
        builder(&config.options, self)
    }
}

pub(crate) fn parse_options<T>(id: &str, options: &serde_json::Value) -> Result<T, TransformError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(options.clone())
        .map_err(|e| TransformError::InvalidMatcherOptions(id.to_string(), e.to_string()))
}

/**
 * Indices of the fields in `frame` selected by the matcher
 */
pub fn matching_fields(
    matcher: &dyn FieldMatcher,
    frame: &DataFrame,
    frames: &[DataFrame],
) -> Vec<usize> {
    frame
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| matcher.matches(f, frame, frames))
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    fn frames() -> Vec<DataFrame> {
        vec![
            DataFrame::new(vec![
                Field::time("time", [1000, 2000]),
                Field::number("A-temp", [1.0, 2.0]),
                Field::number("B-temp", [10.0, 20.0]),
                Field::string("C-host", ["a", "b"]),
            ])
            .unwrap()
            .with_ref_id("A"),
            DataFrame::new(vec![Field::number("A-other", [Value::Null, Value::Null])])
                .unwrap()
                .with_ref_id("B"),
        ]
    }

    fn matched(config: &MatcherConfig) -> Vec<String> {
        let registry = MatcherRegistry::with_standard_matchers();
        let matcher = registry.get(config).unwrap();
        let frames = frames();
        frames
            .iter()
            .flat_map(|frame| {
                matching_fields(matcher.as_ref(), frame, &frames)
                    .into_iter()
                    .map(|idx| frame.fields()[idx].name.clone())
            })
            .collect()
    }

    #[test]
    fn test_any_of() {
        let any = MatcherConfig::any_of(vec![
            MatcherConfig::by_regexp("^A"),
            MatcherConfig::by_regexp("^B"),
        ]);
        assert_eq!(matched(&any), vec!["A-temp", "B-temp", "A-other"]);
    }

    #[test]
    fn test_all_of() {
        let all = MatcherConfig::all_of(vec![
            MatcherConfig::by_regexp("^A"),
            MatcherConfig::by_regexp("temp$"),
        ]);
        assert_eq!(matched(&all), vec!["A-temp"]);
        assert_eq!(matched(&MatcherConfig::all_of(vec![])).len(), 5);
        assert!(matched(&MatcherConfig::any_of(vec![])).is_empty());
    }

    #[test]
    fn test_simple_matchers() {
        assert_eq!(matched(&MatcherConfig::by_name("C-host")), vec!["C-host"]);
        assert_eq!(
            matched(&MatcherConfig::by_names(["time", "A-other"])),
            vec!["time", "A-other"]
        );
        assert_eq!(
            matched(&MatcherConfig::numeric()),
            vec!["A-temp", "B-temp", "A-other"]
        );
        assert_eq!(
            matched(&MatcherConfig::by_type(FieldType::String)),
            vec!["C-host"]
        );
        assert_eq!(
            matched(&MatcherConfig::new("byFrameRefID", json!("B"))),
            vec!["A-other"]
        );
        assert_eq!(
            matched(&MatcherConfig::not(MatcherConfig::numeric())),
            vec!["time", "C-host"]
        );
        assert_eq!(matched(&MatcherConfig::new("first", json!(null))), vec!["time", "A-other"]);
    }

    #[test]
    fn test_by_value() {
        let config = MatcherConfig::new(
            "byValue",
            json!({"reducer": "max", "op": "gte", "value": 10}),
        );
        // All-null fields never match
        assert_eq!(matched(&config), vec!["B-temp"]);
    }

    #[test]
    fn test_errors() {
        let registry = MatcherRegistry::with_standard_matchers();
        assert_eq!(
            registry.get(&MatcherConfig::new("bogus", json!(null))).unwrap_err(),
            TransformError::MatcherNotFound("bogus".to_string())
        );
        assert!(matches!(
            registry.get(&MatcherConfig::by_regexp("(")).unwrap_err(),
            TransformError::InvalidRegex(_, _)
        ));
        assert!(matches!(
            registry.get(&MatcherConfig::new("byType", json!("nope"))).unwrap_err(),
            TransformError::InvalidMatcherOptions(_, _)
        ));
        let mut registry = registry;
        assert_eq!(
            registry
                .register("byName", field_name::ByName::build)
                .unwrap_err(),
            TransformError::MatcherAlreadyRegistered("byName".to_string())
        );
    }
}
