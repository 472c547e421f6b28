use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::common::IgnoreDebug;

use super::{
    pipeline::BuildContext,
    transformation::{self, Transformation, TransformerOptions},
    TransformError,
};

pub type TransformerBuilder = Arc<
    dyn Fn(serde_json::Value, &BuildContext) -> Result<Box<dyn Transformation>, TransformError>
        + Send
        + Sync,
>;

/**
 * Everything the executor needs to know about a transformer
 */
#[derive(Debug)]
pub struct TransformerDefinition {
    pub id: String,
    pub name: String,
    pub description: String,

    /**
     * Options used when the configuration entry doesn't set them
     */
    pub default_options: serde_json::Value,

    builder: IgnoreDebug<TransformerBuilder>,
}

impl TransformerDefinition {
    /**
     * Definition of a transformer with typed options, default options are taken from `O::default()`
     */
    pub fn new<O>(id: &str, name: &str, description: &str) -> Self
    where
        O: TransformerOptions + 'static,
    {
        let default_options = serde_json::to_value(O::default()).unwrap_or_default();
        let transformer_id = id.to_string();
        Self::with_builder(id, name, description, default_options, move |options, ctx| {
            serde_json::from_value::<O>(options)
                .map_err(|e| TransformError::InvalidOptions(transformer_id.clone(), e.to_string()))?
                .build(ctx)
        })
    }

    /**
     * Definition with an arbitrary builder, options are passed as JSON
     */
    pub fn with_builder<F>(
        id: &str,
        name: &str,
        description: &str,
        default_options: serde_json::Value,
        builder: F,
    ) -> Self
    where
        F: Fn(serde_json::Value, &BuildContext) -> Result<Box<dyn Transformation>, TransformError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            default_options,
            builder: IgnoreDebug {
                inner: Arc::new(builder),
            },
        }
    }

    /**
     * Merge the options over the defaults and build the configuration-bound transformation.
     * Top level keys of `options` replace the default ones, `null` means all defaults.
     */
    pub fn create(
        &self,
        options: &serde_json::Value,
        ctx: &BuildContext,
    ) -> Result<Box<dyn Transformation>, TransformError> {
        let effective = match (options, &self.default_options) {
            (serde_json::Value::Null, defaults) => defaults.clone(),
            (serde_json::Value::Object(opts), serde_json::Value::Object(defaults)) => {
                let mut merged = defaults.clone();
                merged.extend(opts.iter().map(|(k, v)| (k.clone(), v.clone())));
                serde_json::Value::Object(merged)
            }
            (serde_json::Value::Object(_), _) => options.clone(),
            (other, _) => {
                return Err(TransformError::InvalidOptions(
                    self.id.clone(),
                    format!("options must be an object, got {}", other),
                ))
            }
        };
        (self.builder.inner)(effective, ctx)
    }
}

/**
 * Mapping from transformer id to its definition.
 * The registry is an explicit object, build one per process or per test.
 */
#[derive(Debug, Clone, Default)]
pub struct TransformerRegistry {
    definitions: HashMap<String, Arc<TransformerDefinition>>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /**
     * A registry with all built-in transformers
     */
    pub fn with_standard_transformers() -> Self {
        let mut registry = Self::new();
        for definition in transformation::standard_transformers() {
            registry.definitions.insert(definition.id.clone(), Arc::new(definition));
        }
        debug!("{} standard transformers registered", registry.len());
        registry
    }

    /**
     * Add a definition, ids must be unique
     */
    pub fn register(
        &mut self,
        definition: TransformerDefinition,
    ) -> Result<Arc<TransformerDefinition>, TransformError> {
        if self.definitions.contains_key(&definition.id) {
            return Err(TransformError::TransformerAlreadyRegistered(definition.id));
        }
        let definition = Arc::new(definition);
        self.definitions
            .insert(definition.id.clone(), definition.clone());
        Ok(definition)
    }

    pub fn get(&self, id: &str) -> Result<Arc<TransformerDefinition>, TransformError> {
        self.definitions
            .get(id)
            .cloned()
            .ok_or_else(|| TransformError::TransformerNotFound(id.to_string()))
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.definitions.keys().map(|k| k.as_str()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
