use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::pipeline::{
    BuildContext, DataFrame, Field, Gazetteer, GazetteerCache, GazetteerSource, TransformError,
    Value,
};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldLookupOptions {
    /// The field holding place names
    pub lookup_field: Option<String>,
    pub gazetteer: Option<GazetteerSource>,
}

impl TransformerOptions for FieldLookupOptions {
    fn build(self, ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        let gazetteer = OnceCell::new();
        let mut location = None;
        match self.gazetteer {
            Some(GazetteerSource::Inline(json)) => {
                let parsed = Gazetteer::from_json(&json)
                    .map_err(|e| TransformError::InvalidOptions("fieldLookup".to_string(), e.to_string()))?;
                gazetteer.set(Arc::new(parsed)).ok();
            }
            Some(GazetteerSource::Location(l)) => location = Some(l),
            None => {}
        }
        Ok(Box::new(FieldLookup {
            lookup_field: self.lookup_field,
            location,
            cache: ctx.gazetteers.clone(),
            gazetteer,
        }))
    }
}

#[derive(Debug)]
struct FieldLookup {
    lookup_field: Option<String>,
    location: Option<String>,
    cache: Arc<GazetteerCache>,
    /// Set by `prepare`, or at build time for inline gazetteers
    gazetteer: OnceCell<Arc<Gazetteer>>,
}

#[async_trait]
impl Transformation for FieldLookup {
    async fn prepare(&self) -> Result<(), TransformError> {
        if let (Some(location), None) = (&self.location, self.gazetteer.get()) {
            let gazetteer = self.cache.get(location).await;
            self.gazetteer.set(gazetteer).ok();
        }
        Ok(())
    }

    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        let (Some(lookup_field), Some(gazetteer)) = (&self.lookup_field, self.gazetteer.get()) else {
            if self.lookup_field.is_some() && self.location.is_some() {
                warn!("Gazetteer {:?} is not loaded, frames are passed through", self.location);
            }
            return Ok(frames.to_vec());
        };
        frames
            .iter()
            .map(|frame| {
                let Some(idx) = frame.field_index(lookup_field) else {
                    debug!("Frame has no field '{}', passed through", lookup_field);
                    return Ok(frame.clone());
                };
                let places: Vec<_> = frame.fields()[idx]
                    .values
                    .iter()
                    .map(|v| match v {
                        Value::Null => None,
                        v => gazetteer.find(&v.to_display_string()),
                    })
                    .collect();
                let mut fields = frame.fields()[..=idx].to_vec();
                fields.extend([
                    Field::string("id", places.iter().map(|p| p.map(|p| p.id.clone()))),
                    Field::string("name", places.iter().map(|p| p.and_then(|p| p.name.clone()))),
                    Field::number("lon", places.iter().map(|p| p.and_then(|p| p.longitude))),
                    Field::number("lat", places.iter().map(|p| p.and_then(|p| p.latitude))),
                ]);
                fields.extend_from_slice(&frame.fields()[idx + 1..]);
                frame.with_fields(fields)
            })
            .collect()
    }

    fn dump(&self) -> String {
        format!(
            "field-lookup {} gazetteer={}",
            self.lookup_field.as_deref().unwrap_or("<none>"),
            self.location.as_deref().unwrap_or("<inline>")
        )
    }
}
