use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use crate::common::load_file;

use super::Gazetteer;

type Slot = Arc<OnceCell<Arc<Gazetteer>>>;

/**
 * Gazetteers keyed by location, each location is loaded at most once and never evicted.
 * Concurrent requests for the same location share one load. If the loading future is
 * dropped before it finishes, the slot stays empty and the next request loads again.
 * A failed load is reported once and cached as an empty gazetteer.
 */
#[derive(Debug, Default)]
pub struct GazetteerCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl GazetteerCache {
    pub fn new() -> Self {
        Default::default()
    }

    fn slot(&self, location: &str) -> Slot {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(location.to_string())
            .or_default()
            .clone()
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, location: &str) -> Arc<Gazetteer> {
        self.slot(location)
            .get_or_init(|| async {
                match load_file(location).await.and_then(|text| Gazetteer::parse(&text)) {
                    Ok(gazetteer) => {
                        debug!("Loaded {} places from {}", gazetteer.len(), location);
                        Arc::new(gazetteer)
                    }
                    Err(e) => {
                        warn!("Failed to load gazetteer from {}, lookups will not match: {}", location, e);
                        Arc::new(Gazetteer::default())
                    }
                }
            })
            .await
            .clone()
    }

    /**
     * Preload a location, does nothing if it's already loaded
     */
    pub fn insert(&self, location: &str, gazetteer: Gazetteer) {
        self.slot(location).set(Arc::new(gazetteer)).ok();
    }

    /**
     * Number of loaded locations
     */
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|s| s.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
