mod cache;
mod gazetteer;

pub use cache::GazetteerCache;
pub use gazetteer::{Gazetteer, GazetteerSource, Place};
