use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::pipeline::{BuildContext, DataFrame, Field, TransformError, Value};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeOptions {}

impl TransformerOptions for MergeOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        Ok(Box::new(Merge))
    }
}

#[derive(Debug)]
struct Merge;

/**
 * Two rows can be merged when they agree on every column both have a value for,
 * and there's at least one such column
 */
fn mergeable(existing: &[Value], incoming: &[Value]) -> bool {
    let mut shared = false;
    for (x, y) in existing.iter().zip(incoming) {
        if !x.is_null() && !y.is_null() {
            if x != y {
                return false;
            }
            shared = true;
        }
    }
    shared
}

/**
 * Combine all frames into one table, fields are matched by display name.
 * Rows of different frames holding the same values in their shared fields become one row.
 */
pub(super) fn merge_frames(frames: &[DataFrame]) -> Result<DataFrame, TransformError> {
    let mut columns: Vec<Field> = vec![];
    let mut index: HashMap<String, usize> = HashMap::new();
    for field in frames.iter().flat_map(|f| f.fields()) {
        if !index.contains_key(field.display_name()) {
            index.insert(field.display_name().to_string(), columns.len());
            columns.push(field.with_values(vec![]));
        }
    }

    let mut rows: Vec<(Vec<Value>, HashSet<usize>)> = vec![];
    for (frame_idx, frame) in frames.iter().enumerate() {
        let mapping: Vec<usize> = frame
            .fields()
            .iter()
            .filter_map(|f| index.get(f.display_name()).copied())
            .collect();
        for row in 0..frame.len() {
            let mut incoming = vec![Value::Null; columns.len()];
            for (field, &col) in frame.fields().iter().zip(&mapping) {
                incoming[col] = field.get(row).clone();
            }
            // Rows of the same frame are never merged together
            let target = rows
                .iter()
                .position(|(existing, sources)| !sources.contains(&frame_idx) && mergeable(existing, &incoming));
            match target {
                Some(t) => {
                    let (existing, sources) = &mut rows[t];
                    for (x, y) in existing.iter_mut().zip(incoming) {
                        if x.is_null() {
                            *x = y;
                        }
                    }
                    sources.insert(frame_idx);
                }
                None => rows.push((incoming, HashSet::from([frame_idx]))),
            }
        }
    }

    let fields = columns
        .iter()
        .enumerate()
        .map(|(col, template)| template.with_values(rows.iter().map(|(r, _)| r[col].clone()).collect()))
        .collect();
    DataFrame::with_length(rows.len(), fields)
}

impl Transformation for Merge {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        if frames.len() < 2 {
            return Ok(frames.to_vec());
        }
        Ok(vec![merge_frames(frames)?])
    }

    fn dump(&self) -> String {
        "merge".to_string()
    }
}
