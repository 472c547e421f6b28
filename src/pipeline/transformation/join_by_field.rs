use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::pipeline::{
    pipeline::BuildContext, DataFrame, Field, NoticeSeverity, TransformError, Value,
};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinMode {
    #[default]
    Outer,
    Inner,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JoinByFieldOptions {
    /**
     * The field to join on, the first time field when not set
     */
    pub by_field: Option<String>,
    pub mode: JoinMode,
}

impl TransformerOptions for JoinByFieldOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        Ok(Box::new(JoinByField {
            by_field: self.by_field,
            mode: self.mode,
        }))
    }
}

#[derive(Debug)]
struct JoinByField {
    by_field: Option<String>,
    mode: JoinMode,
}

/// A frame taking part in the join, with the row of each key
struct Joined<'a> {
    index: usize,
    frame: &'a DataFrame,
    join_idx: usize,
    rows: HashMap<&'a Value, usize>,
}

impl JoinByField {
    fn join_field_name(&self, frames: &[DataFrame]) -> Option<String> {
        self.by_field.clone().or_else(|| {
            frames.iter().find_map(|f| {
                f.time_field_index()
                    .map(|idx| f.fields()[idx].name.clone())
            })
        })
    }

    /**
     * Name of a value field in the output, colliding names get the frame name
     */
    fn output_name(joined: &Joined, field: &Field, collides: bool) -> String {
        if !collides {
            return field.name.clone();
        }
        match &joined.frame.name {
            Some(name) if joined.frame.fields().len() == 2 => name.clone(),
            Some(name) => format!("{} {}", field.name, name),
            None => format!("{} {}", field.name, joined.index + 1),
        }
    }
}

impl Transformation for JoinByField {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        let Some(join_name) = self.join_field_name(frames) else {
            debug!("No join field found, frames are passed through");
            return Ok(frames.to_vec());
        };

        let mut joined = vec![];
        let mut excluded = vec![];
        for (index, frame) in frames.iter().enumerate() {
            match frame.field_index(&join_name) {
                Some(join_idx) => {
                    let mut rows = HashMap::new();
                    for (row, key) in frame.fields()[join_idx].values.iter().enumerate() {
                        if !key.is_null() {
                            rows.entry(key).or_insert(row);
                        }
                    }
                    joined.push(Joined {
                        index,
                        frame,
                        join_idx,
                        rows,
                    });
                }
                None => {
                    let label = frame
                        .name
                        .clone()
                        .or_else(|| frame.ref_id.clone())
                        .unwrap_or_else(|| format!("#{}", index + 1));
                    warn!("Frame '{}' has no field '{}', excluded from the join", label, join_name);
                    excluded.push(label);
                }
            }
        }
        let Some(first) = joined.first() else {
            return Ok(frames.to_vec());
        };

        let mut keys: Vec<&Value> = match self.mode {
            JoinMode::Outer => joined
                .iter()
                .flat_map(|j| j.rows.keys().copied())
                .collect::<HashSet<_>>()
                .into_iter()
                .collect(),
            JoinMode::Inner => first
                .rows
                .keys()
                .copied()
                .filter(|k| joined.iter().all(|j| j.rows.contains_key(k)))
                .collect(),
        };
        keys.sort();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for j in &joined {
            for (idx, field) in j.frame.fields().iter().enumerate() {
                if idx != j.join_idx {
                    *counts.entry(field.name.as_str()).or_default() += 1;
                }
            }
        }

        let join_field = &first.frame.fields()[first.join_idx];
        let mut fields = vec![join_field.with_values(keys.iter().map(|&k| k.clone()).collect())];
        let mut used: HashSet<String> = HashSet::from([join_field.name.clone()]);
        for j in &joined {
            for (idx, field) in j.frame.fields().iter().enumerate() {
                if idx == j.join_idx {
                    continue;
                }
                let values = keys
                    .iter()
                    .map(|k| j.rows.get(k).map(|&row| field.get(row).clone()).unwrap_or_default())
                    .collect();
                let mut out = field.with_values(values);
                let mut name = Self::output_name(j, field, counts[field.name.as_str()] > 1);
                // Frames may share a name
                if used.contains(&name) {
                    name = format!("{} {}", name, j.index + 1);
                }
                used.insert(name.clone());
                out.name = name;
                fields.push(out);
            }
        }

        let mut frame = DataFrame::with_length(keys.len(), fields)?;
        for label in excluded {
            frame = frame.with_notice(
                NoticeSeverity::Warning,
                format!("Frame '{}' has no field '{}' and was not joined", label, join_name),
            );
        }
        Ok(vec![frame])
    }

    fn dump(&self) -> String {
        format!(
            "join-by-field {} mode={:?}",
            self.by_field.as_deref().unwrap_or("<first time field>"),
            self.mode
        )
    }
}
