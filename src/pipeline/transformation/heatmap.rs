use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::pipeline::{
    matching_fields, BuildContext, DataFrame, Field, FieldMatcher, MatcherConfig, TransformError,
    Value,
};

use super::{Transformation, TransformerOptions};

/// Upper limit of the number of buckets
const MAX_BUCKETS: usize = 10_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BucketMode {
    /// A fixed number of equal-width buckets
    #[default]
    Count,
    /// Buckets of a fixed width
    Size,
    /// Explicit bucket boundaries
    Explicit,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BucketScale {
    #[default]
    Linear,
    Log2,
    Log10,
}

impl BucketScale {
    fn forward(&self, v: f64) -> f64 {
        match self {
            BucketScale::Linear => v,
            BucketScale::Log2 => v.log2(),
            BucketScale::Log10 => v.log10(),
        }
    }

    fn inverse(&self, v: f64) -> f64 {
        match self {
            BucketScale::Linear => v,
            BucketScale::Log2 => v.exp2(),
            BucketScale::Log10 => 10f64.powf(v),
        }
    }

    fn accepts(&self, v: f64) -> bool {
        v.is_finite() && (*self == BucketScale::Linear || v > 0.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeatmapOptions {
    /// Numeric fields when not set
    pub fields: Option<MatcherConfig>,
    pub mode: BucketMode,
    pub count: usize,
    pub size: Option<f64>,
    pub boundaries: Vec<f64>,
    pub scale: BucketScale,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Count all fields together in a single `count` field
    pub combine: bool,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self {
            fields: None,
            mode: Default::default(),
            count: 10,
            size: None,
            boundaries: vec![],
            scale: Default::default(),
            min: None,
            max: None,
            combine: false,
        }
    }
}

impl TransformerOptions for HeatmapOptions {
    fn build(self, ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        let invalid = |msg: &str| TransformError::InvalidOptions("heatmap".to_string(), msg.to_string());
        let buckets = match self.mode {
            BucketMode::Count if self.count == 0 => return Err(invalid("count must be positive")),
            BucketMode::Count if self.count > MAX_BUCKETS => {
                return Err(invalid(&format!("count must not exceed {}", MAX_BUCKETS)))
            }
            BucketMode::Count => Buckets::Count(self.count),
            BucketMode::Size => match self.size {
                Some(size) if size > 0.0 && size.is_finite() => Buckets::Size(size),
                _ => return Err(invalid("size must be a positive number")),
            },
            BucketMode::Explicit => {
                let mut boundaries: Vec<f64> = self
                    .boundaries
                    .iter()
                    .copied()
                    .filter(|b| self.scale.accepts(*b))
                    .map(|b| self.scale.forward(b))
                    .collect();
                boundaries.sort_by(f64::total_cmp);
                boundaries.dedup();
                if boundaries.len() < 2 {
                    return Err(invalid("at least two boundaries are needed"));
                }
                Buckets::Explicit(boundaries)
            }
        };
        let matcher = ctx
            .matchers
            .get(&self.fields.unwrap_or_else(MatcherConfig::numeric))?;
        Ok(Box::new(Heatmap {
            matcher,
            buckets,
            scale: self.scale,
            min: self.min,
            max: self.max,
            combine: self.combine,
        }))
    }
}

#[derive(Debug)]
enum Buckets {
    Count(usize),
    Size(f64),
    /// Sorted edges in scaled space
    Explicit(Vec<f64>),
}

#[derive(Debug)]
struct Heatmap {
    matcher: Box<dyn FieldMatcher>,
    buckets: Buckets,
    scale: BucketScale,
    min: Option<f64>,
    max: Option<f64>,
    combine: bool,
}

impl Heatmap {
    /**
     * Bucket edges in scaled space, `None` when there's nothing to bucket
     */
    fn edges(&self, scaled: &[f64]) -> Option<Vec<f64>> {
        if let Buckets::Explicit(edges) = &self.buckets {
            return Some(edges.clone());
        }
        let bound = |configured: Option<f64>, observed: f64| {
            configured
                .filter(|v| self.scale.accepts(*v))
                .map(|v| self.scale.forward(v))
                .unwrap_or(observed)
        };
        let lo = bound(self.min, scaled.iter().copied().reduce(f64::min)?);
        let hi = bound(self.max, scaled.iter().copied().reduce(f64::max)?);
        if hi < lo {
            return None;
        }
        match self.buckets {
            _ if hi == lo => Some(vec![lo, hi]),
            Buckets::Count(n) => {
                let width = (hi - lo) / n as f64;
                Some((0..=n).map(|i| if i == n { hi } else { lo + width * i as f64 }).collect())
            }
            Buckets::Size(size) => {
                let start = (lo / size).floor() * size;
                let n = ((hi - start) / size).ceil();
                if !n.is_finite() || n > MAX_BUCKETS as f64 {
                    warn!("Values span more than {} buckets of size {}, nothing is bucketed", MAX_BUCKETS, size);
                    return None;
                }
                let n = (n as usize).max(1);
                Some((0..=n).map(|i| start + size * i as f64).collect())
            }
            Buckets::Explicit(_) => None,
        }
    }
}

/**
 * Index of the bucket holding `v`, the last bucket includes its upper edge
 */
fn bucket_index(edges: &[f64], v: f64) -> Option<usize> {
    let (first, last) = (*edges.first()?, *edges.last()?);
    if v < first || v > last {
        return None;
    }
    if v == last {
        return Some(edges.len() - 2);
    }
    Some(edges.partition_point(|e| *e <= v) - 1)
}

impl Transformation for Heatmap {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        let selected: Vec<&Field> = frames
            .iter()
            .flat_map(|frame| {
                matching_fields(self.matcher.as_ref(), frame, frames)
                    .into_iter()
                    .map(|idx| &frame.fields()[idx])
            })
            .collect();
        let scaled: Vec<Vec<f64>> = selected
            .iter()
            .map(|f| {
                f.values
                    .iter()
                    .filter_map(Value::as_f64)
                    .filter(|v| self.scale.accepts(*v))
                    .map(|v| self.scale.forward(v))
                    .collect()
            })
            .collect();
        let all: Vec<f64> = scaled.iter().flatten().copied().collect();
        let edges = self.edges(&all).unwrap_or_default();
        let buckets = edges.len().saturating_sub(1);

        let mut counts = vec![vec![0usize; buckets]; if self.combine { 1 } else { selected.len() }];
        for (idx, values) in scaled.iter().enumerate() {
            let column = if self.combine { 0 } else { idx };
            for v in values {
                if let Some(b) = bucket_index(&edges, *v) {
                    counts[column][b] += 1;
                }
            }
        }

        let mut fields = vec![
            Field::number("yMin", edges.iter().take(buckets).map(|e| self.scale.inverse(*e))),
            Field::number("yMax", edges.iter().skip(1).map(|e| self.scale.inverse(*e))),
        ];
        if self.combine {
            fields.push(Field::number("count", counts[0].iter().copied()));
        } else {
            for (field, counts) in selected.iter().zip(counts) {
                let mut out = Field::number(field.display_name(), counts);
                out.labels = field.labels.clone();
                fields.push(out);
            }
        }
        Ok(vec![DataFrame::with_length(buckets, fields)?.named("heatmap")])
    }

    fn dump(&self) -> String {
        format!("heatmap {:?} scale={:?}", self.buckets, self.scale)
    }
}
