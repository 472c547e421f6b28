mod errors;
mod frame;
mod lookup;
mod matcher;
mod pipeline;
mod reducer;
mod registry;
mod transformation;
mod value;

pub use errors::TransformError;
pub use frame::{DataFrame, Field, FieldConfig, FrameMeta, Labels, Notice, NoticeSeverity};
pub use lookup::{Gazetteer, GazetteerCache, GazetteerSource, Place};
pub use matcher::{
    matching_fields, ComparisonOperator, FieldMatcher, MatcherBuilder, MatcherConfig,
    MatcherRegistry,
};
pub use pipeline::{BuildContext, FrameStream, Pipeline, Stage, TransformerConfig};
pub use reducer::{reduce_field, reduce_values, Reducer, ReducerId};
pub use registry::{TransformerBuilder, TransformerDefinition, TransformerRegistry};
pub use transformation::{Transformation, TransformerOptions};
pub use value::{format_number, parse_time, FieldType, Value};
