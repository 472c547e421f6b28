use std::fmt::Debug;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use super::{pipeline::BuildContext, registry::TransformerDefinition, DataFrame, TransformError};

mod calculate_field;
mod concatenate;
mod convert_field_type;
mod extract_fields;
mod field_lookup;
mod filter_by_ref_id;
mod filter_by_value;
mod filter_fields_by_name;
mod group_by;
mod heatmap;
mod join_by_field;
mod labels_to_fields;
mod limit;
mod merge;
mod organize;
mod partition_by_values;
mod reduce;
mod rename_by_regex;
mod series_to_rows;
mod sort_by;
mod transpose;

/**
 * A configuration-bound transformation, built once and applied to many batches of frames
 */
#[async_trait]
pub trait Transformation: Sync + Send + Debug {
    /**
     * Load external resources needed by `apply`, called before the first batch
     */
    async fn prepare(&self) -> Result<(), TransformError> {
        Ok(())
    }

    /**
     * Produce new frames from the input, the input is never modified
     */
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError>;

    fn dump(&self) -> String;
}

/**
 * Typed options of a transformer, deserialized from the merged JSON options
 */
pub trait TransformerOptions: DeserializeOwned + Serialize + Default + Debug + Send + Sync {
    fn build(self, ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError>;
}

pub(crate) fn standard_transformers() -> Vec<TransformerDefinition> {
    vec![
        TransformerDefinition::new::<join_by_field::JoinByFieldOptions>(
            "joinByField",
            "Join by field",
            "Combine rows from two or more frames, based on a related field between them",
        ),
        TransformerDefinition::new::<reduce::ReduceOptions>(
            "reduce",
            "Reduce",
            "Reduce all rows or data points to a single value using a function like max, min, mean or last",
        ),
        TransformerDefinition::new::<extract_fields::ExtractFieldsOptions>(
            "extractFields",
            "Extract fields",
            "Parse fields from the content of another field (JSON, key=value)",
        ),
        TransformerDefinition::new::<field_lookup::FieldLookupOptions>(
            "fieldLookup",
            "Field lookup",
            "Use a field value to look up additional fields from an external source",
        ),
        TransformerDefinition::new::<heatmap::HeatmapOptions>(
            "heatmap",
            "Create heatmap",
            "Bucket numeric values into ranges and count them",
        ),
        TransformerDefinition::new::<transpose::TransposeOptions>(
            "transpose",
            "Transpose",
            "Transpose the frame, rows become columns",
        ),
        TransformerDefinition::new::<partition_by_values::PartitionByValuesOptions>(
            "partitionByValues",
            "Partition by values",
            "Split a frame into multiple frames, one per distinct value combination",
        ),
        TransformerDefinition::new::<series_to_rows::SeriesToRowsOptions>(
            "seriesToRows",
            "Series to rows",
            "Merge many series and return a single series with time, metric and value",
        ),
        TransformerDefinition::new::<filter_by_ref_id::FilterByRefIdOptions>(
            "filterByRefId",
            "Filter data by query",
            "Keep only the frames produced by the selected queries",
        ),
        TransformerDefinition::new::<filter_fields_by_name::FilterFieldsByNameOptions>(
            "filterFieldsByName",
            "Filter by name",
            "Remove parts of the query results using a name or regex pattern",
        ),
        TransformerDefinition::new::<filter_by_value::FilterByValueOptions>(
            "filterByValue",
            "Filter data by values",
            "Remove rows from the query results using user-defined filters",
        ),
        TransformerDefinition::new::<rename_by_regex::RenameByRegexOptions>(
            "renameByRegex",
            "Rename by regex",
            "Rename parts of the query results using a regular expression and replacement pattern",
        ),
        TransformerDefinition::new::<organize::OrganizeOptions>(
            "organize",
            "Organize fields",
            "Order, filter and rename fields",
        ),
        TransformerDefinition::new::<concatenate::ConcatenateOptions>(
            "concatenate",
            "Concatenate fields",
            "Combine all fields into a single frame",
        ),
        TransformerDefinition::new::<limit::LimitOptions>(
            "limit",
            "Limit",
            "Limit the number of rows displayed",
        ),
        TransformerDefinition::new::<sort_by::SortByOptions>(
            "sortBy",
            "Sort by",
            "Sort fields in a frame",
        ),
        TransformerDefinition::new::<group_by::GroupByOptions>(
            "groupBy",
            "Group by",
            "Group the data by a field value then process calculations for each group",
        ),
        TransformerDefinition::new::<convert_field_type::ConvertFieldTypeOptions>(
            "convertFieldType",
            "Convert field type",
            "Convert a field to a specified field type",
        ),
        TransformerDefinition::new::<calculate_field::CalculateFieldOptions>(
            "calculateField",
            "Add field from calculation",
            "Use the row values to calculate a new field",
        ),
        TransformerDefinition::new::<merge::MergeOptions>(
            "merge",
            "Merge",
            "Merge many series/tables and return a single table where mergeable values will be combined into the same row",
        ),
        TransformerDefinition::new::<labels_to_fields::LabelsToFieldsOptions>(
            "labelsToFields",
            "Labels to fields",
            "Extract time series labels to fields (columns or rows)",
        ),
    ]
}
