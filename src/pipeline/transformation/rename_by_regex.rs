use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    common::compile_regex,
    pipeline::{BuildContext, DataFrame, TransformError},
};

use super::{Transformation, TransformerOptions};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenameByRegexOptions {
    pub regex: String,
    /// Replacement, capture groups are referenced as `$1` or `${name}`
    pub rename_pattern: String,
}

impl TransformerOptions for RenameByRegexOptions {
    fn build(self, _ctx: &BuildContext) -> Result<Box<dyn Transformation>, TransformError> {
        let regex = if self.regex.is_empty() {
            None
        } else {
            Some(compile_regex(&self.regex)?)
        };
        Ok(Box::new(RenameByRegex {
            regex,
            rename_pattern: self.rename_pattern,
        }))
    }
}

#[derive(Debug)]
struct RenameByRegex {
    regex: Option<Regex>,
    rename_pattern: String,
}

impl Transformation for RenameByRegex {
    fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        let Some(regex) = &self.regex else {
            return Ok(frames.to_vec());
        };
        frames
            .iter()
            .map(|frame| {
                let fields = frame
                    .fields()
                    .iter()
                    .map(|field| {
                        let mut renamed = field.clone();
                        let name = field.display_name();
                        if regex.is_match(name) {
                            renamed.config.display_name =
                                Some(regex.replace(name, self.rename_pattern.as_str()).to_string());
                        }
                        renamed
                    })
                    .collect();
                frame.with_fields(fields)
            })
            .collect()
    }

    fn dump(&self) -> String {
        format!(
            "rename-by-regex {} => {}",
            self.regex.as_ref().map(|r| r.as_str()).unwrap_or(""),
            self.rename_pattern
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::{transformation::test_utils::apply, Field};

    #[test]
    fn test_rename() {
        let frames = vec![DataFrame::new(vec![
            Field::number("server1.cpu", [1.0]),
            Field::number("server2.mem", [1.0]),
            Field::number("total", [1.0]),
        ])
        .unwrap()];
        let ret = apply(
            "renameByRegex",
            json!({"regex": "/^(SERVER\\d)\\.(.*)$/i", "renamePattern": "$2 on ${1}"}),
            &frames,
        );
        let names: Vec<_> = ret[0].fields().iter().map(|f| f.display_name()).collect();
        assert_eq!(names, vec!["cpu on server1", "mem on server2", "total"]);
        // Underlying names are kept
        assert_eq!(ret[0].fields()[0].name, "server1.cpu");
        assert_eq!(apply("renameByRegex", json!({}), &frames), frames);
    }
}
