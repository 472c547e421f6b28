use std::fmt::{Debug, Display};

use regex::{Regex, RegexBuilder};
use tracing::{debug, error};

use crate::TransformError;

/// Log if the result is an error
pub trait Logged {
    fn log(self) -> Self;
}

impl<T: Sized, E: Display> Logged for Result<T, E> {
    fn log(self) -> Self {
        match &self {
            Ok(_) => {}
            Err(e) => error!("{}", e),
        }
        self
    }
}

/// Call a function by using the object as the receiver.
/// e.g. show some logs when a pipeline has been built
pub trait Appliable
where
    Self: Sized,
{
    /// Call function that may mutate the state of `self`
    fn apply<F>(self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        f(self)
    }

    /// Call function that doesn't mutate the state of `self`
    fn then<F>(self, f: F) -> Self
    where
        F: FnOnce(&Self),
    {
        f(&self);
        self
    }
}

/// Every sized type can be applied
impl<T> Appliable for T where T: Sized {}

/// Ignore field from `Debug` auto trait
pub struct IgnoreDebug<T> {
    pub inner: T,
}

impl<T> Debug for IgnoreDebug<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("...")
    }
}

impl<T> Clone for IgnoreDebug<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Compile a user supplied pattern.
/// Both plain patterns and the `/pattern/flags` form are accepted, supported flags are `i`, `m`, `s` and `x`.
pub(crate) fn compile_regex(pattern: &str) -> Result<Regex, TransformError> {
    let (body, flags) = match pattern.strip_prefix('/').and_then(|p| p.rsplit_once('/')) {
        Some((body, flags)) if flags.chars().all(|c| "gimsuxy".contains(c)) => (body, flags),
        _ => (pattern, ""),
    };
    RegexBuilder::new(body)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .ignore_whitespace(flags.contains('x'))
        .build()
        .map_err(|e| TransformError::InvalidRegex(pattern.to_string(), e.to_string()))
}

/// Read a local file or fetch a http(s) URL
pub async fn load_file(path: &str) -> Result<String, TransformError> {
    debug!("Reading file at {}", path);
    Ok(if path.starts_with("http:") || path.starts_with("https:") {
        let resp = reqwest::get(path)
            .await
            .log()
            .map_err(|e| TransformError::HttpError(e.to_string()))?
            .error_for_status()
            .log()
            .map_err(|e| TransformError::HttpError(e.to_string()))?;
        resp.text()
            .await
            .log()
            .map_err(|e| TransformError::HttpError(e.to_string()))
    } else {
        tokio::fs::read_to_string(path)
            .await
            .log()
            .map_err(|e| TransformError::IoError(format!("{}: {}", path, e)))
    }?
    .then(|s| {
        debug!(
            "Successfully read file at {}, file length is {}",
            path,
            s.len()
        );
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_regex() {
        let re = compile_regex("/^temp/i").unwrap();
        assert!(re.is_match("Temperature"));
        let re = compile_regex("^temp").unwrap();
        assert!(!re.is_match("Temperature"));
        let re = compile_regex("a/b").unwrap();
        assert!(re.is_match("a/b"));
        assert!(matches!(
            compile_regex("(unclosed"),
            Err(TransformError::InvalidRegex(_, _))
        ));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        assert!(matches!(
            load_file("/nonexistent/frames.json").await,
            Err(TransformError::IoError(_))
        ));
    }
}
