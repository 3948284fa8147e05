//! Query-string builder for endpoint requests

use std::fmt;

/// Ordered query string
///
/// Parameters render in insertion order: the first is prefixed with `?`,
/// every following one with `&`. Flags render as a bare key with no `=`.
/// Values are written verbatim. Setting a key twice replaces the value in
/// its original position, so a parameter never appears more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    params: Vec<(String, Option<String>)>,
}

impl QueryString {
    /// Create an empty query string
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `key=value` parameter
    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, Some(value.into()));
        self
    }

    /// Append a `key=value` parameter when a value is present
    pub fn param_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    /// Append a bare `key` flag when `enabled`
    pub fn flag(mut self, key: &str, enabled: bool) -> Self {
        if enabled {
            self.set(key, None);
        }
        self
    }

    /// Check if no parameters were added
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    fn set(&mut self, key: &str, value: Option<String>) {
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value,
            None => self.params.push((key.to_string(), value)),
        }
    }
}

impl fmt::Display for QueryString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (key, value)) in self.params.iter().enumerate() {
            f.write_str(if index == 0 { "?" } else { "&" })?;
            f.write_str(key)?;
            if let Some(value) = value {
                write!(f, "={}", value)?;
            }
        }
        Ok(())
    }
}
