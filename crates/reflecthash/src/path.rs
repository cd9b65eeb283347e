use std::fmt;

/// Location of a value inside a message tree, used for error context.
///
/// Renders as `root` for the top-level message, otherwise e.g. `a.b[2]` or `m{"k"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Path of the top-level message.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Descends into a named field.
    pub fn push_field(&self, field: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(field.to_string());
        Self { segments }
    }

    /// Descends into a list element.
    pub fn push_index(&self, index: usize) -> Self {
        self.push_suffix(format!("[{}]", index))
    }

    /// Descends into a map entry, identified by its rendered key.
    pub fn push_key(&self, key: &str) -> Self {
        self.push_suffix(format!("{{{}}}", key))
    }

    fn push_suffix(&self, suffix: String) -> Self {
        let mut segments = self.segments.clone();
        match segments.last_mut() {
            Some(last) => last.push_str(&suffix),
            None => segments.push(suffix),
        }
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "root")
        } else {
            write!(f, "{}", self.segments.join("."))
        }
    }
}
