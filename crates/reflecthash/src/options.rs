use serde::{Deserialize, Serialize};

/// Call-time hashing options. Applies to every field of the traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct HashOptions {
    /// Key each field by the hash of its name instead of its number.
    ///
    /// Name keys make a message hash equal to the hash of its JSON rendering.
    pub use_field_names_as_keys: bool,
}

impl HashOptions {
    /// Options with every setting at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects name-based (`true`) or number-based (`false`) field keys.
    pub fn with_field_names_as_keys(mut self, enabled: bool) -> Self {
        self.use_field_names_as_keys = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let options: HashOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, HashOptions::default());
        assert!(!options.use_field_names_as_keys);
    }

    #[test]
    fn deserializes_field_name_switch() {
        let options: HashOptions =
            serde_json::from_str(r#"{"use_field_names_as_keys": true}"#).unwrap();
        assert_eq!(options, HashOptions::new().with_field_names_as_keys(true));
    }
}
