use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DataError;

/// Keyword arguments, passed to transforms and through to codecs verbatim.
///
/// Every value is stored in serialized form, so a record holding a `Kwargs`
/// can always be written to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kwargs(BTreeMap<String, Value>);

impl Kwargs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument, serializing it immediately.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Result<Self, DataError> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn insert(&mut self, key: &str, value: impl Serialize) -> Result<(), DataError> {
        let value = serde_json::to_value(value).map_err(|e| DataError::UnserializableArgument {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.0.insert(key.to_string(), value);
        Ok(())
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Typed lookup; a missing key or a value of the wrong shape is an error.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, DataError> {
        let value = self.0.get(key).ok_or_else(|| DataError::InvalidArgument {
            key: key.to_string(),
            reason: "missing".to_string(),
        })?;
        serde_json::from_value(value.clone()).map_err(|e| DataError::InvalidArgument {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Typed lookup falling back to `default` when the key is absent.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, DataError> {
        if self.contains(key) {
            self.get(key)
        } else {
            Ok(default)
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<BTreeMap<String, Value>> for Kwargs {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_with_and_get() {
        let kw = Kwargs::new()
            .with("factor", 2)
            .unwrap()
            .with("label", "x")
            .unwrap();
        assert_eq!(kw.get::<i64>("factor").unwrap(), 2);
        assert_eq!(kw.get_str("label"), Some("x"));
        assert_eq!(kw.get_or("missing", 7u8).unwrap(), 7);
        assert_eq!(kw.len(), 2);
    }

    #[test]
    fn test_missing_and_wrong_type() {
        let kw = Kwargs::new().with("factor", "two").unwrap();
        assert!(matches!(
            kw.get::<i64>("factor"),
            Err(DataError::InvalidArgument { .. })
        ));
        assert!(matches!(
            kw.get::<i64>("other"),
            Err(DataError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_unserializable_argument() {
        // JSON object keys must be strings
        let mut bad = HashMap::new();
        bad.insert(vec![1u8, 2], 3);
        let err = Kwargs::new().with("lookup", bad).unwrap_err();
        assert!(matches!(err, DataError::UnserializableArgument { ref key, .. } if key == "lookup"));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let kw = Kwargs::new().with("factor", 2).unwrap();
        assert_eq!(serde_json::to_string(&kw).unwrap(), r#"{"factor":2}"#);
    }
}
