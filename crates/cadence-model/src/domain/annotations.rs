use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{AnnotationValue, RebootState};

/// String key–value annotations attached to a machine.
///
/// Values are kept verbatim: `"true"` and `"True"` are different values, and a missing key
/// is distinct from any present value.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotations(BTreeMap<String, String>);

impl Annotations {
    /// Create an empty annotation set.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns `true` if no annotations are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of annotations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Insert or overwrite an annotation.
    ///
    /// Returns `self` for chaining.
    pub fn insert<K, V>(&mut self, key: K, val: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(key.into(), val.into());
        self
    }

    /// Builder-style variant of [`Annotations::insert`].
    pub fn with<K, V>(mut self, key: K, val: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.insert(key, val);
        self
    }

    /// Get the raw value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    /// Typed view of a single key.
    pub fn value(&self, key: &str) -> AnnotationValue {
        AnnotationValue::from_raw(self.get(key))
    }

    /// Typed view of the four reboot coordination keys.
    pub fn reboot_state(&self) -> RebootState {
        RebootState::from_annotations(self)
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merge(&mut self, other: &Annotations) {
        for (k, v) in other.iter() {
            self.0.insert(k.to_string(), v.to_string());
        }
    }

    /// Iterate through all annotations as `(&str, &str)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for Annotations {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Annotations
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
