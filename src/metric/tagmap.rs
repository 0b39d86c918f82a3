//! tagmap is the ordered map of key, value pairs that sits inside each
//! `metric::Metric`. Think of it as a specialized map. Tags and fields both
//! live in one, the former holding strings and the latter `FieldValue`s.

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::cmp;
use std::fmt;
use std::marker::PhantomData;
use std::slice::Iter;

/// The tagmap key, value collection. Behaves similarly to
/// `std::collections::BTreeMap` but with a specialized implementation for
/// fast searching over a small collection. Keys are unique and kept sorted.
#[derive(Clone, Debug, PartialEq)]
pub struct TagMap<K, V> {
    inner: Vec<(K, V)>,
}

impl<K, V> TagMap<K, V>
where
    K: cmp::Ord,
{
    /// Create a `tagmap::Iter`.
    pub fn iter(&self) -> Iter<(K, V)> {
        self.inner.iter()
    }

    /// Get a value from the tagmap, if it exists.
    pub fn get(&self, key: &K) -> Option<&V> {
        match self.inner.binary_search_by(|probe| probe.0.cmp(key)) {
            Ok(idx) => Some(&self.inner[idx].1),
            Err(_) => None,
        }
    }

    /// Determine if the tagmap is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Insert a key / value into self
    ///
    /// This method will return the value previously stored under the given key,
    /// if there was such a value.
    pub fn insert(&mut self, key: K, val: V) -> Option<V> {
        match self.inner.binary_search_by(|probe| probe.0.cmp(&key)) {
            Ok(idx) => {
                self.inner.push((key, val));
                let old = self.inner.swap_remove(idx);
                Some(old.1)
            }
            Err(idx) => {
                self.inner.insert(idx, (key, val));
                None
            }
        }
    }

    /// Return the length of the tagmap. This is the total number of key /
    /// values stored in the map.
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> Default for TagMap<K, V> {
    fn default() -> TagMap<K, V> {
        TagMap {
            inner: Vec::with_capacity(15),
        }
    }
}

impl<K, V> Serialize for TagMap<K, V>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.inner.len()))?;
        for &(ref k, ref v) in &self.inner {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct TagMapVisitor<K, V> {
    marker: PhantomData<fn() -> TagMap<K, V>>,
}

impl<'de, K, V> Visitor<'de> for TagMapVisitor<K, V>
where
    K: Deserialize<'de> + cmp::Ord,
    V: Deserialize<'de>,
{
    type Value = TagMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut map = TagMap::default();
        while let Some((key, value)) = access.next_entry()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, K, V> Deserialize<'de> for TagMap<K, V>
where
    K: Deserialize<'de> + cmp::Ord,
    V: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(TagMapVisitor {
            marker: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::TagMap;
    use quickcheck::{QuickCheck, TestResult};
    use serde_json;
    use std::collections::BTreeMap;

    #[test]
    fn insert_replaces_existing_value() {
        let mut tags: TagMap<String, String> = TagMap::default();
        assert_eq!(None, tags.insert("host".into(), "a".into()));
        assert_eq!(Some("a".into()), tags.insert("host".into(), "b".into()));
        assert_eq!(1, tags.len());
        assert_eq!(Some(&"b".to_string()), tags.get(&"host".to_string()));
    }

    #[test]
    fn serializes_as_json_object() {
        let mut tags: TagMap<String, String> = TagMap::default();
        tags.insert("zone".into(), "b".into());
        tags.insert("host".into(), "a".into());

        let encoded = serde_json::to_string(&tags).unwrap();
        assert_eq!(r#"{"host":"a","zone":"b"}"#, encoded);

        let decoded: TagMap<String, String> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(tags, decoded);
    }

    #[test]
    fn behaves_like_btreemap() {
        fn inner(pairs: Vec<(String, String)>, lookups: Vec<String>) -> TestResult {
            let mut tags: TagMap<String, String> = TagMap::default();
            let mut model: BTreeMap<String, String> = BTreeMap::new();
            for (k, v) in pairs {
                assert_eq!(model.insert(k.clone(), v.clone()), tags.insert(k, v));
            }
            for k in lookups {
                assert_eq!(model.get(&k), tags.get(&k));
            }
            assert_eq!(model.len(), tags.len());
            let ours: Vec<(String, String)> = tags.iter().cloned().collect();
            let theirs: Vec<(String, String)> = model.into_iter().collect();
            assert_eq!(theirs, ours);
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(10000)
            .quickcheck(inner as fn(Vec<(String, String)>, Vec<String>) -> TestResult);
    }
}
