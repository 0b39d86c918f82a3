//! The in-memory metric representation handed to outputs on flush.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::ser::{Serialize, Serializer};
use std::fmt;

mod field;
pub mod tagmap;

pub use self::field::FieldValue;

/// Tags of a metric: string keys to string values.
pub type TagMap = self::tagmap::TagMap<String, String>;
/// Fields of a metric: string keys to dynamically typed values.
pub type FieldMap = self::tagmap::TagMap<String, FieldValue>;

/// The semantic kind of a metric.
///
/// On the wire a `ValueType` is the collector's numeric code, see
/// `ValueType::code`. Decoding also accepts the lowercase name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    /// Monotonically increasing count
    Counter,
    /// Point-in-time value
    Gauge,
    /// No declared kind
    Untyped,
    /// Pre-computed quantiles
    Summary,
    /// Pre-computed buckets
    Histogram,
}

impl Default for ValueType {
    fn default() -> ValueType {
        ValueType::Untyped
    }
}

impl ValueType {
    /// The numeric code stored in the `type` attribute of a document.
    pub fn code(&self) -> u8 {
        match *self {
            ValueType::Counter => 1,
            ValueType::Gauge => 2,
            ValueType::Untyped => 3,
            ValueType::Summary => 4,
            ValueType::Histogram => 5,
        }
    }

    /// Inverse of `code`.
    pub fn from_code(code: u64) -> Option<ValueType> {
        match code {
            1 => Some(ValueType::Counter),
            2 => Some(ValueType::Gauge),
            3 => Some(ValueType::Untyped),
            4 => Some(ValueType::Summary),
            5 => Some(ValueType::Histogram),
            _ => None,
        }
    }

    /// Look a `ValueType` up by its lowercase name.
    pub fn from_name(name: &str) -> Option<ValueType> {
        match name {
            "counter" => Some(ValueType::Counter),
            "gauge" => Some(ValueType::Gauge),
            "untyped" => Some(ValueType::Untyped),
            "summary" => Some(ValueType::Summary),
            "histogram" => Some(ValueType::Histogram),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            ValueType::Counter => "counter",
            ValueType::Gauge => "gauge",
            ValueType::Untyped => "untyped",
            ValueType::Summary => "summary",
            ValueType::Histogram => "histogram",
        };
        f.write_str(name)
    }
}

impl Serialize for ValueType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.code())
    }
}

struct ValueTypeVisitor;

impl<'de> Visitor<'de> for ValueTypeVisitor {
    type Value = ValueType;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a value type code between 1 and 5 or its name")
    }

    fn visit_u64<E>(self, v: u64) -> Result<ValueType, E>
    where
        E: de::Error,
    {
        ValueType::from_code(v)
            .ok_or_else(|| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    fn visit_i64<E>(self, v: i64) -> Result<ValueType, E>
    where
        E: de::Error,
    {
        if v < 0 {
            return Err(E::invalid_value(de::Unexpected::Signed(v), &self));
        }
        self.visit_u64(v as u64)
    }

    fn visit_str<E>(self, v: &str) -> Result<ValueType, E>
    where
        E: de::Error,
    {
        ValueType::from_name(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for ValueType {
    fn deserialize<D>(deserializer: D) -> Result<ValueType, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueTypeVisitor)
    }
}

fn default_time() -> DateTime<Utc> {
    Utc::now()
}

/// A single collected measurement.
///
/// Metrics are built once by the collector and not changed afterwards; the
/// builder-style methods below consume and return `self`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// The name of the measurement
    pub name: String,
    /// Tags identifying the series
    #[serde(default)]
    pub tags: TagMap,
    /// The measured values
    #[serde(default)]
    pub fields: FieldMap,
    /// The instant the measurement was taken
    #[serde(default = "default_time")]
    pub time: DateTime<Utc>,
    /// The semantic kind of the measurement
    #[serde(rename = "type", default)]
    pub kind: ValueType,
}

impl Metric {
    /// Make a new, untyped metric with no tags or fields, stamped now.
    ///
    /// # Examples
    ///
    /// ```
    /// use arangosink::metric::{FieldValue, Metric, ValueType};
    ///
    /// let m = Metric::new("cpu").field("usage", 0.5).gauge();
    ///
    /// assert_eq!(m.name, "cpu");
    /// assert_eq!(m.kind, ValueType::Gauge);
    /// assert_eq!(m.fields.get(&"usage".to_string()), Some(&FieldValue::Float(0.5)));
    /// ```
    pub fn new<S>(name: S) -> Metric
    where
        S: Into<String>,
    {
        Metric {
            name: name.into(),
            tags: TagMap::default(),
            fields: FieldMap::default(),
            time: Utc::now(),
            kind: ValueType::Untyped,
        }
    }

    /// Set the time of the metric
    pub fn time(mut self, time: DateTime<Utc>) -> Metric {
        self.time = time;
        self
    }

    /// Set the kind of the metric
    pub fn kind(mut self, kind: ValueType) -> Metric {
        self.kind = kind;
        self
    }

    /// Mark the metric as a counter
    pub fn counter(self) -> Metric {
        self.kind(ValueType::Counter)
    }

    /// Mark the metric as a gauge
    pub fn gauge(self) -> Metric {
        self.kind(ValueType::Gauge)
    }

    /// Overlay a specific key / value pair in self's tags
    ///
    /// If the key was already present in the tag map the value will be
    /// replaced, else it will be inserted.
    pub fn overlay_tag<S>(mut self, key: S, val: S) -> Metric
    where
        S: Into<String>,
    {
        self.tags.insert(key.into(), val.into());
        self
    }

    /// Set a field, replacing any previous value under the same key.
    pub fn field<S, V>(mut self, key: S, val: V) -> Metric
    where
        S: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key.into(), val.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json;

    #[test]
    fn value_type_codes_round_trip() {
        for kind in &[
            ValueType::Counter,
            ValueType::Gauge,
            ValueType::Untyped,
            ValueType::Summary,
            ValueType::Histogram,
        ] {
            assert_eq!(Some(*kind), ValueType::from_code(u64::from(kind.code())));
            assert_eq!(Some(*kind), ValueType::from_name(&kind.to_string()));
        }
        assert_eq!(None, ValueType::from_code(0));
        assert_eq!(None, ValueType::from_code(6));
    }

    #[test]
    fn decode_metric_from_json_line() {
        let line = r#"{"name":"cpu","tags":{"host":"a"},"fields":{"usage":0.5,"cores":4},"time":"1990-06-12T09:10:11Z","type":"gauge"}"#;
        let m: Metric = serde_json::from_str(line).unwrap();

        assert_eq!(m.name, "cpu");
        assert_eq!(m.tags.get(&"host".to_string()), Some(&"a".to_string()));
        assert_eq!(
            m.fields.get(&"usage".to_string()),
            Some(&FieldValue::Float(0.5))
        );
        assert_eq!(
            m.fields.get(&"cores".to_string()),
            Some(&FieldValue::Integer(4))
        );
        assert_eq!(m.time, Utc.ymd(1990, 6, 12).and_hms(9, 10, 11));
        assert_eq!(m.kind, ValueType::Gauge);
    }

    #[test]
    fn decode_accepts_numeric_type_and_defaults() {
        let m: Metric = serde_json::from_str(r#"{"name":"mem","type":1}"#).unwrap();
        assert_eq!(m.kind, ValueType::Counter);
        assert!(m.tags.is_empty());
        assert!(m.fields.is_empty());

        let m: Metric = serde_json::from_str(r#"{"name":"mem"}"#).unwrap();
        assert_eq!(m.kind, ValueType::Untyped);

        assert!(serde_json::from_str::<Metric>(r#"{"name":"mem","type":9}"#).is_err());
        assert!(serde_json::from_str::<Metric>(r#"{"name":"mem","type":"bogus"}"#).is_err());
    }

    #[test]
    fn overlay_tag_replaces() {
        let mut m = Metric::new("foo");
        assert!(m.tags.is_empty());

        m = m.overlay_tag("foo", "bar");
        assert_eq!(Some(&"bar".into()), m.tags.get(&String::from("foo")));

        m = m.overlay_tag("foo", "22");
        assert_eq!(Some(&"22".into()), m.tags.get(&String::from("foo")));
    }
}
