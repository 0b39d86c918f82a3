use serde::ser::{Error, Serialize, Serializer};

/// The value of a single metric field.
///
/// Fields are an open, dynamically typed map in the collector. Each value
/// is one of the scalars below and is passed through to the document store
/// verbatim, without coercion. A `Float` that is NaN or infinite has no
/// JSON form and fails to serialize.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A boolean field
    Boolean(bool),
    /// A signed integer field
    Integer(i64),
    /// An unsigned integer field too large for `Integer`
    Unsigned(u64),
    /// A floating point field
    Float(f64),
    /// A string field
    String(String),
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match *self {
            FieldValue::Boolean(b) => serializer.serialize_bool(b),
            FieldValue::Integer(i) => serializer.serialize_i64(i),
            FieldValue::Unsigned(u) => serializer.serialize_u64(u),
            FieldValue::Float(x) if x.is_finite() => serializer.serialize_f64(x),
            FieldValue::Float(x) => Err(S::Error::custom(format!(
                "field value {} is not a finite number",
                x
            ))),
            FieldValue::String(ref s) => serializer.serialize_str(s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> FieldValue {
        FieldValue::Float(x)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> FieldValue {
        FieldValue::Integer(i)
    }
}

impl From<u64> for FieldValue {
    fn from(u: u64) -> FieldValue {
        FieldValue::Unsigned(u)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> FieldValue {
        FieldValue::Boolean(b)
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> FieldValue {
        FieldValue::String(s)
    }
}

impl<'a> From<&'a str> for FieldValue {
    fn from(s: &'a str) -> FieldValue {
        FieldValue::String(s.to_string())
    }
}
