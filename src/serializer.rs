//! Turning metrics into bytes.

use metric::Metric;
use serde_json;

/// A serializer as handed to outputs.
pub type BoxedSerializer = Box<Serializer + Send>;

/// Encodes a single metric.
pub trait Serializer {
    /// Encode `metric`.
    fn serialize(&self, metric: &Metric) -> Result<Vec<u8>, serde_json::Error>;
}

/// Newline delimited JSON, one object per metric. This is also the format
/// the agent reads on its input.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, metric: &Metric) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = serde_json::to_vec(metric)?;
        buf.push(b'\n');
        Ok(buf)
    }
}
