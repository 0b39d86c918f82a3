//! Outputs: where flushed metrics go.
//!
//! An output is driven by the host in a fixed order: `connect` once, then
//! `write` once per flush, then `close`. Outputs are built by name through a
//! `Registry` from their configuration table.

use config;
use metric::Metric;
use serde_json;
use serializer::BoxedSerializer;
use std::collections::HashMap;
use std::error;
use std::fmt;
use store;
use toml;

pub mod arangodb;

pub use self::arangodb::{ArangoDB, ArangoDBConfig};

/// Errors an output hands back to the host.
#[derive(Debug)]
pub enum Error {
    /// The endpoint is malformed or unreachable.
    Transport(store::Error),
    /// The store refused an existence check or a create during connect.
    Backend(store::Error),
    /// Documents could not be written. In per-document mode this is the last
    /// failure seen during the flush.
    Write(store::Error),
    /// `write` was called before a successful `connect`.
    NotConnected,
    /// A metric could not be encoded as a document.
    Encode(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Transport(ref e) => write!(f, "transport error: {}", e),
            Error::Backend(ref e) => write!(f, "backend error: {}", e),
            Error::Write(ref e) => write!(f, "write error: {}", e),
            Error::NotConnected => write!(f, "output is not connected"),
            Error::Encode(ref e) => write!(f, "could not encode entry: {}", e),
        }
    }
}

impl error::Error for Error {
    fn description(&self) -> &str {
        match *self {
            Error::Transport(_) => "transport error",
            Error::Backend(_) => "backend error",
            Error::Write(_) => "write error",
            Error::NotConnected => "output is not connected",
            Error::Encode(_) => "could not encode entry",
        }
    }

    fn cause(&self) -> Option<&error::Error> {
        match *self {
            Error::Transport(ref e) | Error::Backend(ref e) | Error::Write(ref e) => Some(e),
            Error::Encode(ref e) => Some(e),
            Error::NotConnected => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Encode(e)
    }
}

/// The contract between the host and an output.
pub trait Output {
    /// Hand the output the host's serializer. Outputs that send structured
    /// documents may ignore it.
    fn set_serializer(&mut self, serializer: BoxedSerializer);
    /// Prepare the output for writing. Safe to call more than once.
    fn connect(&mut self) -> Result<(), Error>;
    /// Release whatever `connect` acquired.
    fn close(&mut self) -> Result<(), Error>;
    /// Persist one flush worth of metrics, in order.
    fn write(&mut self, metrics: &[Metric]) -> Result<(), Error>;
    /// Annotated example configuration.
    fn sample_config(&self) -> &'static str;
    /// One line description.
    fn description(&self) -> &'static str;
}

/// An output as owned by the host.
pub type BoxedOutput = Box<Output + Send>;

/// Builds an output from its config path and configuration table.
pub type Creator = fn(&str, &toml::Value) -> Result<BoxedOutput, config::Error>;

/// Output constructors by name.
///
/// The host looks outputs up here instead of relying on load-time
/// registration.
pub struct Registry {
    creators: HashMap<&'static str, Creator>,
}

impl Default for Registry {
    fn default() -> Registry {
        Registry::new()
    }
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Registry {
        Registry {
            creators: HashMap::new(),
        }
    }

    /// A registry holding every output this crate ships.
    pub fn builtin() -> Registry {
        let mut registry = Registry::new();
        registry.add("arangodb", arangodb::create);
        registry
    }

    /// Register `creator` under `name`, replacing any previous creator.
    pub fn add(&mut self, name: &'static str, creator: Creator) {
        if self.creators.insert(name, creator).is_some() {
            warn!("output '{}' registered twice, keeping the latest", name);
        }
    }

    /// The registered output names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.creators.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the output registered as `name`.
    pub fn create(
        &self,
        name: &str,
        config_path: &str,
        table: &toml::Value,
    ) -> Result<BoxedOutput, config::Error> {
        match self.creators.get(name) {
            Some(creator) => creator(config_path, table),
            None => Err(config::Error::UnknownOutput(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_knows_arangodb() {
        let registry = Registry::builtin();
        assert_eq!(vec!["arangodb"], registry.names());

        let table: toml::Value = toml::from_str(
            r#"
url = "http://127.0.0.1:8529"
database = "logdb"
collection = "log_data"
"#,
        ).unwrap();
        let output = registry
            .create("arangodb", "outputs.arangodb", &table)
            .unwrap();
        assert_eq!("Send metrics to ArangoDB", output.description());
        assert!(output.sample_config().contains("use_batch_format = true"));
    }

    #[test]
    fn errors_chain_to_their_cause() {
        use std::error::Error as StdError;
        use std::io;

        let e = Error::Write(store::Error::Io(io::Error::new(io::ErrorKind::Other, "reset")));
        assert_eq!("write error", e.description());
        let cause = e.cause().unwrap();
        assert_eq!("i/o failure: reset", cause.to_string());
        assert!(cause.cause().is_some());
        assert!(Error::NotConnected.cause().is_none());
    }

    #[test]
    fn unknown_output_is_an_error() {
        let registry = Registry::builtin();
        let table = toml::Value::Table(toml::value::Table::new());
        match registry.create("mongodb", "outputs.mongodb", &table) {
            Err(config::Error::UnknownOutput(ref name)) => assert_eq!("mongodb", name),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("unknown output was built"),
        }
    }

    #[test]
    fn creator_errors_propagate() {
        let registry = Registry::builtin();
        let table: toml::Value = toml::from_str(r#"url = "http://127.0.0.1:8529""#).unwrap();
        match registry.create("arangodb", "outputs.arangodb", &table) {
            Err(config::Error::Missing(ref key)) => assert_eq!("outputs.arangodb.database", key),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("incomplete config accepted"),
        }
    }
}
