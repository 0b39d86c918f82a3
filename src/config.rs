//! Provides the CLI option parser
//!
//! Used to parse the argv/config file into a struct that
//! the agent can consume and use as configuration data.

use clap::{App, Arg};
use sink::ArangoDBConfig;
use std::error;
use std::fmt;
use std::fs::File;
use std::io;
use std::io::Read;
use toml;

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

fn default_version() -> String {
    VERSION.unwrap_or("unknown").to_string()
}

/// Errors raised while reading configuration.
#[derive(Debug)]
pub enum Error {
    /// The configuration file could not be read.
    Io(io::Error),
    /// The configuration file is not valid TOML.
    Toml(toml::de::Error),
    /// A required key is absent.
    Missing(String),
    /// A key holds a value of the wrong type.
    Type {
        /// Full path of the key
        key: String,
        /// What the key should have held
        expected: &'static str,
    },
    /// No output is registered under this name.
    UnknownOutput(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref e) => write!(f, "could not read config file: {}", e),
            Error::Toml(ref e) => write!(f, "could not parse config file: {}", e),
            Error::Missing(ref key) => write!(f, "missing required key {}", key),
            Error::Type { ref key, expected } => {
                write!(f, "could not parse {}, expected {}", key, expected)
            }
            Error::UnknownOutput(ref name) => write!(f, "unknown output '{}'", name),
        }
    }
}

impl error::Error for Error {
    fn description(&self) -> &str {
        match *self {
            Error::Io(_) => "could not read config file",
            Error::Toml(_) => "could not parse config file",
            Error::Missing(_) => "missing required key",
            Error::Type { .. } => "key has the wrong type",
            Error::UnknownOutput(_) => "unknown output",
        }
    }

    fn cause(&self) -> Option<&error::Error> {
        match *self {
            Error::Io(ref e) => Some(e),
            Error::Toml(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Error {
        Error::Toml(e)
    }
}

/// One configured output, not yet built.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputConfig {
    /// The registry name of the output, e.g. `arangodb`
    pub name: String,
    /// Where in the config file the output was declared, e.g.
    /// `outputs.arangodb` or `outputs.arangodb.1`
    pub config_path: String,
    /// The output's own table
    pub table: toml::Value,
}

/// Configuration struct for the arangosink executable
///
/// This struct is what we construct from parsing the configuration. Please
/// see documentation on `parse_args` in this module for more details.
#[derive(Debug)]
pub struct Args {
    /// The number of metrics the agent buffers before flushing to its
    /// outputs.
    pub flush_batch_size: usize,
    /// The verbosity setting. The higher the value the more chatty we get.
    pub verbose: u64,
    /// Version string. This is set automatically.
    pub version: String,
    /// Outputs in the order they were declared.
    pub outputs: Vec<OutputConfig>,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            flush_batch_size: 1_000,
            verbose: 0,
            version: default_version(),
            outputs: Vec::new(),
        }
    }
}

/// Parse the arangosink configuration arguments
///
/// This function will read the environment arguments and construct an
/// `Args`. Most configuration will be stored in an on-disk file. See
/// `arangosink --help` for more information.
pub fn parse_args() -> Result<Args, Error> {
    let args = App::new("arangosink")
        .version(VERSION.unwrap_or("unknown"))
        .about("ship metrics read from stdin into ArangoDB")
        .arg(
            Arg::with_name("config-file")
                .long("config")
                .short("C")
                .value_name("config")
                .required(true)
                .help("The config file to feed in.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Turn on verbose output."),
        )
        .get_matches();

    let verb = args.occurrences_of("verbose");

    let filename = args.value_of("config-file").unwrap_or_default();
    let mut fp = File::open(filename)?;
    let mut buffer = String::new();
    fp.read_to_string(&mut buffer)?;
    parse_config_file(&buffer, verb)
}

/// Parse the arangosink configuration file.
///
/// Top-level keys configure the agent. Each `[outputs.<name>]` table, or
/// each element of an `[[outputs.<name>]]` array, declares one output.
pub fn parse_config_file(buffer: &str, verbosity: u64) -> Result<Args, Error> {
    let mut args = Args::default();
    let value: toml::Value = toml::from_str(buffer)?;

    args.verbose = verbosity;

    args.flush_batch_size = match value.get("flush-batch-size") {
        Some(fbs) => match fbs.as_integer() {
            Some(i) if i > 0 => i as usize,
            _ => {
                return Err(Error::Type {
                    key: "flush-batch-size".to_string(),
                    expected: "positive integer",
                })
            }
        },
        None => args.flush_batch_size,
    };

    if let Some(outputs) = value.get("outputs") {
        let outputs = outputs.as_table().ok_or_else(|| Error::Type {
            key: "outputs".to_string(),
            expected: "table",
        })?;
        for (name, declared) in outputs.iter() {
            let config_path = format!("outputs.{}", name);
            match *declared {
                toml::Value::Table(_) => args.outputs.push(OutputConfig {
                    name: name.clone(),
                    config_path: config_path,
                    table: declared.clone(),
                }),
                toml::Value::Array(ref tables) => for (idx, table) in tables.iter().enumerate() {
                    let config_path = format!("{}.{}", config_path, idx);
                    if !table.is_table() {
                        return Err(Error::Type {
                            key: config_path,
                            expected: "table",
                        });
                    }
                    args.outputs.push(OutputConfig {
                        name: name.clone(),
                        config_path: config_path,
                        table: table.clone(),
                    });
                },
                _ => {
                    return Err(Error::Type {
                        key: config_path,
                        expected: "table or array of tables",
                    })
                }
            }
        }
    }

    Ok(args)
}

fn get_str(table: &toml::Value, config_path: &str, key: &str) -> Result<Option<String>, Error> {
    match table.get(key) {
        Some(v) => v.as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| Error::Type {
                key: format!("{}.{}", config_path, key),
                expected: "string",
            }),
        None => Ok(None),
    }
}

fn require_str(table: &toml::Value, config_path: &str, key: &str) -> Result<String, Error> {
    get_str(table, config_path, key)?
        .ok_or_else(|| Error::Missing(format!("{}.{}", config_path, key)))
}

/// Parse the table of an ArangoDB output.
///
/// `database` and `collection` are required. `use_batch_format` defaults to
/// true.
pub fn parse_arangodb(config_path: &str, table: &toml::Value) -> Result<ArangoDBConfig, Error> {
    let mut res = ArangoDBConfig::default();

    res.url = get_str(table, config_path, "url")?.unwrap_or(res.url);
    res.username = get_str(table, config_path, "username")?.unwrap_or(res.username);
    res.password = get_str(table, config_path, "password")?.unwrap_or(res.password);
    res.database = require_str(table, config_path, "database")?;
    res.collection = require_str(table, config_path, "collection")?;

    res.use_batch_format = match table.get("use_batch_format") {
        Some(ubf) => ubf.as_bool().ok_or_else(|| Error::Type {
            key: format!("{}.use_batch_format", config_path),
            expected: "boolean",
        })?,
        None => res.use_batch_format,
    };

    Ok(res)
}
