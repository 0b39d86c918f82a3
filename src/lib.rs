//! arangosink ships collected metrics into ArangoDB.
//!
//! The heart of the crate is the `ArangoDB` output in `sink::arangodb`. A
//! host connects it once, hands it a flush of metrics at a time and closes it
//! at shutdown. On connect the output makes sure the configured database and
//! collection exist, creating them when they do not. Each flush is then
//! stored as documents of the shape
//!
//! ```text
//! {"name": ..., "tags": {...}, "fields": {...}, "time": ..., "type": ...}
//! ```
//!
//! either with a single bulk request or one request per metric.
//!
//! Around it sit the pieces needed to run it standalone: the metric model,
//! the document store client, TOML configuration, an output registry and a
//! small agent that reads newline delimited JSON metrics from stdin.
#![allow(unknown_lints)]
#![deny(trivial_numeric_casts, missing_docs, unstable_features, unused_import_braces)]
extern crate chrono;
extern crate clap;
extern crate hyper;
extern crate serde;
#[macro_use]
extern crate serde_json;
extern crate toml;
extern crate url;

#[macro_use]
extern crate log;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
extern crate tempdir;

pub mod agent;
pub mod config;
pub mod metric;
pub mod serializer;
pub mod sink;
pub mod store;
