//! `ArangoDB` is a multi-model document database.
//!
//! This output stores every metric of a flush as one document in a
//! configured collection, creating the database and collection on connect
//! when they are missing.

use chrono::{DateTime, Utc};
use config;
use metric::{FieldMap, Metric, TagMap, ValueType};
use serde_json;
use serde_json::Value;
use serializer::BoxedSerializer;
use sink::{BoxedOutput, Error, Output};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use store::{self, BoxedDocumentStore, Connector, HttpConnector};
use toml;

lazy_static! {
    /// Total documents stored
    pub static ref ARANGODB_DOCUMENTS_WRITTEN: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total documents that failed in per-document mode
    pub static ref ARANGODB_DOCUMENT_FAILURES: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total bulk requests that failed as a whole
    pub static ref ARANGODB_BATCH_FAILURES: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
    /// Total documents refused individually inside a bulk request
    pub static ref ARANGODB_BULK_ITEM_FAILURES: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
}

/// Annotated example configuration for this output.
pub const SAMPLE_CONFIG: &str = r#"
  ## ArangoDB URL to connect to
  url = "http://192.168.1.100:8529"

  ## Username to connect to ArangoDB, leave empty for anonymous access
  username = "user"
  ## Password to connect to ArangoDB
  password = "password"

  ## Database to write metrics to, created if missing
  database = "logdb"

  ## Collection to write metrics to, created if missing
  collection = "log_data"

  ## Insert each flush with a single bulk request. When false every metric
  ## is inserted on its own and failures do not stop the rest of the flush.
  use_batch_format = true
"#;

const DESCRIPTION: &str = "Send metrics to ArangoDB";

/// Configuration for the ArangoDB output
#[derive(Clone, Debug, PartialEq)]
pub struct ArangoDBConfig {
    /// The ArangoDB endpoint
    pub url: String,
    /// User to authenticate as. Empty for anonymous access.
    pub username: String,
    /// Password of `username`
    pub password: String,
    /// The database documents are stored in
    pub database: String,
    /// The collection documents are stored in
    pub collection: String,
    /// Insert a flush with one bulk request rather than one request per
    /// metric.
    pub use_batch_format: bool,
}

impl Default for ArangoDBConfig {
    fn default() -> Self {
        ArangoDBConfig {
            url: "http://127.0.0.1:8529".to_string(),
            username: String::new(),
            password: String::new(),
            database: String::new(),
            collection: String::new(),
            use_batch_format: true,
        }
    }
}

/// The document stored for a single metric.
///
/// Borrows from the metric it was made from and lives only as long as the
/// write that needs it.
#[derive(Debug, PartialEq, Serialize)]
pub struct Entry<'a> {
    /// Name of the metric
    pub name: &'a str,
    /// Tags of the metric
    pub tags: &'a TagMap,
    /// Fields of the metric, verbatim
    pub fields: &'a FieldMap,
    /// Time of the metric
    pub time: DateTime<Utc>,
    /// Kind of the metric
    #[serde(rename = "type")]
    pub kind: ValueType,
}

impl<'a> From<&'a Metric> for Entry<'a> {
    fn from(metric: &'a Metric) -> Entry<'a> {
        Entry {
            name: &metric.name,
            tags: &metric.tags,
            fields: &metric.fields,
            time: metric.time,
            kind: metric.kind,
        }
    }
}

// Enables testability of the global statics when tests are run in parallel.
trait StatsCollector {
    fn increment_written(&self, inc: usize);
    fn increment_document_failed(&self, inc: usize);
    fn increment_batch_failed(&self, inc: usize);
    fn increment_item_failed(&self, inc: usize);
    fn get_written(&self) -> usize {
        0
    }
    fn get_document_failed(&self) -> usize {
        0
    }
    fn get_batch_failed(&self) -> usize {
        0
    }
    fn get_item_failed(&self) -> usize {
        0
    }
}

struct DefaultStatsCollector;
impl StatsCollector for DefaultStatsCollector {
    fn increment_written(&self, inc: usize) {
        ARANGODB_DOCUMENTS_WRITTEN.fetch_add(inc, Ordering::Relaxed);
    }
    fn increment_document_failed(&self, inc: usize) {
        ARANGODB_DOCUMENT_FAILURES.fetch_add(inc, Ordering::Relaxed);
    }
    fn increment_batch_failed(&self, inc: usize) {
        ARANGODB_BATCH_FAILURES.fetch_add(inc, Ordering::Relaxed);
    }
    fn increment_item_failed(&self, inc: usize) {
        ARANGODB_BULK_ITEM_FAILURES.fetch_add(inc, Ordering::Relaxed);
    }
}

/// A store whose database and collection are known to exist.
struct Handle {
    store: BoxedDocumentStore,
    database: String,
    collection: String,
}

/// The ArangoDB output.
///
/// Refer to the documentation on `ArangoDBConfig` for more details.
pub struct ArangoDB {
    config: ArangoDBConfig,
    connector: Box<Connector + Send>,
    /// Set by the first successful `connect`, never cleared.
    handle: Option<Handle>,
    /// Held for the host contract, documents do not go through it.
    serializer: Option<BoxedSerializer>,
    stats: Box<StatsCollector + Send + Sync>,
}

/// Build an `ArangoDB` output from its configuration table.
pub fn create(config_path: &str, table: &toml::Value) -> Result<BoxedOutput, config::Error> {
    let config = config::parse_arangodb(config_path, table)?;
    Ok(Box::new(ArangoDB::new(config)))
}

/// Encode `metric` as its document. Fails for non-finite float fields,
/// which have no JSON form.
fn document(metric: &Metric) -> Result<Value, Error> {
    serde_json::to_value(Entry::from(metric)).map_err(Error::Encode)
}

fn classify(err: store::Error) -> Error {
    if err.is_transport() {
        Error::Transport(err)
    } else {
        Error::Backend(err)
    }
}

impl ArangoDB {
    /// Construct a new ArangoDB output talking HTTP.
    ///
    /// Nothing is contacted until `connect`.
    pub fn new(config: ArangoDBConfig) -> ArangoDB {
        ArangoDB::with_connector(config, Box::new(HttpConnector))
    }

    /// Construct a new ArangoDB output opening its store through
    /// `connector`.
    pub fn with_connector(config: ArangoDBConfig, connector: Box<Connector + Send>) -> ArangoDB {
        ArangoDB {
            config: config,
            connector: connector,
            handle: None,
            serializer: None,
            stats: Box::new(DefaultStatsCollector),
        }
    }

    /// Has `connect` succeeded?
    pub fn is_ready(&self) -> bool {
        self.handle.is_some()
    }

    fn open(&self) -> Result<Handle, Error> {
        let store = self.connector
            .open(&self.config.url, &self.config.username, &self.config.password)
            .map_err(|e| {
                error!("Failed to create HTTP connection to {}: {}", self.config.url, e);
                Error::Transport(e)
            })?;

        let database = &self.config.database;
        let exists = store.database_exists(database).map_err(|e| {
            error!("Could not check if database '{}' exists: {}", database, e);
            classify(e)
        })?;
        if !exists {
            info!("Database '{}' does not exist, creating it", database);
            store.create_database(database).map_err(|e| {
                error!("Failed to create database '{}': {}", database, e);
                classify(e)
            })?;
        }

        let collection = &self.config.collection;
        let exists = store
            .collection_exists(database, collection)
            .map_err(|e| {
                error!("Failed to check if collection '{}' exists: {}", collection, e);
                classify(e)
            })?;
        if !exists {
            info!("Collection '{}' does not exist, creating it", collection);
            store
                .create_collection(database, collection)
                .map_err(|e| {
                    error!("Failed to create collection '{}': {}", collection, e);
                    classify(e)
                })?;
        }

        Ok(Handle {
            store: store,
            database: database.clone(),
            collection: collection.clone(),
        })
    }

    fn write_batch(&self, handle: &Handle, metrics: &[Metric]) -> Result<(), Error> {
        let mut documents: Vec<Value> = Vec::with_capacity(metrics.len());
        for metric in metrics {
            match document(metric) {
                Ok(doc) => documents.push(doc),
                Err(e) => {
                    error!(
                        "Could not encode entry '{}', dropping {} entries: {}",
                        metric.name,
                        metrics.len(),
                        e
                    );
                    self.stats.increment_batch_failed(1);
                    return Err(e);
                }
            }
        }

        match handle
            .store
            .create_documents(&handle.database, &handle.collection, &documents)
        {
            Ok(refused) => {
                for item in &refused {
                    match item.error_num {
                        Some(num) => error!(
                            "Could not write entry {} (error {}): {}",
                            item.index, num, item.message
                        ),
                        None => error!("Could not write entry {}: {}", item.index, item.message),
                    }
                }
                self.stats
                    .increment_written(documents.len().saturating_sub(refused.len()));
                self.stats.increment_item_failed(refused.len());
                Ok(())
            }
            Err(e) => {
                error!("Could not write {} entries: {}", documents.len(), e);
                self.stats.increment_batch_failed(1);
                Err(Error::Write(e))
            }
        }
    }

    fn write_each(&self, handle: &Handle, metrics: &[Metric]) -> Result<(), Error> {
        let mut last_error = None;
        let mut written = 0;
        for metric in metrics {
            let res = document(metric).and_then(|doc| {
                handle
                    .store
                    .create_document(&handle.database, &handle.collection, &doc)
                    .map_err(Error::Write)
            });
            match res {
                Ok(()) => written += 1,
                Err(e) => {
                    error!("Could not write entry '{}': {}", metric.name, e);
                    self.stats.increment_document_failed(1);
                    last_error = Some(e);
                }
            }
        }
        self.stats.increment_written(written);
        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Output for ArangoDB {
    fn set_serializer(&mut self, serializer: BoxedSerializer) {
        self.serializer = Some(serializer);
    }

    fn connect(&mut self) -> Result<(), Error> {
        let handle = self.open()?;
        debug!(
            "Connected to {}, writing to {}/{}",
            self.config.url, handle.database, handle.collection
        );
        self.handle = Some(handle);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn write(&mut self, metrics: &[Metric]) -> Result<(), Error> {
        let handle = match self.handle {
            Some(ref handle) => handle,
            None => {
                error!("Write of {} metrics before connect", metrics.len());
                return Err(Error::NotConnected);
            }
        };
        if metrics.is_empty() {
            return Ok(());
        }
        if self.config.use_batch_format {
            self.write_batch(handle, metrics)
        } else {
            self.write_each(handle, metrics)
        }
    }

    fn sample_config(&self) -> &'static str {
        SAMPLE_CONFIG
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }
}
