//! The document store an output persists into.
//!
//! `DocumentStore` names the six operations a sink needs from a store:
//! existence checks and creation for databases and collections plus single
//! and bulk document creation. `Connector` opens a store for an endpoint.
//! Production code uses the ArangoDB HTTP client in `store::arangodb`;
//! tests substitute recording fakes.

use hyper;
use serde_json;
use serde_json::Value;
use std::error;
use std::fmt;
use std::io;
use url;

pub mod arangodb;

pub use self::arangodb::{ArangoClient, HttpConnector};

/// Errors raised while talking to a document store.
#[derive(Debug)]
pub enum Error {
    /// The endpoint could not be parsed as a URL.
    Url(url::ParseError),
    /// The endpoint uses a scheme the client cannot speak.
    UnsupportedScheme(String),
    /// The HTTP exchange itself failed: refused, reset, unresolvable.
    Http(hyper::Error),
    /// Reading a response body failed.
    Io(io::Error),
    /// The store answered with a non-success status.
    Status {
        /// HTTP status code of the response
        code: u16,
        /// The store's own error number, when it sent one
        error_num: Option<i64>,
        /// Human readable explanation
        message: String,
    },
    /// A request or response body was not the JSON we expected.
    Json(serde_json::Error),
}

impl Error {
    /// Is this a failure to reach or address the endpoint, as opposed to the
    /// store refusing a request?
    pub fn is_transport(&self) -> bool {
        match *self {
            Error::Url(_) | Error::UnsupportedScheme(_) | Error::Http(_) | Error::Io(_) => {
                true
            }
            Error::Status { .. } | Error::Json(_) => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Url(ref e) => write!(f, "malformed endpoint: {}", e),
            Error::UnsupportedScheme(ref s) => write!(f, "unsupported endpoint scheme '{}'", s),
            Error::Http(ref e) => write!(f, "http failure: {}", e),
            Error::Io(ref e) => write!(f, "i/o failure: {}", e),
            Error::Status {
                code,
                error_num: Some(num),
                ref message,
            } => write!(f, "store responded {} (error {}): {}", code, num, message),
            Error::Status {
                code,
                error_num: None,
                ref message,
            } => write!(f, "store responded {}: {}", code, message),
            Error::Json(ref e) => write!(f, "bad json: {}", e),
        }
    }
}

impl error::Error for Error {
    fn description(&self) -> &str {
        match *self {
            Error::Url(_) => "malformed endpoint",
            Error::UnsupportedScheme(_) => "unsupported endpoint scheme",
            Error::Http(_) => "http failure",
            Error::Io(_) => "i/o failure",
            Error::Status { .. } => "store responded with an error",
            Error::Json(_) => "bad json",
        }
    }

    fn cause(&self) -> Option<&error::Error> {
        match *self {
            Error::Url(ref e) => Some(e),
            Error::Http(ref e) => Some(e),
            Error::Io(ref e) => Some(e),
            Error::Json(ref e) => Some(e),
            Error::UnsupportedScheme(_) | Error::Status { .. } => None,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Error {
        Error::Url(e)
    }
}

impl From<hyper::Error> for Error {
    fn from(e: hyper::Error) -> Error {
        Error::Http(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Json(e)
    }
}

/// A document the store refused inside an otherwise successful bulk create.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemError {
    /// Position of the document in the submitted batch
    pub index: usize,
    /// The store's error number, if any
    pub error_num: Option<i64>,
    /// Human readable explanation
    pub message: String,
}

/// The operations an output needs from a document store.
pub trait DocumentStore {
    /// Does the named database exist?
    fn database_exists(&self, database: &str) -> Result<bool, Error>;
    /// Create the named database.
    fn create_database(&self, database: &str) -> Result<(), Error>;
    /// Does the named collection exist in `database`?
    fn collection_exists(&self, database: &str, collection: &str) -> Result<bool, Error>;
    /// Create the named collection in `database`.
    fn create_collection(&self, database: &str, collection: &str) -> Result<(), Error>;
    /// Store one document.
    fn create_document(
        &self,
        database: &str,
        collection: &str,
        document: &Value,
    ) -> Result<(), Error>;
    /// Store many documents in one request. `Err` means the request as a
    /// whole failed; documents the store refused individually come back in
    /// the `Ok` vector.
    fn create_documents(
        &self,
        database: &str,
        collection: &str,
        documents: &[Value],
    ) -> Result<Vec<ItemError>, Error>;
}

/// A store as owned by an output.
pub type BoxedDocumentStore = Box<DocumentStore + Send>;

/// Opens a `DocumentStore` for an endpoint.
pub trait Connector {
    /// Build a client for `endpoint` authenticating as `username`. An empty
    /// username means anonymous access.
    fn open(
        &self,
        endpoint: &str,
        username: &str,
        password: &str,
    ) -> Result<BoxedDocumentStore, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(Error::UnsupportedScheme("ftp".into()).is_transport());
        assert!(Error::Io(io::Error::new(io::ErrorKind::Other, "reset")).is_transport());
        assert!(Error::Url(url::ParseError::EmptyHost).is_transport());
        assert!(
            !Error::Status {
                code: 401,
                error_num: None,
                message: "not authorized".into(),
            }.is_transport()
        );
    }

    #[test]
    fn status_display_includes_error_num() {
        let e = Error::Status {
            code: 409,
            error_num: Some(1207),
            message: "duplicate name".into(),
        };
        assert_eq!("store responded 409 (error 1207): duplicate name", e.to_string());
    }
}
