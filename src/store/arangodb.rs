//! ArangoDB over its HTTP API.
//!
//! Every request goes to `<endpoint>/_db/<database>/_api/...`. Databases are
//! created through the `_system` database. Credentials, when given, travel
//! as HTTP basic auth on each request, so a bad password surfaces on the
//! first request rather than when the client is built.

use hyper::client::Client;
use hyper::header::{Authorization, Basic, ContentType};
use hyper::method::Method;
use hyper::status::StatusCode;
use serde_json;
use serde_json::Value;
use std::io::Read;
use store::{BoxedDocumentStore, Connector, DocumentStore, Error, ItemError};
use url::Url;

const SYSTEM_DATABASE: &str = "_system";

#[derive(Debug, Default, Deserialize)]
struct ArangoError {
    #[serde(rename = "errorNum")]
    error_num: Option<i64>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

/// Blocking ArangoDB client.
pub struct ArangoClient {
    client: Client,
    endpoint: Url,
    auth: Option<Basic>,
}

impl ArangoClient {
    /// Build a client for `endpoint`, e.g. `http://127.0.0.1:8529`.
    ///
    /// No request is made here. Fails if the endpoint is not an http URL.
    pub fn new(endpoint: &str, username: &str, password: &str) -> Result<ArangoClient, Error> {
        let endpoint = Url::parse(endpoint)?;
        if endpoint.scheme() != "http" {
            return Err(Error::UnsupportedScheme(endpoint.scheme().to_string()));
        }
        let auth = if username.is_empty() {
            None
        } else {
            Some(Basic {
                username: username.to_string(),
                password: Some(password.to_string()),
            })
        };
        Ok(ArangoClient {
            client: Client::new(),
            endpoint: endpoint,
            auth: auth,
        })
    }

    fn url(&self, database: &str, path: &[&str]) -> Result<Url, Error> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url.path_segments_mut()
                .map_err(|_| Error::UnsupportedScheme(self.endpoint.scheme().to_string()))?;
            segments
                .pop_if_empty()
                .push("_db")
                .push(database)
                .push("_api")
                .extend(path);
        }
        Ok(url)
    }

    fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&str>,
    ) -> Result<(StatusCode, String), Error> {
        trace!("{} {}", method, url);
        let mut request = self.client.request(method, url);
        if let Some(ref auth) = self.auth {
            request = request.header(Authorization(auth.clone()));
        }
        if let Some(body) = body {
            request = request.header(ContentType::json()).body(body);
        }
        let mut response = request.send()?;
        let mut buf = String::new();
        response.read_to_string(&mut buf)?;
        Ok((response.status, buf))
    }

    fn exists(&self, url: Url) -> Result<bool, Error> {
        let (status, body) = self.send(Method::Get, url, None)?;
        if status.is_success() {
            Ok(true)
        } else if status == StatusCode::NotFound {
            Ok(false)
        } else {
            Err(status_error(status, &body))
        }
    }

    fn post(&self, url: Url, payload: &Value) -> Result<String, Error> {
        let payload = serde_json::to_string(payload)?;
        let (status, body) = self.send(Method::Post, url, Some(&payload))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(status_error(status, &body))
        }
    }
}

fn status_error(status: StatusCode, body: &str) -> Error {
    let decoded: ArangoError = serde_json::from_str(body).unwrap_or_default();
    Error::Status {
        code: status.to_u16(),
        error_num: decoded.error_num,
        message: decoded
            .error_message
            .unwrap_or_else(|| status.to_string()),
    }
}

/// Pull the refused documents out of a bulk create response.
///
/// The response is an array parallel to the request. Stored documents carry
/// their `_key`, refused ones `"error": true` plus `errorNum` and
/// `errorMessage`.
fn item_errors(body: &str) -> Vec<ItemError> {
    let items: Vec<Value> = match serde_json::from_str(body) {
        Ok(items) => items,
        Err(e) => {
            warn!("could not decode bulk create response: {}", e);
            return Vec::new();
        }
    };
    items
        .iter()
        .enumerate()
        .filter(|&(_, item)| item.get("error").and_then(Value::as_bool).unwrap_or(false))
        .map(|(index, item)| ItemError {
            index: index,
            error_num: item.get("errorNum").and_then(Value::as_i64),
            message: item.get("errorMessage")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        })
        .collect()
}

impl DocumentStore for ArangoClient {
    fn database_exists(&self, database: &str) -> Result<bool, Error> {
        let url = self.url(database, &["database", "current"])?;
        self.exists(url)
    }

    fn create_database(&self, database: &str) -> Result<(), Error> {
        let url = self.url(SYSTEM_DATABASE, &["database"])?;
        self.post(url, &json!({ "name": database })).map(|_| ())
    }

    fn collection_exists(&self, database: &str, collection: &str) -> Result<bool, Error> {
        let url = self.url(database, &["collection", collection])?;
        self.exists(url)
    }

    fn create_collection(&self, database: &str, collection: &str) -> Result<(), Error> {
        let url = self.url(database, &["collection"])?;
        self.post(url, &json!({ "name": collection })).map(|_| ())
    }

    fn create_document(
        &self,
        database: &str,
        collection: &str,
        document: &Value,
    ) -> Result<(), Error> {
        let url = self.url(database, &["document", collection])?;
        self.post(url, document).map(|_| ())
    }

    fn create_documents(
        &self,
        database: &str,
        collection: &str,
        documents: &[Value],
    ) -> Result<Vec<ItemError>, Error> {
        let url = self.url(database, &["document", collection])?;
        let payload = serde_json::to_string(documents)?;
        let (status, body) = self.send(Method::Post, url, Some(&payload))?;
        if status.is_success() {
            Ok(item_errors(&body))
        } else {
            Err(status_error(status, &body))
        }
    }
}

/// Opens `ArangoClient`s.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    fn open(
        &self,
        endpoint: &str,
        username: &str,
        password: &str,
    ) -> Result<BoxedDocumentStore, Error> {
        let client = ArangoClient::new(endpoint, username, password)?;
        Ok(Box::new(client))
    }
}
