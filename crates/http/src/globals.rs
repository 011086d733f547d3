//! Server environment snapshot.
//!
//! [`Globals`] is an explicit, inert capture of the request environment a
//! server binding hands over: server variables, query/form/cookie
//! parameters, raw uploaded-file descriptors and the raw request body
//! bytes. [`crate::ServerRequest::from_globals`] and
//! [`crate::Uri::from_globals`] are pure functions over this snapshot;
//! nothing in the crate reads ambient process state.
//!
//! `BTreeMap` keeps ingestion deterministic: header synthesis walks the
//! server variables in key order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A snapshot of the inbound request environment.
///
/// Field names follow the conventional CGI/server variable vocabulary
/// (`REQUEST_METHOD`, `SERVER_PROTOCOL`, `HTTP_*` header entries, ...).
/// Snapshots serialize cleanly, which is how test fixtures and bindings
/// in other processes hand them over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Globals {
    /// Server and CGI variables.
    pub server: BTreeMap<String, String>,
    /// Decoded query-string parameters.
    pub query: BTreeMap<String, String>,
    /// Decoded form-body parameters.
    pub form: BTreeMap<String, String>,
    /// Cookie parameters.
    pub cookies: BTreeMap<String, String>,
    /// Raw uploaded-file descriptors, possibly nested per form field
    /// (see [`crate::upload::normalize`]).
    pub files: Map<String, Value>,
    /// Raw request body bytes.
    pub input: Vec<u8>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a server variable, treating an empty value as absent the
    /// way server bindings conventionally do.
    pub fn server_get(&self, key: &str) -> Option<&str> {
        self.server.get(key).map(String::as_str).filter(|value| !value.is_empty())
    }

    /// Inserts a server variable. Convenience for building snapshots in
    /// tests and bindings.
    pub fn set_server(&mut self, key: &str, value: &str) -> &mut Self {
        self.server.insert(key.to_owned(), value.to_owned());
        self
    }
}
