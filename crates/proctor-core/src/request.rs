use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Abstract description of the HTTP request a test case drives through the
/// processor.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpRequestSpec {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scheme: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub authority: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, with = "crate::text", skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<u8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub trailers: BTreeMap<String, String>,
    /// Drive the REQUEST_BODY phase (only when the body is non-empty).
    #[serde(default)]
    pub send_body: bool,
    /// Drive the REQUEST_TRAILERS phase (only when trailers are non-empty).
    #[serde(default)]
    pub send_trailers: bool,
}

impl HttpRequestSpec {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn body_follows(&self) -> bool {
        self.send_body && !self.body.is_empty()
    }

    pub fn trailers_follow(&self) -> bool {
        self.send_trailers && !self.trailers.is_empty()
    }
}
