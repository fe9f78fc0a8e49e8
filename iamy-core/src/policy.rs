//! Policy document codec.
//!
//! A [`PolicyDocument`] is an opaque, ordered JSON object. It is read from and
//! written to YAML as a nested mapping, rendered as compact or pretty JSON, and
//! percent-encoded for the IAM API, which sends and expects URL-encoded JSON.
//! IAM semantics (Effect, Action, Resource, ...) are never interpreted here.

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{IamyError, Result};

/// Bytes left unescaped by [`PolicyDocument::encode`]: RFC 3986 unreserved characters.
const POLICY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// An IAM policy body.
///
/// Keys keep their insertion order so dumped files stay stable, but equality
/// compares documents as values: two documents with the same keys and values in
/// a different order are equal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyDocument(Map<String, Value>);

impl PolicyDocument {
    /// Parse a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| IamyError::policy_document(format!("Failed to parse JSON: {e}")))?;
        Self::try_from(value)
    }

    /// Decode the URL-encoded JSON returned by the IAM API.
    ///
    /// `+` is accepted as an encoded space, as in query strings.
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        let plus_decoded = encoded.replace('+', " ");
        let json = percent_decode_str(&plus_decoded).decode_utf8().map_err(|e| {
            IamyError::policy_document(format!("Failed to URL decode policy document: {e}"))
        })?;
        Self::from_json(&json)
    }

    /// Compact JSON.
    pub fn to_json(&self) -> String {
        // A map of JSON values with string keys always serializes.
        Value::Object(self.0.clone()).to_string()
    }

    /// Two-space indented JSON, for display.
    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.0)
            .map_err(|e| IamyError::policy_document(format!("Failed to serialize policy: {e}")))
    }

    /// Percent-encoded compact JSON, the wire form IAM expects.
    pub fn encode(&self) -> String {
        utf8_percent_encode(&self.to_json(), POLICY_ENCODE_SET).to_string()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Value> for PolicyDocument {
    type Error = IamyError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(IamyError::policy_document(format!(
                "Expected a JSON object, found {other}"
            ))),
        }
    }
}

impl From<Map<String, Value>> for PolicyDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<PolicyDocument> for Value {
    fn from(doc: PolicyDocument) -> Self {
        Self::Object(doc.0)
    }
}

impl fmt::Display for PolicyDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}
