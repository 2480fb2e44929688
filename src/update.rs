//! Authenticated overwrite of the JSON datasets.
//!
//! A request names one of the configured files, carries a bearer token and
//! a JSON body whose key layout must match the file's template. Checks run
//! in a fixed order and the first failure decides the response.

use crate::config::UpdateConfig;
use crate::error::UpdateError;
use axum::http::{header, HeaderMap, Method};
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use sha2::Sha256;
use std::path::PathBuf;
use tracing::{info, warn};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone)]
pub struct UpdateTarget {
    pub key: String,
    pub target: PathBuf,
    pub template: PathBuf,
}

#[derive(Debug, Clone)]
pub struct UpdateRegistry {
    token: String,
    targets: Vec<UpdateTarget>,
}

impl UpdateRegistry {
    pub fn new(token: impl Into<String>, targets: Vec<UpdateTarget>) -> Self {
        Self {
            token: token.into(),
            targets,
        }
    }

    pub fn from_config(config: &UpdateConfig) -> Self {
        let targets = config
            .files
            .iter()
            .map(|f| UpdateTarget {
                key: f.key.clone(),
                target: f.target.clone(),
                template: f.template.clone(),
            })
            .collect();
        Self::new(config.token.clone(), targets)
    }

    pub fn target(&self, key: &str) -> Option<&UpdateTarget> {
        self.targets.iter().find(|t| t.key == key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.key.clone()).collect()
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), UpdateError> {
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix(BEARER_PREFIX))
            .ok_or(UpdateError::MissingAuthorization)?;
        // An unset token locks the endpoint.
        if !self.token.is_empty() && token_matches(&self.token, presented) {
            Ok(())
        } else {
            Err(UpdateError::InvalidToken)
        }
    }

    /// Validate and write one update; returns the target that was written.
    pub async fn apply(
        &self,
        method: &Method,
        headers: &HeaderMap,
        file_key: Option<&str>,
        body: &[u8],
    ) -> Result<&UpdateTarget, UpdateError> {
        self.authorize(headers)?;

        if *method != Method::POST {
            return Err(UpdateError::MethodNotAllowed);
        }

        let target = file_key
            .and_then(|key| self.target(key))
            .ok_or_else(|| UpdateError::UnknownFile { allowed: self.keys() })?;

        let input: Value =
            serde_json::from_slice(body).map_err(|e| UpdateError::InvalidJson(e.to_string()))?;

        let template_text = match tokio::fs::read(&target.template).await {
            Ok(bytes) => bytes,
            Err(_) => return Err(UpdateError::TemplateMissing(target.template.clone())),
        };
        let template: Value = serde_json::from_slice(&template_text)
            .map_err(|_| UpdateError::TemplateUnparseable(target.template.clone()))?;

        if !structure_matches(&input, &template) {
            return Err(UpdateError::StructureMismatch);
        }

        let pretty = to_pretty_json(&input).map_err(|e| UpdateError::WriteFailed {
            path: target.target.clone(),
            source: std::io::Error::other(e),
        })?;
        tokio::fs::write(&target.target, pretty)
            .await
            .map_err(|source| UpdateError::WriteFailed {
                path: target.target.clone(),
                source,
            })?;

        info!(file = %target.key, path = ?target.target, "dataset updated");
        Ok(target)
    }
}

pub fn success_message(key: &str) -> String {
    format!("File '{key}' updated successfully.")
}

/// Constant-time token comparison: both sides go through the same keyed
/// MAC and the tags are checked with `verify_slice`.
pub fn token_matches(expected: &str, presented: &str) -> bool {
    let tag = |input: &str| {
        let mut mac = Hmac::<Sha256>::new_from_slice(expected.as_bytes()).ok()?;
        mac.update(input.as_bytes());
        Some(mac)
    };
    let (Some(expected_mac), Some(presented_mac)) = (tag(expected), tag(presented)) else {
        return false;
    };
    let expected_tag = expected_mac.finalize().into_bytes();
    presented_mac.verify_slice(&expected_tag).is_ok()
}

/// Top-level shape check of an update body against its template.
///
/// Objects compare key sets recursively; arrays at the top compare by
/// length; any other body is a mismatch.
pub fn structure_matches(data: &Value, template: &Value) -> bool {
    match (data, template) {
        (Value::Object(d), Value::Object(t)) => keys_match(d, t),
        (Value::Array(d), Value::Array(t)) => d.len() == t.len(),
        _ => false,
    }
}

/// Same keys at this level, then recurse wherever both sides hold objects.
/// Arrays are not descended into.
pub fn keys_match(data: &Map<String, Value>, template: &Map<String, Value>) -> bool {
    let mut data_keys: Vec<&String> = data.keys().collect();
    let mut template_keys: Vec<&String> = template.keys().collect();
    data_keys.sort();
    template_keys.sort();
    if data_keys != template_keys {
        return false;
    }

    template.iter().all(|(key, expected)| match (expected, data.get(key)) {
        (Value::Object(t), Some(Value::Object(d))) => keys_match(d, t),
        _ => true,
    })
}

/// Four-space indented JSON, non-ASCII left as is.
pub fn to_pretty_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

/// Log a rejected update with its reason.
pub fn log_rejection(file_key: Option<&str>, err: &UpdateError) {
    warn!(file = file_key.unwrap_or("-"), status = err.status().as_u16(), "update rejected: {}", err);
}
