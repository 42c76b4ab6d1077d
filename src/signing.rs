//! Request signatures for the dealer portal.
//!
//! Every call carries a `signcode` header: the SHA-256 hex digest of
//! `path + canonical(body) + secret`. GET requests canonicalize the body as
//! a form-encoded query string; every other method uses the JSON body with
//! everything but ASCII letters and digits stripped and `null` removed.

use crate::errors::AppError;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Computes portal signatures with a fixed shared-secret suffix.
#[derive(Debug, Clone)]
pub struct Signer {
    secret: String,
}

impl Signer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Signs a request body. `method` is matched case-insensitively.
    pub fn signcode<B: Serialize + ?Sized>(
        &self,
        method: &str,
        path: &str,
        body: &B,
    ) -> Result<String, AppError> {
        let canonical = if method.eq_ignore_ascii_case("get") {
            let value = serde_json::to_value(body)?;
            form_encode(&value)?
        } else {
            let json = serde_json::to_string(body)?;
            sanitize_json(&json)
        };

        Ok(sha256_hex(&format!("{}{}{}", path, canonical, self.secret)))
    }
}

fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Keeps ASCII alphanumerics of the serialized body, then drops `null`.
///
/// Non-ASCII characters are first written as their `\uXXXX` escapes, so
/// they contribute `uXXXX` to the canonical form.
pub fn sanitize_json(json: &str) -> String {
    let mut kept = String::with_capacity(json.len());
    let mut units = [0u16; 2];
    for c in json.chars() {
        if c.is_ascii_alphanumeric() {
            kept.push(c);
        } else if !c.is_ascii() {
            for unit in c.encode_utf16(&mut units) {
                kept.push('u');
                kept.push_str(&format!("{:04x}", unit));
            }
        }
    }
    kept.replace("null", "")
}

/// Form-encodes the top-level pairs of a JSON object in field order.
/// Values must be scalars; nested objects and arrays are rejected.
fn form_encode(value: &Value) -> Result<String, AppError> {
    let map = match value {
        Value::Object(map) => map,
        Value::Null => return Ok(String::new()),
        other => {
            return Err(AppError::InvalidInput(format!(
                "GET signature needs an object body, got {}",
                other
            )))
        }
    };

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in map {
        serializer.append_pair(key, &query_value(key, value)?);
    }
    Ok(serializer.finish())
}

fn query_value(key: &str, value: &Value) -> Result<String, AppError> {
    Ok(match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => {
            return Err(AppError::InvalidInput(format!(
                "GET signature field '{}' must be a scalar",
                key
            )))
        }
    })
}
