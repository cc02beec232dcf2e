//! Fingerprints - SHA-256 over Canonical JSON
//!
//! Two records with the same content always share a fingerprint, whatever
//! order their variables were declared or loaded in.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::templates::PromptTemplate;
use crate::variables::Bindings;

/// Lowercase hex SHA-256 digest
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Compact JSON with object keys in byte order at every depth
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&canonicalize(serde_json::to_value(value)?))
}

// serde_json keeps insertion order when `preserve_order` is enabled anywhere
// in the build, so keys are re-sorted explicitly.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(key, inner)| (key, canonicalize(inner)))
                .collect();
            Value::Object(sorted.into_iter().collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

fn digest<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(canonical_json(value)?.as_bytes()))
}

/// Content fingerprint of a stored record
pub fn fingerprint(record: &PromptTemplate) -> Result<String, serde_json::Error> {
    digest(record)
}

#[derive(Serialize)]
struct RenderRequest<'a> {
    prompt: &'a PromptTemplate,
    bindings: &'a Bindings,
}

/// Fingerprint of one render request: the full record plus caller bindings.
/// Equal fingerprints mean the rendered text is equal too.
pub fn render_fingerprint(
    record: &PromptTemplate,
    bindings: &Bindings,
) -> Result<String, serde_json::Error> {
    digest(&RenderRequest {
        prompt: record,
        bindings,
    })
}
