//! Snapshot document serialization.
//!
//! The on-disk snapshot is a JSON document with two top-level sections:
//! `models` (model name → version id → record fields) and `latest`
//! (model name → version id):
//!
//! ```json
//! {
//!   "models": {
//!     "test_model": {
//!       "abc123": {
//!         "commit_hash": "abc123",
//!         "storage_uri": "test_model/abc123.pt",
//!         "file_size": 1024,
//!         "file_extension": "pt",
//!         "created_at": 1754438400
//!       }
//!     }
//!   },
//!   "latest": { "test_model": "abc123" }
//! }
//! ```
//!
//! Version order within a model is insertion order and must survive a
//! round-trip, hence `serde_json` with `preserve_order`. Parsing validates
//! the full index invariant: every model has at least one record, every
//! latest pointer names a record in its own model's history.

use crate::error::{ErrorKind, Result};
use crate::index::{ModelHistory, VersionIndex};
use crate::models::VersionRecord;
use exn::{OptionExt, ResultExt};
use serde_json::{Map, Value};
use std::collections::HashMap;
use time::UtcDateTime;

const MODELS_KEY: &str = "models";
const LATEST_KEY: &str = "latest";

fn corrupt(message: impl Into<String>) -> ErrorKind {
    ErrorKind::CorruptIndex(message.into())
}

/// Serialize the index into snapshot bytes. Models are written sorted by
/// name so identical indexes produce identical documents.
pub(crate) fn render(index: &VersionIndex) -> Result<Vec<u8>> {
    let mut models = Map::new();
    let mut latest = Map::new();
    let mut names: Vec<&String> = index.models.keys().collect();
    names.sort();
    for name in names {
        let history = &index.models[name.as_str()];
        let mut versions = Map::new();
        for record in &history.records {
            versions.insert(record.version_id.clone(), record_to_value(record));
        }
        models.insert(name.clone(), Value::Object(versions));
        latest.insert(name.clone(), Value::String(history.latest.clone()));
    }
    let mut document = Map::new();
    document.insert(MODELS_KEY.to_string(), Value::Object(models));
    document.insert(LATEST_KEY.to_string(), Value::Object(latest));
    serde_json::to_vec_pretty(&Value::Object(document))
        .or_raise(|| corrupt("index not serializable as JSON"))
}

/// Parse snapshot bytes into an index, validating shape and invariants.
pub(crate) fn parse(bytes: &[u8]) -> Result<VersionIndex> {
    let document: Value =
        serde_json::from_slice(bytes).or_raise(|| corrupt("snapshot is not valid JSON"))?;
    let root = document.as_object().ok_or_raise(|| corrupt("snapshot root is not an object"))?;
    let models_section = root
        .get(MODELS_KEY)
        .and_then(Value::as_object)
        .ok_or_raise(|| corrupt("missing or malformed `models` section"))?;
    let latest_section = root
        .get(LATEST_KEY)
        .and_then(Value::as_object)
        .ok_or_raise(|| corrupt("missing or malformed `latest` section"))?;

    let mut models = HashMap::new();
    for (model_name, versions_value) in models_section {
        let versions = versions_value
            .as_object()
            .ok_or_raise(|| corrupt(format!("history of `{model_name}` is not an object")))?;
        if versions.is_empty() {
            exn::bail!(corrupt(format!("model `{model_name}` has no versions")));
        }
        let mut records = Vec::with_capacity(versions.len());
        for (version_id, record_value) in versions {
            records.push(record_from_value(model_name, version_id, record_value)?);
        }
        let latest = latest_section
            .get(model_name)
            .and_then(Value::as_str)
            .ok_or_raise(|| corrupt(format!("no latest pointer for model `{model_name}`")))?;
        if !records.iter().any(|record| record.version_id == latest) {
            exn::bail!(corrupt(format!(
                "latest pointer of `{model_name}` names unrecorded version `{latest}`"
            )));
        }
        models.insert(model_name.clone(), ModelHistory { records, latest: latest.to_string() });
    }
    for model_name in latest_section.keys() {
        if !models.contains_key(model_name) {
            exn::bail!(corrupt(format!("latest pointer for unknown model `{model_name}`")));
        }
    }
    Ok(VersionIndex { models })
}

fn record_to_value(record: &VersionRecord) -> Value {
    let mut fields = Map::new();
    fields.insert("commit_hash".to_string(), Value::String(record.version_id.clone()));
    fields.insert("storage_uri".to_string(), Value::String(record.remote_key.clone()));
    fields.insert("file_size".to_string(), Value::Number(record.byte_size.into()));
    fields.insert("file_extension".to_string(), Value::String(record.file_extension.clone()));
    fields.insert("created_at".to_string(), Value::Number(record.created_at.unix_timestamp().into()));
    Value::Object(fields)
}

fn record_from_value(model_name: &str, version_id: &str, value: &Value) -> Result<VersionRecord> {
    let fields = value
        .as_object()
        .ok_or_raise(|| corrupt(format!("record `{model_name}/{version_id}` is not an object")))?;

    let commit_hash = fields
        .get("commit_hash")
        .and_then(Value::as_str)
        .ok_or_raise(|| corrupt(format!("missing or non-string `commit_hash` in `{model_name}/{version_id}`")))?;
    if commit_hash != version_id {
        exn::bail!(corrupt(format!(
            "record keyed `{model_name}/{version_id}` claims commit_hash `{commit_hash}`"
        )));
    }
    let remote_key = fields
        .get("storage_uri")
        .and_then(Value::as_str)
        .ok_or_raise(|| corrupt(format!("missing or non-string `storage_uri` in `{model_name}/{version_id}`")))?;
    let byte_size = fields
        .get("file_size")
        .and_then(Value::as_u64)
        .ok_or_raise(|| {
            corrupt(format!("missing or negative `file_size` in `{model_name}/{version_id}`"))
        })?;
    let file_extension = fields
        .get("file_extension")
        .and_then(Value::as_str)
        .ok_or_raise(|| corrupt(format!("missing or non-string `file_extension` in `{model_name}/{version_id}`")))?;
    let created_at = fields
        .get("created_at")
        .and_then(Value::as_i64)
        .ok_or_raise(|| corrupt(format!("missing or non-integer `created_at` in `{model_name}/{version_id}`")))
        .and_then(|seconds| {
            UtcDateTime::from_unix_timestamp(seconds)
                .or_raise(|| corrupt(format!("out-of-range `created_at` in `{model_name}/{version_id}`")))
        })?;

    Ok(VersionRecord {
        version_id: version_id.to_string(),
        remote_key: remote_key.to_string(),
        byte_size,
        file_extension: file_extension.to_string(),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(document: &str) -> Result<VersionIndex> {
        parse(document.as_bytes())
    }

    fn valid_document() -> String {
        r#"{
            "models": {
                "test_model": {
                    "abc123": {
                        "commit_hash": "abc123",
                        "storage_uri": "test_model/abc123.pt",
                        "file_size": 1024,
                        "file_extension": "pt",
                        "created_at": 1754438400
                    }
                }
            },
            "latest": { "test_model": "abc123" }
        }"#
        .to_string()
    }

    #[test]
    fn test_parse_valid_document() {
        let index = parse_str(&valid_document()).unwrap();
        let entries = index.list_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].remote_key, "test_model/abc123.pt");
        assert_eq!(entries[0].byte_size, 1024);
        assert!(entries[0].is_latest);
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = parse_str("{ not json").unwrap_err();
        assert!(matches!(&*err, ErrorKind::CorruptIndex(_)));
    }

    #[test]
    fn test_parse_rejects_missing_sections() {
        let err = parse_str(r#"{"models": {}}"#).unwrap_err();
        assert!(matches!(&*err, ErrorKind::CorruptIndex(_)));
        let err = parse_str(r#"{"latest": {}}"#).unwrap_err();
        assert!(matches!(&*err, ErrorKind::CorruptIndex(_)));
        let err = parse_str(r#"[1, 2, 3]"#).unwrap_err();
        assert!(matches!(&*err, ErrorKind::CorruptIndex(_)));
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        let document = valid_document().replace(r#""storage_uri": "test_model/abc123.pt","#, "");
        let err = parse_str(&document).unwrap_err();
        assert!(matches!(&*err, ErrorKind::CorruptIndex(message)
            if message.contains("storage_uri")));
    }

    #[test]
    fn test_parse_rejects_wrong_field_type() {
        let document = valid_document().replace(r#""file_size": 1024"#, r#""file_size": "big""#);
        let err = parse_str(&document).unwrap_err();
        assert!(matches!(&*err, ErrorKind::CorruptIndex(message)
            if message.contains("file_size")));
    }

    #[test]
    fn test_parse_rejects_negative_file_size() {
        let document = valid_document().replace(r#""file_size": 1024"#, r#""file_size": -5"#);
        let err = parse_str(&document).unwrap_err();
        assert!(matches!(&*err, ErrorKind::CorruptIndex(_)));
    }

    #[test]
    fn test_parse_rejects_dangling_latest() {
        let document = valid_document().replace(r#""test_model": "abc123""#, r#""test_model": "zzz999""#);
        let err = parse_str(&document).unwrap_err();
        assert!(matches!(&*err, ErrorKind::CorruptIndex(message)
            if message.contains("zzz999")));
    }

    #[test]
    fn test_parse_rejects_latest_for_unknown_model() {
        let document = valid_document()
            .replace(r#""test_model": "abc123" }"#, r#""test_model": "abc123", "ghost": "v1" }"#);
        let err = parse_str(&document).unwrap_err();
        assert!(matches!(&*err, ErrorKind::CorruptIndex(message) if message.contains("ghost")));
    }

    #[test]
    fn test_parse_rejects_empty_history() {
        let document = r#"{"models": {"test_model": {}}, "latest": {"test_model": "abc123"}}"#;
        let err = parse_str(document).unwrap_err();
        assert!(matches!(&*err, ErrorKind::CorruptIndex(_)));
    }

    #[test]
    fn test_parse_rejects_mismatched_commit_hash() {
        let document = valid_document().replace(r#""commit_hash": "abc123""#, r#""commit_hash": "def456""#);
        let err = parse_str(&document).unwrap_err();
        assert!(matches!(&*err, ErrorKind::CorruptIndex(_)));
    }

    #[test]
    fn test_roundtrip_preserves_insertion_order() {
        let mut index = VersionIndex::new();
        // Deliberately non-lexical insertion order.
        index.add_version("m", "b2", "m/b2.pt", 1, "pt").unwrap();
        index.add_version("m", "a1", "m/a1.pt", 2, "pt").unwrap();
        index.add_version("m", "c3", "m/c3.pt", 3, "pt").unwrap();
        let reparsed = parse(&render(&index).unwrap()).unwrap();
        let ids: Vec<String> = reparsed.list_all().into_iter().map(|e| e.version_id).collect();
        assert_eq!(ids, vec!["b2", "a1", "c3"]);
    }
}
