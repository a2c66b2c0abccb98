//! Scan document store keyed by scan id.

use serde_json::Value;

use crate::errors::ZeronError;
use crate::models::Scan;
use super::scans::ScanListing;
use super::Database;

pub trait ScanStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Scan>, ZeronError>;

    fn put(&self, scan: &Scan) -> Result<(), ZeronError>;

    /// Apply an RFC 7386 merge patch to the stored document and return the result.
    fn merge(&self, id: &str, patch: &Value) -> Result<Scan, ZeronError>;

    fn list(&self, limit: usize, offset: usize) -> Result<Vec<ScanListing>, ZeronError>;

    fn delete(&self, id: &str) -> Result<bool, ZeronError>;
}

/// RFC 7386: objects merge recursively, `null` removes a key, anything else replaces.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

impl ScanStore for Database {
    fn get(&self, id: &str) -> Result<Option<Scan>, ZeronError> {
        self.get_scan(id)
    }

    fn put(&self, scan: &Scan) -> Result<(), ZeronError> {
        self.upsert_scan(scan)
    }

    fn merge(&self, id: &str, patch: &Value) -> Result<Scan, ZeronError> {
        let current = self
            .get_scan(id)?
            .ok_or_else(|| ZeronError::NotFound(format!("scan {}", id)))?;
        let mut document = serde_json::to_value(&current)?;
        merge_patch(&mut document, patch);
        let merged: Scan = serde_json::from_value(document)?;
        if merged.id != id {
            return Err(ZeronError::Conflict("merge patch may not change the scan id".into()));
        }
        self.upsert_scan(&merged)?;
        Ok(merged)
    }

    fn list(&self, limit: usize, offset: usize) -> Result<Vec<ScanListing>, ZeronError> {
        self.list_scans(limit, offset)
    }

    fn delete(&self, id: &str) -> Result<bool, ZeronError> {
        self.delete_scan(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Plan, ScanStatus};
    use serde_json::json;

    #[test]
    fn test_merge_patch_rfc7386() {
        let mut doc = json!({"a": "b", "c": {"d": "e", "f": "g"}, "list": [1, 2]});
        merge_patch(&mut doc, &json!({"a": "z", "c": {"f": null}, "list": [3], "new": true}));
        assert_eq!(doc, json!({"a": "z", "c": {"d": "e"}, "list": [3], "new": true}));
    }

    #[test]
    fn test_merge_patch_non_object_replaces() {
        let mut doc = json!({"a": 1});
        merge_patch(&mut doc, &json!(["x"]));
        assert_eq!(doc, json!(["x"]));
    }

    #[test]
    fn test_store_merge_updates_document() {
        let db = Database::in_memory().unwrap();
        let store: &dyn ScanStore = &db;
        let scan = Scan::new("shop.test", Plan::Basic, Plan::Basic.default_limits(), vec![]);
        store.put(&scan).unwrap();

        let merged = store
            .merge(&scan.id, &json!({"status": "running", "progress": 35, "current_phase": "Discovery"}))
            .unwrap();
        assert_eq!(merged.status, ScanStatus::Running);
        assert_eq!(merged.progress, 35);

        let listed = store.list(10, 0).unwrap();
        assert_eq!(listed[0].status, "running");
        assert_eq!(listed[0].current_phase.as_deref(), Some("Discovery"));
    }

    #[test]
    fn test_store_merge_missing_scan() {
        let db = Database::in_memory().unwrap();
        let err = db.merge("nope", &json!({"progress": 1})).unwrap_err();
        assert!(matches!(err, ZeronError::NotFound(_)));
    }

    #[test]
    fn test_store_merge_rejects_id_change() {
        let db = Database::in_memory().unwrap();
        let scan = Scan::new("shop.test", Plan::Basic, Plan::Basic.default_limits(), vec![]);
        db.put(&scan).unwrap();
        let err = db.merge(&scan.id, &json!({"id": "other"})).unwrap_err();
        assert!(matches!(err, ZeronError::Conflict(_)));
    }
}
