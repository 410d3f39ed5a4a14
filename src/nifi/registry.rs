//! Registry-side operations against the NiFi Registry API.
//!
//! Like the canvas side, the [`FlowRegistryApi`] trait isolates migration
//! logic from the wire so tests can run against an in-memory registry.

use super::http::JsonEndpoint;
use super::types::{Bucket, SnapshotMetadata, VersionedFlow};
use crate::error::ApiError;
use serde_json::{json, Value};

/// Registry operations used by the stager and applier.
pub trait FlowRegistryApi {
    /// Look up a bucket by name.
    fn find_bucket(&self, name: &str) -> Result<Option<Bucket>, ApiError>;

    /// Create a bucket with the given name.
    fn create_bucket(&self, name: &str) -> Result<Bucket, ApiError>;

    /// Look up a versioned flow entry by name inside a bucket.
    fn find_flow(&self, bucket_id: &str, name: &str) -> Result<Option<VersionedFlow>, ApiError>;

    /// Create an empty versioned flow entry inside a bucket.
    fn create_flow(&self, bucket_id: &str, name: &str) -> Result<VersionedFlow, ApiError>;

    /// Export the latest committed snapshot as raw JSON text.
    fn export_latest(&self, bucket_id: &str, flow_id: &str) -> Result<String, ApiError>;

    /// Version number of the latest committed snapshot.
    fn latest_version(&self, bucket_id: &str, flow_id: &str) -> Result<i64, ApiError>;

    /// Commit `snapshot` as the given version of a flow entry. The snapshot's
    /// own metadata is rewritten to match the destination coordinates.
    fn import_version(
        &self,
        bucket_id: &str,
        flow_id: &str,
        version: i64,
        snapshot: &mut Value,
    ) -> Result<i64, ApiError>;
}

/// HTTP client for one NiFi Registry instance.
pub struct RegistryClient {
    endpoint: JsonEndpoint,
}

impl RegistryClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            endpoint: JsonEndpoint::new(base_url),
        }
    }

    pub fn base_url(&self) -> &str {
        self.endpoint.base_url()
    }

    pub fn is_up(&self) -> bool {
        self.endpoint.is_up("buckets")
    }
}

/// Point a snapshot's own metadata at the destination coordinates before a
/// commit; the registry rejects snapshots whose metadata disagrees with the
/// target flow entry.
fn rewrite_snapshot_metadata(snapshot: &mut Value, bucket_id: &str, flow_id: &str, version: i64) {
    let Some(root) = snapshot.as_object_mut() else {
        return;
    };
    let metadata = root
        .entry("snapshotMetadata")
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    if let Some(metadata) = metadata.as_object_mut() {
        metadata.insert("bucketIdentifier".to_string(), json!(bucket_id));
        metadata.insert("flowIdentifier".to_string(), json!(flow_id));
        metadata.insert("version".to_string(), json!(version));
    }
}

impl FlowRegistryApi for RegistryClient {
    fn find_bucket(&self, name: &str) -> Result<Option<Bucket>, ApiError> {
        let buckets: Vec<Bucket> = self.endpoint.get_json("buckets")?;
        Ok(buckets.into_iter().find(|bucket| bucket.name == name))
    }

    fn create_bucket(&self, name: &str) -> Result<Bucket, ApiError> {
        self.endpoint.post_json("buckets", &json!({ "name": name }))
    }

    fn find_flow(&self, bucket_id: &str, name: &str) -> Result<Option<VersionedFlow>, ApiError> {
        let flows: Vec<VersionedFlow> = self
            .endpoint
            .get_json(&format!("buckets/{bucket_id}/flows"))?;
        Ok(flows.into_iter().find(|flow| flow.name == name))
    }

    fn create_flow(&self, bucket_id: &str, name: &str) -> Result<VersionedFlow, ApiError> {
        self.endpoint.post_json(
            &format!("buckets/{bucket_id}/flows"),
            &json!({ "name": name, "bucketIdentifier": bucket_id }),
        )
    }

    fn export_latest(&self, bucket_id: &str, flow_id: &str) -> Result<String, ApiError> {
        self.endpoint
            .get_text(&format!("buckets/{bucket_id}/flows/{flow_id}/versions/latest"))
    }

    fn latest_version(&self, bucket_id: &str, flow_id: &str) -> Result<i64, ApiError> {
        let metadata: SnapshotMetadata = self.endpoint.get_json(&format!(
            "buckets/{bucket_id}/flows/{flow_id}/versions/latest/metadata"
        ))?;
        Ok(metadata.version)
    }

    fn import_version(
        &self,
        bucket_id: &str,
        flow_id: &str,
        version: i64,
        snapshot: &mut Value,
    ) -> Result<i64, ApiError> {
        rewrite_snapshot_metadata(snapshot, bucket_id, flow_id, version);
        let committed: Value = self.endpoint.post_json(
            &format!("buckets/{bucket_id}/flows/{flow_id}/versions"),
            snapshot,
        )?;
        let committed_version = committed
            .get("snapshotMetadata")
            .and_then(|metadata| metadata.get("version"))
            .and_then(Value::as_i64)
            .unwrap_or(version);
        Ok(committed_version)
    }
}
