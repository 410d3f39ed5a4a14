//! Serde views of the NiFi and NiFi Registry entities this tool touches.
//!
//! Only the fields the migration reads are modeled; everything else in the
//! wire payloads is ignored on deserialization.

use serde::{Deserialize, Serialize};

/// Optimistic-locking revision carried by canvas entities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    #[serde(default)]
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Link between a canvas process group and a (bucket, flow, version) triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionControlInfo {
    pub registry_id: String,
    pub bucket_id: String,
    #[serde(default)]
    pub bucket_name: String,
    pub flow_id: String,
    #[serde(default)]
    pub flow_name: String,
    pub version: i64,
}

/// Component section of a process-group entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGroupComponent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version_control_information: Option<VersionControlInfo>,
}

/// A process group as returned by `GET process-groups/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGroupEntity {
    pub id: String,
    pub revision: Revision,
    pub component: ProcessGroupComponent,
}

/// One hit from the canvas search endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResultsDto {
    #[serde(default, rename = "processGroupResults")]
    pub process_group_results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResultsEntity {
    #[serde(default, rename = "searchResultsDTO")]
    pub search_results_dto: SearchResultsDto,
}

/// Diff between a canvas group and its committed registry version.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowComparisonEntity {
    #[serde(default)]
    pub component_differences: Vec<serde_json::Value>,
}

/// A registry client configured on a NiFi instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryClientComponent {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryClientEntity {
    pub component: RegistryClientComponent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryClientsEntity {
    #[serde(default)]
    pub registries: Vec<RegistryClientEntity>,
}

/// Root canvas group as returned by `GET flow/process-groups/root`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGroupFlowDto {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGroupFlowEntity {
    pub process_group_flow: ProcessGroupFlowDto,
}

/// Version update request state on the canvas side.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedFlowUpdateRequest {
    pub request_id: String,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedFlowUpdateRequestEntity {
    pub request: VersionedFlowUpdateRequest,
}

/// A registry bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub identifier: String,
    pub name: String,
}

/// A versioned flow entry inside a bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedFlow {
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub bucket_identifier: String,
}

/// Metadata of one committed snapshot version.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub version: i64,
}
