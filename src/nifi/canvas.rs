//! Canvas-side operations against the NiFi management API.
//!
//! The [`CanvasApi`] trait is the seam between migration logic and the wire:
//! the stager and applier only see the trait, so tests can substitute an
//! in-memory canvas.

use super::http::JsonEndpoint;
use super::types::{
    FlowComparisonEntity, ProcessGroupEntity, ProcessGroupFlowEntity, RegistryClientComponent,
    RegistryClientsEntity, SearchResultsEntity, VersionedFlowUpdateRequestEntity,
};
use crate::error::ApiError;
use serde_json::json;
use std::thread;
use std::time::Duration;

const UPDATE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const UPDATE_POLL_ATTEMPTS: u32 = 30;

/// Canvas operations used by the stager and applier.
pub trait CanvasApi {
    /// Exact-name lookup of a process group anywhere on the canvas.
    fn find_process_group(&self, name: &str) -> Result<Option<ProcessGroupEntity>, ApiError>;

    /// Number of uncommitted differences between the canvas group and its
    /// committed registry version.
    fn local_modification_count(&self, pg_id: &str) -> Result<usize, ApiError>;

    /// Registry clients configured on this NiFi instance.
    fn registry_clients(&self) -> Result<Vec<RegistryClientComponent>, ApiError>;

    /// Id of the root canvas group, the parent for new deployments.
    fn root_process_group_id(&self) -> Result<String, ApiError>;

    /// Instantiate a specific flow version as a new group under `parent_id`.
    fn deploy_flow(
        &self,
        parent_id: &str,
        registry_client_id: &str,
        bucket_id: &str,
        flow_id: &str,
        version: i64,
    ) -> Result<ProcessGroupEntity, ApiError>;

    /// Move an existing version-controlled group to `version`.
    fn update_flow_version(
        &self,
        group: &ProcessGroupEntity,
        version: i64,
    ) -> Result<(), ApiError>;
}

/// HTTP client for one NiFi instance.
pub struct NifiClient {
    endpoint: JsonEndpoint,
}

impl NifiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            endpoint: JsonEndpoint::new(base_url),
        }
    }

    pub fn base_url(&self) -> &str {
        self.endpoint.base_url()
    }

    pub fn is_up(&self) -> bool {
        self.endpoint.is_up("flow/about")
    }

    fn get_process_group(&self, id: &str) -> Result<ProcessGroupEntity, ApiError> {
        self.endpoint.get_json(&format!("process-groups/{id}"))
    }
}

impl CanvasApi for NifiClient {
    fn find_process_group(&self, name: &str) -> Result<Option<ProcessGroupEntity>, ApiError> {
        let results: SearchResultsEntity = self
            .endpoint
            .get_json_query("flow/search-results", &[("q", name)])?;
        let hit = results
            .search_results_dto
            .process_group_results
            .into_iter()
            .find(|result| result.name == name);
        match hit {
            Some(result) => Ok(Some(self.get_process_group(&result.id)?)),
            None => Ok(None),
        }
    }

    fn local_modification_count(&self, pg_id: &str) -> Result<usize, ApiError> {
        let comparison: FlowComparisonEntity = self
            .endpoint
            .get_json(&format!("process-groups/{pg_id}/local-modifications"))?;
        Ok(comparison.component_differences.len())
    }

    fn registry_clients(&self) -> Result<Vec<RegistryClientComponent>, ApiError> {
        let entity: RegistryClientsEntity = self.endpoint.get_json("flow/registries")?;
        Ok(entity
            .registries
            .into_iter()
            .map(|client| client.component)
            .collect())
    }

    fn root_process_group_id(&self) -> Result<String, ApiError> {
        let entity: ProcessGroupFlowEntity = self.endpoint.get_json("flow/process-groups/root")?;
        Ok(entity.process_group_flow.id)
    }

    fn deploy_flow(
        &self,
        parent_id: &str,
        registry_client_id: &str,
        bucket_id: &str,
        flow_id: &str,
        version: i64,
    ) -> Result<ProcessGroupEntity, ApiError> {
        let body = json!({
            "revision": { "version": 0 },
            "component": {
                "position": { "x": 0.0, "y": 0.0 },
                "versionControlInformation": {
                    "registryId": registry_client_id,
                    "bucketId": bucket_id,
                    "flowId": flow_id,
                    "version": version,
                }
            }
        });
        self.endpoint
            .post_json(&format!("process-groups/{parent_id}/process-groups"), &body)
    }

    fn update_flow_version(
        &self,
        group: &ProcessGroupEntity,
        version: i64,
    ) -> Result<(), ApiError> {
        let Some(vci) = group.component.version_control_information.as_ref() else {
            return Err(ApiError::remote(
                format!(
                    "update process group {} to version {version}",
                    group.component.name
                ),
                "group has no version control information",
            ));
        };

        let body = json!({
            "processGroupRevision": group.revision,
            "versionControlInformation": {
                "groupId": group.id,
                "registryId": vci.registry_id,
                "bucketId": vci.bucket_id,
                "flowId": vci.flow_id,
                "version": version,
            }
        });
        let entity: VersionedFlowUpdateRequestEntity = self.endpoint.post_json(
            &format!("versions/update-requests/process-groups/{}", group.id),
            &body,
        )?;

        let mut request = entity.request;
        let mut attempts = 0;
        while !request.complete && attempts < UPDATE_POLL_ATTEMPTS {
            thread::sleep(UPDATE_POLL_INTERVAL);
            let entity: VersionedFlowUpdateRequestEntity = self
                .endpoint
                .get_json(&format!("versions/update-requests/{}", request.request_id))?;
            request = entity.request;
            attempts += 1;
        }

        // Acknowledge the request whether it completed or not; NiFi keeps
        // unacknowledged requests around.
        self.endpoint
            .delete(&format!("versions/update-requests/{}", request.request_id))?;

        if let Some(reason) = request.failure_reason {
            return Err(ApiError::remote(
                format!("version update for {}", group.component.name),
                reason,
            ));
        }
        if !request.complete {
            return Err(ApiError::remote(
                format!("version update for {}", group.component.name),
                "update request did not complete in time",
            ));
        }
        Ok(())
    }
}
