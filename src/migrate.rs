//! Migration applier: reconcile target state and write sanitized flows.
//!
//! Two passes over the staged exports. Pass 1 validates target-side
//! consistency across all flows before anything is written. Pass 2 sanitizes
//! each definition, imports or updates the registry entry, and deploys or
//! updates the canvas instance. Target state only ever moves forward; nothing
//! is deleted.

use crate::error::MigrationError;
use crate::export::ExportedFlow;
use crate::nifi::{CanvasApi, FlowRegistryApi};
use crate::sanitize::sanitize_snapshot;
use serde_json::Value;
use std::thread;
use std::time::Duration;

/// Knobs for the apply pass.
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Pause after each registry write before the dependent canvas
    /// operation; the target platform propagates registry writes
    /// asynchronously.
    pub propagation_delay: Duration,
}

/// What the apply pass did, per flow, for reporting.
#[derive(Debug, Default)]
pub struct MigrationSummary {
    /// Flows imported as new registry entries and deployed.
    pub created: Vec<String>,
    /// Flows whose registry entry and/or canvas instance were updated.
    pub updated: Vec<String>,
}

/// Validate target-side state for every staged flow (pass 1).
///
/// Missing buckets are created here so a second run resumes cleanly, but a
/// canvas instance without a matching registry entry is an inconsistent
/// state and aborts the run, as do uncommitted changes on a target instance.
fn preflight(
    canvas: &dyn CanvasApi,
    registry: &dyn FlowRegistryApi,
    exported: &[ExportedFlow],
) -> Result<(), MigrationError> {
    for flow in exported {
        match registry.find_bucket(&flow.bucket_name)? {
            None => {
                registry.create_bucket(&flow.bucket_name)?;
                tracing::info!(bucket = %flow.bucket_name, "created target bucket");
                if canvas.find_process_group(&flow.name)?.is_some() {
                    return Err(MigrationError::InconsistentState {
                        name: flow.name.clone(),
                        detail: "exists on the target canvas but not in the target registry"
                            .to_string(),
                    });
                }
            }
            Some(bucket) => {
                let entry = registry.find_flow(&bucket.identifier, &flow.name)?;
                let group = canvas.find_process_group(&flow.name)?;
                match (&entry, &group) {
                    (None, Some(_)) => {
                        return Err(MigrationError::InconsistentState {
                            name: flow.name.clone(),
                            detail: "exists on the target canvas but not in the target registry"
                                .to_string(),
                        });
                    }
                    (Some(_), Some(group)) => {
                        let differences = canvas.local_modification_count(&group.id)?;
                        if differences > 0 {
                            return Err(MigrationError::UncommittedChanges {
                                name: flow.name.clone(),
                                differences,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

/// Apply the staged exports to the target environment.
pub fn migrate_flows(
    canvas: &dyn CanvasApi,
    registry: &dyn FlowRegistryApi,
    exported: &[ExportedFlow],
    options: &ApplyOptions,
) -> Result<MigrationSummary, MigrationError> {
    preflight(canvas, registry, exported)?;

    let clients = canvas.registry_clients()?;
    let Some(registry_client) = clients.first() else {
        return Err(MigrationError::NoRegistryClient);
    };
    if clients.len() > 1 {
        tracing::warn!(
            chosen = %registry_client.name,
            configured = clients.len(),
            "multiple registry clients configured on the target, using the first"
        );
    }

    let root_id = canvas.root_process_group_id()?;
    let mut summary = MigrationSummary::default();

    for flow in exported {
        let mut snapshot: Value = serde_json::from_str(&flow.definition).map_err(|source| {
            MigrationError::InvalidDefinition {
                name: flow.name.clone(),
                source,
            }
        })?;
        sanitize_snapshot(&mut snapshot);

        let bucket = registry.find_bucket(&flow.bucket_name)?.ok_or_else(|| {
            MigrationError::InconsistentState {
                name: flow.name.clone(),
                detail: format!("target bucket {} disappeared mid-run", flow.bucket_name),
            }
        })?;

        match registry.find_flow(&bucket.identifier, &flow.name)? {
            None => {
                let entry = registry.create_flow(&bucket.identifier, &flow.name)?;
                let version =
                    registry.import_version(&bucket.identifier, &entry.identifier, 1, &mut snapshot)?;
                tracing::info!(flow = %flow.name, bucket = %bucket.name, version, "imported new registry entry");
                sleep_for_propagation(options);

                canvas.deploy_flow(
                    &root_id,
                    &registry_client.id,
                    &bucket.identifier,
                    &entry.identifier,
                    version,
                )?;
                tracing::info!(flow = %flow.name, version, "deployed flow to target canvas");
                summary.created.push(flow.name.clone());
            }
            Some(entry) => {
                let next = registry.latest_version(&bucket.identifier, &entry.identifier)? + 1;
                let version = registry.import_version(
                    &bucket.identifier,
                    &entry.identifier,
                    next,
                    &mut snapshot,
                )?;
                tracing::info!(flow = %flow.name, bucket = %bucket.name, version, "updated registry entry");
                sleep_for_propagation(options);

                match canvas.find_process_group(&flow.name)? {
                    None => {
                        canvas.deploy_flow(
                            &root_id,
                            &registry_client.id,
                            &bucket.identifier,
                            &entry.identifier,
                            version,
                        )?;
                        tracing::info!(flow = %flow.name, version, "deployed flow to target canvas");
                    }
                    Some(group) => {
                        canvas.update_flow_version(&group, version)?;
                        tracing::info!(flow = %flow.name, version, "moved canvas instance to latest version");
                    }
                }
                summary.updated.push(flow.name.clone());
            }
        }
    }

    Ok(summary)
}

fn sleep_for_propagation(options: &ApplyOptions) {
    if options.propagation_delay.is_zero() {
        return;
    }
    tracing::info!(
        delay_secs = options.propagation_delay.as_secs(),
        "waiting for registry write to propagate"
    );
    thread::sleep(options.propagation_delay);
}
