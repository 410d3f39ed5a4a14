//! Export staging: precondition checks and snapshot retrieval on the source.

use crate::error::MigrationError;
use crate::nifi::{CanvasApi, FlowRegistryApi};

/// One flow staged for migration: name, owning bucket, and the raw snapshot
/// JSON as exported from the source registry. Immutable once staged.
#[derive(Debug, Clone)]
pub struct ExportedFlow {
    pub name: String,
    pub bucket_name: String,
    pub definition: String,
}

/// Stage the named flows for export, in order.
///
/// Each flow must exist on the source canvas, be under version control, and
/// have no uncommitted local modifications; the latest committed snapshot is
/// then exported from the source registry. All-or-nothing: the first failed
/// precondition aborts the stage and no partial result is returned.
pub fn stage_flows_for_export(
    canvas: &dyn CanvasApi,
    registry: &dyn FlowRegistryApi,
    flow_names: &[String],
) -> Result<Vec<ExportedFlow>, MigrationError> {
    let mut exported = Vec::with_capacity(flow_names.len());

    for name in flow_names {
        let group = canvas
            .find_process_group(name)?
            .ok_or_else(|| MigrationError::FlowNotFound(name.clone()))?;

        let Some(vci) = group.component.version_control_information.as_ref() else {
            return Err(MigrationError::NotVersionControlled(name.clone()));
        };

        let differences = canvas.local_modification_count(&group.id)?;
        if differences > 0 {
            return Err(MigrationError::UncommittedChanges {
                name: name.clone(),
                differences,
            });
        }

        let definition = registry.export_latest(&vci.bucket_id, &vci.flow_id)?;
        tracing::info!(
            flow = %name,
            bucket = %vci.bucket_name,
            version = vci.version,
            bytes = definition.len(),
            "staged flow for export"
        );
        exported.push(ExportedFlow {
            name: name.clone(),
            bucket_name: vci.bucket_name.clone(),
            definition,
        });
    }

    Ok(exported)
}
