//! End-to-end stager/applier tests against in-memory fakes of the two APIs.

use flowlift::error::{ApiError, MigrationError};
use flowlift::export::{stage_flows_for_export, ExportedFlow};
use flowlift::migrate::{migrate_flows, ApplyOptions};
use flowlift::nifi::types::{
    Bucket, ProcessGroupComponent, ProcessGroupEntity, RegistryClientComponent, Revision,
    VersionControlInfo, VersionedFlow,
};
use flowlift::nifi::{CanvasApi, FlowRegistryApi};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::Duration;

fn no_delay() -> ApplyOptions {
    ApplyOptions {
        propagation_delay: Duration::ZERO,
    }
}

#[derive(Clone)]
struct FakeGroup {
    id: String,
    name: String,
    vci: Option<VersionControlInfo>,
    local_differences: usize,
}

#[derive(Default)]
struct FakeCanvas {
    groups: RefCell<Vec<FakeGroup>>,
    clients: Vec<RegistryClientComponent>,
    deploys: RefCell<Vec<(String, i64)>>,
    version_updates: RefCell<Vec<(String, i64)>>,
}

impl FakeCanvas {
    fn with_registry_client() -> Self {
        Self {
            clients: vec![RegistryClientComponent {
                id: "reg-client-1".to_string(),
                name: "test-registry".to_string(),
            }],
            ..Self::default()
        }
    }

    fn add_group(&self, group: FakeGroup) {
        self.groups.borrow_mut().push(group);
    }

    fn entity(group: &FakeGroup) -> ProcessGroupEntity {
        ProcessGroupEntity {
            id: group.id.clone(),
            revision: Revision {
                version: 1,
                client_id: None,
            },
            component: ProcessGroupComponent {
                id: group.id.clone(),
                name: group.name.clone(),
                version_control_information: group.vci.clone(),
            },
        }
    }
}

impl CanvasApi for FakeCanvas {
    fn find_process_group(&self, name: &str) -> Result<Option<ProcessGroupEntity>, ApiError> {
        Ok(self
            .groups
            .borrow()
            .iter()
            .find(|group| group.name == name)
            .map(Self::entity))
    }

    fn local_modification_count(&self, pg_id: &str) -> Result<usize, ApiError> {
        Ok(self
            .groups
            .borrow()
            .iter()
            .find(|group| group.id == pg_id)
            .map(|group| group.local_differences)
            .unwrap_or(0))
    }

    fn registry_clients(&self) -> Result<Vec<RegistryClientComponent>, ApiError> {
        Ok(self.clients.clone())
    }

    fn root_process_group_id(&self) -> Result<String, ApiError> {
        Ok("root".to_string())
    }

    fn deploy_flow(
        &self,
        _parent_id: &str,
        registry_client_id: &str,
        bucket_id: &str,
        flow_id: &str,
        version: i64,
    ) -> Result<ProcessGroupEntity, ApiError> {
        self.deploys
            .borrow_mut()
            .push((flow_id.to_string(), version));
        let group = FakeGroup {
            id: format!("pg-{flow_id}"),
            name: format!("deployed-{flow_id}"),
            vci: Some(VersionControlInfo {
                registry_id: registry_client_id.to_string(),
                bucket_id: bucket_id.to_string(),
                bucket_name: String::new(),
                flow_id: flow_id.to_string(),
                flow_name: String::new(),
                version,
            }),
            local_differences: 0,
        };
        let entity = Self::entity(&group);
        self.groups.borrow_mut().push(group);
        Ok(entity)
    }

    fn update_flow_version(
        &self,
        group: &ProcessGroupEntity,
        version: i64,
    ) -> Result<(), ApiError> {
        self.version_updates
            .borrow_mut()
            .push((group.component.name.clone(), version));
        Ok(())
    }
}

#[derive(Default)]
struct FakeRegistry {
    buckets: RefCell<Vec<Bucket>>,
    flows: RefCell<Vec<VersionedFlow>>,
    // flow id -> committed snapshots, in version order
    versions: RefCell<BTreeMap<String, Vec<Value>>>,
    // (bucket id, flow id) -> exportable snapshot text
    exports: BTreeMap<(String, String), String>,
    export_calls: RefCell<usize>,
}

impl FakeRegistry {
    fn with_bucket(&self, id: &str, name: &str) {
        self.buckets.borrow_mut().push(Bucket {
            identifier: id.to_string(),
            name: name.to_string(),
        });
    }

    fn with_flow(&self, bucket_id: &str, id: &str, name: &str, versions: u32) {
        self.flows.borrow_mut().push(VersionedFlow {
            identifier: id.to_string(),
            name: name.to_string(),
            bucket_identifier: bucket_id.to_string(),
        });
        let committed: Vec<Value> = (1..=versions)
            .map(|version| json!({ "snapshotMetadata": { "version": version } }))
            .collect();
        self.versions.borrow_mut().insert(id.to_string(), committed);
    }
}

impl FlowRegistryApi for FakeRegistry {
    fn find_bucket(&self, name: &str) -> Result<Option<Bucket>, ApiError> {
        Ok(self
            .buckets
            .borrow()
            .iter()
            .find(|bucket| bucket.name == name)
            .cloned())
    }

    fn create_bucket(&self, name: &str) -> Result<Bucket, ApiError> {
        let bucket = Bucket {
            identifier: format!("bucket-{name}"),
            name: name.to_string(),
        };
        self.buckets.borrow_mut().push(bucket.clone());
        Ok(bucket)
    }

    fn find_flow(&self, bucket_id: &str, name: &str) -> Result<Option<VersionedFlow>, ApiError> {
        Ok(self
            .flows
            .borrow()
            .iter()
            .find(|flow| flow.bucket_identifier == bucket_id && flow.name == name)
            .cloned())
    }

    fn create_flow(&self, bucket_id: &str, name: &str) -> Result<VersionedFlow, ApiError> {
        let flow = VersionedFlow {
            identifier: format!("flow-{name}"),
            name: name.to_string(),
            bucket_identifier: bucket_id.to_string(),
        };
        self.flows.borrow_mut().push(flow.clone());
        self.versions
            .borrow_mut()
            .insert(flow.identifier.clone(), Vec::new());
        Ok(flow)
    }

    fn export_latest(&self, bucket_id: &str, flow_id: &str) -> Result<String, ApiError> {
        *self.export_calls.borrow_mut() += 1;
        self.exports
            .get(&(bucket_id.to_string(), flow_id.to_string()))
            .cloned()
            .ok_or_else(|| ApiError::remote("export latest snapshot", "no such flow version"))
    }

    fn latest_version(&self, _bucket_id: &str, flow_id: &str) -> Result<i64, ApiError> {
        let versions = self.versions.borrow();
        let committed = versions
            .get(flow_id)
            .ok_or_else(|| ApiError::remote("latest version metadata", "no such flow"))?;
        Ok(committed.len() as i64)
    }

    fn import_version(
        &self,
        _bucket_id: &str,
        flow_id: &str,
        version: i64,
        snapshot: &mut Value,
    ) -> Result<i64, ApiError> {
        self.versions
            .borrow_mut()
            .get_mut(flow_id)
            .ok_or_else(|| ApiError::remote("import version", "no such flow"))?
            .push(snapshot.clone());
        Ok(version)
    }
}

fn sample_snapshot_text() -> String {
    json!({
        "snapshotMetadata": { "bucketIdentifier": "src-bucket", "version": 2 },
        "parameterContexts": { "dev-ctx": { "parameters": [] } },
        "flowContents": {
            "name": "SampleProcessGroup",
            "parameterContextName": "dev-ctx",
            "processGroups": [
                { "name": "child", "parameterContextName": "dev-ctx", "processGroups": [] }
            ]
        }
    })
    .to_string()
}

fn source_canvas_with_clean_flow() -> FakeCanvas {
    let canvas = FakeCanvas::default();
    canvas.add_group(FakeGroup {
        id: "pg-1".to_string(),
        name: "SampleProcessGroup".to_string(),
        vci: Some(VersionControlInfo {
            registry_id: "reg-client-dev".to_string(),
            bucket_id: "src-bucket".to_string(),
            bucket_name: "flows".to_string(),
            flow_id: "src-flow".to_string(),
            flow_name: "SampleProcessGroup".to_string(),
            version: 2,
        }),
        local_differences: 0,
    });
    canvas
}

fn source_registry_with_export() -> FakeRegistry {
    let mut registry = FakeRegistry::default();
    registry.exports.insert(
        ("src-bucket".to_string(), "src-flow".to_string()),
        sample_snapshot_text(),
    );
    registry
}

fn contains_key_at_any_depth(value: &Value, key: &str) -> bool {
    match value {
        Value::Object(map) => {
            map.contains_key(key) || map.values().any(|v| contains_key_at_any_depth(v, key))
        }
        Value::Array(items) => items.iter().any(|v| contains_key_at_any_depth(v, key)),
        _ => false,
    }
}

#[test]
fn staging_a_clean_versioned_flow_yields_one_record() {
    let canvas = source_canvas_with_clean_flow();
    let registry = source_registry_with_export();

    let exported =
        stage_flows_for_export(&canvas, &registry, &["SampleProcessGroup".to_string()]).unwrap();

    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0].name, "SampleProcessGroup");
    assert_eq!(exported[0].bucket_name, "flows");
    assert!(exported[0].definition.contains("flowContents"));
}

#[test]
fn staging_halts_on_missing_flow() {
    let canvas = FakeCanvas::default();
    let registry = FakeRegistry::default();

    let err =
        stage_flows_for_export(&canvas, &registry, &["Missing".to_string()]).unwrap_err();
    assert!(matches!(err, MigrationError::FlowNotFound(name) if name == "Missing"));
}

#[test]
fn staging_halts_on_unversioned_flow() {
    let canvas = FakeCanvas::default();
    canvas.add_group(FakeGroup {
        id: "pg-1".to_string(),
        name: "Loose".to_string(),
        vci: None,
        local_differences: 0,
    });
    let registry = FakeRegistry::default();

    let err = stage_flows_for_export(&canvas, &registry, &["Loose".to_string()]).unwrap_err();
    assert!(matches!(err, MigrationError::NotVersionControlled(name) if name == "Loose"));
}

#[test]
fn staging_halts_on_uncommitted_changes_before_any_export() {
    let canvas = source_canvas_with_clean_flow();
    canvas.groups.borrow_mut()[0].local_differences = 3;
    let registry = source_registry_with_export();

    let err = stage_flows_for_export(&canvas, &registry, &["SampleProcessGroup".to_string()])
        .unwrap_err();

    match err {
        MigrationError::UncommittedChanges { name, differences } => {
            assert_eq!(name, "SampleProcessGroup");
            assert_eq!(differences, 3);
        }
        other => panic!("expected UncommittedChanges, got {other:?}"),
    }
    assert_eq!(*registry.export_calls.borrow(), 0);
}

#[test]
fn fresh_target_gets_bucket_flow_and_deployment() {
    let canvas = FakeCanvas::with_registry_client();
    let registry = FakeRegistry::default();
    let exported = vec![ExportedFlow {
        name: "SampleProcessGroup".to_string(),
        bucket_name: "flows".to_string(),
        definition: sample_snapshot_text(),
    }];

    let summary = migrate_flows(&canvas, &registry, &exported, &no_delay()).unwrap();

    assert_eq!(summary.created, vec!["SampleProcessGroup".to_string()]);
    assert!(summary.updated.is_empty());
    assert!(registry.find_bucket("flows").unwrap().is_some());

    let versions = registry.versions.borrow();
    let committed = versions.get("flow-SampleProcessGroup").unwrap();
    assert_eq!(committed.len(), 1);
    assert!(!contains_key_at_any_depth(&committed[0], "parameterContextName"));
    assert_eq!(committed[0]["parameterContexts"], json!({}));

    assert_eq!(
        *canvas.deploys.borrow(),
        vec![("flow-SampleProcessGroup".to_string(), 1)]
    );
}

#[test]
fn existing_entry_and_instance_get_updated_in_place() {
    let canvas = FakeCanvas::with_registry_client();
    canvas.add_group(FakeGroup {
        id: "pg-t1".to_string(),
        name: "SampleProcessGroup".to_string(),
        vci: Some(VersionControlInfo {
            registry_id: "reg-client-1".to_string(),
            bucket_id: "bucket-flows".to_string(),
            bucket_name: "flows".to_string(),
            flow_id: "tgt-flow".to_string(),
            flow_name: "SampleProcessGroup".to_string(),
            version: 3,
        }),
        local_differences: 0,
    });
    let registry = FakeRegistry::default();
    registry.with_bucket("bucket-flows", "flows");
    registry.with_flow("bucket-flows", "tgt-flow", "SampleProcessGroup", 3);

    let exported = vec![ExportedFlow {
        name: "SampleProcessGroup".to_string(),
        bucket_name: "flows".to_string(),
        definition: sample_snapshot_text(),
    }];

    let summary = migrate_flows(&canvas, &registry, &exported, &no_delay()).unwrap();

    assert_eq!(summary.updated, vec!["SampleProcessGroup".to_string()]);
    assert!(summary.created.is_empty());
    assert_eq!(registry.versions.borrow().get("tgt-flow").unwrap().len(), 4);
    assert!(canvas.deploys.borrow().is_empty());
    assert_eq!(
        *canvas.version_updates.borrow(),
        vec![("SampleProcessGroup".to_string(), 4)]
    );
}

#[test]
fn existing_entry_without_instance_gets_deployed() {
    let canvas = FakeCanvas::with_registry_client();
    let registry = FakeRegistry::default();
    registry.with_bucket("bucket-flows", "flows");
    registry.with_flow("bucket-flows", "tgt-flow", "SampleProcessGroup", 1);

    let exported = vec![ExportedFlow {
        name: "SampleProcessGroup".to_string(),
        bucket_name: "flows".to_string(),
        definition: sample_snapshot_text(),
    }];

    let summary = migrate_flows(&canvas, &registry, &exported, &no_delay()).unwrap();

    assert_eq!(summary.updated, vec!["SampleProcessGroup".to_string()]);
    assert_eq!(*canvas.deploys.borrow(), vec![("tgt-flow".to_string(), 2)]);
    assert!(canvas.version_updates.borrow().is_empty());
}

#[test]
fn canvas_instance_without_registry_entry_is_inconsistent() {
    let canvas = FakeCanvas::with_registry_client();
    canvas.add_group(FakeGroup {
        id: "pg-t1".to_string(),
        name: "SampleProcessGroup".to_string(),
        vci: None,
        local_differences: 0,
    });
    let registry = FakeRegistry::default();
    registry.with_bucket("bucket-flows", "flows");

    let exported = vec![ExportedFlow {
        name: "SampleProcessGroup".to_string(),
        bucket_name: "flows".to_string(),
        definition: sample_snapshot_text(),
    }];

    let err = migrate_flows(&canvas, &registry, &exported, &no_delay()).unwrap_err();
    assert!(matches!(err, MigrationError::InconsistentState { .. }));
    assert!(registry.versions.borrow().is_empty());
}

#[test]
fn uncommitted_target_changes_halt_before_any_write() {
    let canvas = FakeCanvas::with_registry_client();
    canvas.add_group(FakeGroup {
        id: "pg-t1".to_string(),
        name: "SampleProcessGroup".to_string(),
        vci: Some(VersionControlInfo {
            registry_id: "reg-client-1".to_string(),
            bucket_id: "bucket-flows".to_string(),
            bucket_name: "flows".to_string(),
            flow_id: "tgt-flow".to_string(),
            flow_name: "SampleProcessGroup".to_string(),
            version: 1,
        }),
        local_differences: 2,
    });
    let registry = FakeRegistry::default();
    registry.with_bucket("bucket-flows", "flows");
    registry.with_flow("bucket-flows", "tgt-flow", "SampleProcessGroup", 1);

    let exported = vec![ExportedFlow {
        name: "SampleProcessGroup".to_string(),
        bucket_name: "flows".to_string(),
        definition: sample_snapshot_text(),
    }];

    let err = migrate_flows(&canvas, &registry, &exported, &no_delay()).unwrap_err();
    assert!(matches!(err, MigrationError::UncommittedChanges { .. }));
    assert_eq!(registry.versions.borrow().get("tgt-flow").unwrap().len(), 1);
}

#[test]
fn missing_registry_client_is_a_typed_error() {
    let canvas = FakeCanvas::default();
    let registry = FakeRegistry::default();
    let exported = vec![ExportedFlow {
        name: "SampleProcessGroup".to_string(),
        bucket_name: "flows".to_string(),
        definition: sample_snapshot_text(),
    }];

    let err = migrate_flows(&canvas, &registry, &exported, &no_delay()).unwrap_err();
    assert!(matches!(err, MigrationError::NoRegistryClient));
}

#[test]
fn malformed_definition_is_reported_per_flow() {
    let canvas = FakeCanvas::with_registry_client();
    let registry = FakeRegistry::default();
    let exported = vec![ExportedFlow {
        name: "Broken".to_string(),
        bucket_name: "flows".to_string(),
        definition: "{not json".to_string(),
    }];

    let err = migrate_flows(&canvas, &registry, &exported, &no_delay()).unwrap_err();
    assert!(matches!(err, MigrationError::InvalidDefinition { name, .. } if name == "Broken"));
}
