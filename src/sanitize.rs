//! Parameter-context sanitization for exported flow snapshots.
//!
//! Parameter contexts are environment-specific, so they must not travel with
//! a flow definition between environments. Sanitization removes
//! `parameterContextName` references from every process group at any nesting
//! depth and clears the snapshot's top-level `parameterContexts` mapping.
//! Every other field passes through untouched.

use serde_json::Value;

/// Strip `parameterContextName` from a process-group node and, recursively
/// and in order, from every nested group under its `processGroups` key.
///
/// Missing keys are a silent no-op; the walk terminates at nodes with no
/// (or an empty) `processGroups` array. Idempotent.
pub fn sanitize_process_group(node: &mut Value) {
    let Some(object) = node.as_object_mut() else {
        return;
    };
    object.remove("parameterContextName");

    let Some(children) = object.get_mut("processGroups").and_then(Value::as_array_mut) else {
        return;
    };
    for child in children {
        sanitize_process_group(child);
    }
}

/// Sanitize a full versioned-flow snapshot document.
///
/// If the root carries a `parameterContexts` mapping it is cleared (replaced
/// with an empty object, not removed) and a `parameterContextName` directly
/// under `flowContents` is dropped. Nested groups under
/// `flowContents.processGroups` are sanitized in all cases.
pub fn sanitize_snapshot(snapshot: &mut Value) {
    if let Some(root) = snapshot.as_object_mut() {
        if root.contains_key("parameterContexts") {
            root.insert(
                "parameterContexts".to_string(),
                Value::Object(serde_json::Map::new()),
            );
            if let Some(contents) = root.get_mut("flowContents").and_then(Value::as_object_mut) {
                contents.remove("parameterContextName");
            }
        }
    }

    if let Some(groups) = snapshot
        .get_mut("flowContents")
        .and_then(|contents| contents.get_mut("processGroups"))
        .and_then(Value::as_array_mut)
    {
        for group in groups {
            sanitize_process_group(group);
        }
    }
}
