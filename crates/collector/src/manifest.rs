//! Offline mode: describe workloads from a local manifest file instead of a
//! live cluster. Multi-document YAML is supported; JSON parses as a single
//! YAML document.

use std::path::Path;

use anyhow::bail;
use anyhow::Context;
use kube::ResourceExt;
use serde::Deserialize;
use serde_yaml::Value;
use tracing::warn;
use workload_types::WorkloadDescription;

use crate::k8s::extract::WorkloadResource;
use crate::k8s::record;

/// Parse every document in the manifest and build a description per workload.
///
/// Documents of unsupported kinds abort with an error; supported documents
/// with no extractable pod template are skipped with a warning.
pub fn describe_manifest(path: &Path) -> anyhow::Result<Vec<WorkloadDescription>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest file {}", path.display()))?;

    let mut records = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&contents) {
        let value = Value::deserialize(document)
            .with_context(|| format!("failed to parse manifest {}", path.display()))?;
        if value.is_null() {
            continue;
        }

        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let record = match kind.as_str() {
            "Deployment" => describe_resource::<k8s_openapi::api::apps::v1::Deployment>(value)?,
            "Job" => describe_resource::<k8s_openapi::api::batch::v1::Job>(value)?,
            "CronJob" => describe_resource::<k8s_openapi::api::batch::v1::CronJob>(value)?,
            "Pod" => describe_resource::<k8s_openapi::api::core::v1::Pod>(value)?,
            other => bail!("unsupported manifest kind: {other:?}"),
        };
        match record {
            Some(record) => records.push(record),
            None => warn!(kind = %kind, "manifest document has no pod template, skipping"),
        }
    }
    Ok(records)
}

fn describe_resource<K: WorkloadResource>(
    value: Value,
) -> anyhow::Result<Option<WorkloadDescription>> {
    let object: K = serde_yaml::from_value(value)
        .with_context(|| format!("failed to parse {} manifest document", K::KIND))?;

    let namespace = object.namespace().unwrap_or_else(|| "default".to_string());
    let Some(extracted) = object.extract() else {
        return Ok(None);
    };
    Ok(Some(record::build_description(
        &namespace,
        &extracted.kind,
        &extracted.name,
        &extracted.template,
        extracted.parent.as_ref(),
    )))
}
