//! Canonical workload description records
//!
//! This crate contains the schema-stable record types the collector emits for
//! downstream feature extraction, shared so that consuming services deserialize
//! exactly the shape the collector produces.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// Schema revision stamped on every record.
pub const SCHEMA_VERSION: &str = "v1";

fn schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Category tag for a pod volume source.
///
/// Every declared volume maps to exactly one tag; sources with no dedicated tag
/// map to [`VolumeType::Other`] rather than being dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeType {
    #[serde(rename = "emptyDir")]
    EmptyDir,
    #[serde(rename = "hostPath")]
    HostPath,
    #[serde(rename = "pvc")]
    Pvc,
    #[serde(rename = "configMap")]
    ConfigMap,
    #[serde(rename = "secret")]
    Secret,
    #[serde(rename = "downwardAPI")]
    DownwardApi,
    #[serde(rename = "projected")]
    Projected,
    #[serde(rename = "nfs")]
    Nfs,
    #[serde(rename = "ephemeral")]
    Ephemeral,
    #[serde(rename = "other")]
    Other,
}

/// Normalized view of a single primary container.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Container name
    pub name: String,
    /// Image reference
    pub image: String,
    /// Entrypoint override, when declared
    pub command: Option<Vec<String>>,
    /// Entrypoint arguments, when declared
    pub args: Option<Vec<String>>,
    /// Requested CPU in milli-units
    pub req_cpu_mcpu: Option<i64>,
    /// Requested memory in MiB
    pub req_mem_mib: Option<i64>,
    /// CPU limit in milli-units
    pub lim_cpu_mcpu: Option<i64>,
    /// Memory limit in MiB
    pub lim_mem_mib: Option<i64>,
}

/// Canonical description of one observed workload change.
///
/// Built fresh for every accepted change event and immutable once built. All
/// fields are serialized, absent dimensions as explicit nulls, so the record
/// shape never varies with the source object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadDescription {
    #[serde(default = "schema_version")]
    pub schema_version: String,
    /// Namespace of the observed object
    pub namespace: String,
    /// Logical workload kind; the owning controller's kind for owned pods
    pub workload_kind: String,
    /// Logical workload name
    pub workload_name: String,
    /// Pod template labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Pod template annotations
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Primary containers only, in declaration order
    pub containers: Vec<ContainerSpec>,
    /// Number of declared init containers
    #[serde(default)]
    pub init_container_count: u32,
    /// Reserved for a future sidecar heuristic, currently always 0
    #[serde(default)]
    pub sidecar_count: u32,
    /// One tag per declared volume, in declaration order
    #[serde(default)]
    pub volume_types: Vec<VolumeType>,
    /// Cluster-reported instance-type hint, when the template pins one
    pub node_type: Option<String>,
    /// Runtime class name, when declared
    pub runtime_class: Option<String>,
    /// GPUs declared across container resource limits
    #[serde(default)]
    pub gpu_count: u32,
    /// Job-only parallelism hint
    pub parallelism: Option<i32>,
    /// Job-only completions hint
    pub completions: Option<i32>,
}

impl Default for WorkloadDescription {
    fn default() -> Self {
        Self {
            schema_version: schema_version(),
            namespace: String::new(),
            workload_kind: String::new(),
            workload_name: String::new(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            containers: Vec::new(),
            init_container_count: 0,
            sidecar_count: 0,
            volume_types: Vec::new(),
            node_type: None,
            runtime_class: None,
            gpu_count: 0,
            parallelism: None,
            completions: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_type_tags_are_stable() {
        let tags: Vec<String> = [
            VolumeType::EmptyDir,
            VolumeType::HostPath,
            VolumeType::Pvc,
            VolumeType::ConfigMap,
            VolumeType::Secret,
            VolumeType::DownwardApi,
            VolumeType::Projected,
            VolumeType::Nfs,
            VolumeType::Ephemeral,
            VolumeType::Other,
        ]
        .iter()
        .map(|tag| serde_json::to_string(tag).unwrap())
        .collect();

        assert_eq!(
            tags,
            [
                "\"emptyDir\"",
                "\"hostPath\"",
                "\"pvc\"",
                "\"configMap\"",
                "\"secret\"",
                "\"downwardAPI\"",
                "\"projected\"",
                "\"nfs\"",
                "\"ephemeral\"",
                "\"other\"",
            ]
        );
    }

    #[test]
    fn record_roundtrips_with_schema_version() {
        let record = WorkloadDescription {
            namespace: "default".to_string(),
            workload_kind: "Deployment".to_string(),
            workload_name: "web".to_string(),
            ..Default::default()
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"schema_version\":\"v1\""));

        let parsed: WorkloadDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn schema_version_defaults_when_absent() {
        let parsed: WorkloadDescription = serde_json::from_str(
            r#"{"namespace":"ns","workload_kind":"Job","workload_name":"j","containers":[],
                "node_type":null,"runtime_class":null,"parallelism":null,"completions":null}"#,
        )
        .unwrap();
        assert_eq!(parsed.schema_version, SCHEMA_VERSION);
    }
}
