//! Composes shape-extractor and quantity-normalizer output into the canonical
//! workload description record.

use k8s_openapi::api::core::v1::PodTemplateSpec;
use workload_types::ContainerSpec;
use workload_types::WorkloadDescription;
use workload_types::SCHEMA_VERSION;

use crate::k8s::extract;
use crate::k8s::extract::JobParams;

/// Build a description from a structurally valid pod template.
///
/// A missing `metadata` or `spec` block on the template is treated as empty,
/// not an error. Parallelism and completions are populated only for Job
/// workloads with a parent spec.
pub(crate) fn build_description(
    namespace: &str,
    kind: &str,
    name: &str,
    template: &PodTemplateSpec,
    parent: Option<&JobParams>,
) -> WorkloadDescription {
    let metadata = template.metadata.as_ref();
    let spec = template.spec.as_ref();

    let containers: Vec<ContainerSpec> = spec
        .map(|s| s.containers.iter().map(extract::container_spec).collect())
        .unwrap_or_default();

    let volume_types = spec
        .and_then(|s| s.volumes.as_ref())
        .map(|volumes| volumes.iter().map(extract::classify_volume).collect())
        .unwrap_or_default();

    let (parallelism, completions) = match parent {
        Some(params) if kind.eq_ignore_ascii_case("job") => {
            (params.parallelism, params.completions)
        }
        _ => (None, None),
    };

    WorkloadDescription {
        schema_version: SCHEMA_VERSION.to_string(),
        namespace: namespace.to_string(),
        workload_kind: kind.to_string(),
        workload_name: name.to_string(),
        labels: metadata.and_then(|m| m.labels.clone()).unwrap_or_default(),
        annotations: metadata
            .and_then(|m| m.annotations.clone())
            .unwrap_or_default(),
        containers,
        init_container_count: spec
            .and_then(|s| s.init_containers.as_ref())
            .map_or(0, |init| init.len() as u32),
        // Reserved for a future mesh/logging sidecar heuristic.
        sidecar_count: 0,
        volume_types,
        node_type: spec
            .and_then(|s| s.node_selector.as_ref())
            .and_then(extract::node_type_hint),
        runtime_class: spec.and_then(|s| s.runtime_class_name.clone()),
        gpu_count: spec.map_or(0, |s| extract::count_gpu_limits(&s.containers)),
        parallelism,
        completions,
    }
}
