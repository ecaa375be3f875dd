//! Shape extraction: pulls a uniform pod-template view out of the four
//! structurally distinct workload kinds.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Container;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::api::core::v1::Volume;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::Resource;
use kube::ResourceExt;
use serde::de::DeserializeOwned;
use workload_types::ContainerSpec;
use workload_types::VolumeType;

use crate::k8s::quantity::parse_cpu_mcpu;
use crate::k8s::quantity::parse_mem_mib;
use crate::k8s::types::WorkloadKind;

/// Stable node-selector key carrying the instance-type hint.
const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";
/// Deprecated beta key, still set by some clusters.
const INSTANCE_TYPE_LABEL_BETA: &str = "beta.kubernetes.io/instance-type";

/// Uniform intermediate shape shared by all four workload kinds.
#[derive(Debug, Clone)]
pub(crate) struct ExtractedWorkload {
    /// Logical workload kind; for pods this is the first owner's kind.
    pub kind: String,
    /// Logical workload name; for pods this is the first owner's name.
    pub name: String,
    pub template: PodTemplateSpec,
    pub parent: Option<JobParams>,
}

/// Job-level scheduling hints, present only for Job resources.
#[derive(Debug, Clone, Copy)]
pub(crate) struct JobParams {
    pub parallelism: Option<i32>,
    pub completions: Option<i32>,
}

/// A watchable workload resource that can surrender a normalized pod template.
///
/// `extract` returning `None` means the change is not actionable and is
/// silently skipped.
pub(crate) trait WorkloadResource:
    Resource<DynamicType = ()> + Clone + DeserializeOwned + std::fmt::Debug + Send + Sync + 'static
{
    const KIND: WorkloadKind;

    fn extract(&self) -> Option<ExtractedWorkload>;
}

impl WorkloadResource for Deployment {
    const KIND: WorkloadKind = WorkloadKind::Deployment;

    fn extract(&self) -> Option<ExtractedWorkload> {
        Some(ExtractedWorkload {
            kind: Self::KIND.to_string(),
            name: self.name_any(),
            template: self.spec.as_ref()?.template.clone(),
            parent: None,
        })
    }
}

impl WorkloadResource for Job {
    const KIND: WorkloadKind = WorkloadKind::Job;

    fn extract(&self) -> Option<ExtractedWorkload> {
        let spec = self.spec.as_ref()?;
        Some(ExtractedWorkload {
            kind: Self::KIND.to_string(),
            name: self.name_any(),
            template: spec.template.clone(),
            parent: Some(JobParams {
                parallelism: spec.parallelism,
                completions: spec.completions,
            }),
        })
    }
}

impl WorkloadResource for CronJob {
    const KIND: WorkloadKind = WorkloadKind::CronJob;

    // The pod template sits three levels down; a CronJob without one is not
    // actionable.
    fn extract(&self) -> Option<ExtractedWorkload> {
        let template = self
            .spec
            .as_ref()?
            .job_template
            .spec
            .as_ref()?
            .template
            .clone();
        Some(ExtractedWorkload {
            kind: Self::KIND.to_string(),
            name: self.name_any(),
            template,
            parent: None,
        })
    }
}

impl WorkloadResource for Pod {
    const KIND: WorkloadKind = WorkloadKind::Pod;

    fn extract(&self) -> Option<ExtractedWorkload> {
        // Only the first owner reference names the logical workload; later
        // entries are ignored (single-controller ownership convention).
        let (kind, name) = match self.owner_references().first() {
            Some(owner) => (owner.kind.clone(), owner.name.clone()),
            None => (Self::KIND.to_string(), self.name_any()),
        };
        Some(ExtractedWorkload {
            kind,
            name,
            template: PodTemplateSpec {
                metadata: Some(self.metadata.clone()),
                spec: self.spec.clone(),
            },
            parent: None,
        })
    }
}

/// Classify a volume by its source; first matching source wins, anything
/// unrecognized is `other`, never dropped.
pub(crate) fn classify_volume(volume: &Volume) -> VolumeType {
    if volume.empty_dir.is_some() {
        VolumeType::EmptyDir
    } else if volume.host_path.is_some() {
        VolumeType::HostPath
    } else if volume.persistent_volume_claim.is_some() {
        VolumeType::Pvc
    } else if volume.config_map.is_some() {
        VolumeType::ConfigMap
    } else if volume.secret.is_some() {
        VolumeType::Secret
    } else if volume.downward_api.is_some() {
        VolumeType::DownwardApi
    } else if volume.projected.is_some() {
        VolumeType::Projected
    } else if volume.nfs.is_some() {
        VolumeType::Nfs
    } else if volume.ephemeral.is_some() {
        VolumeType::Ephemeral
    } else {
        VolumeType::Other
    }
}

/// Normalize one primary container, unit-normalizing its resource quantities.
pub(crate) fn container_spec(container: &Container) -> ContainerSpec {
    let resources = container.resources.as_ref();
    let requests = resources.and_then(|r| r.requests.as_ref());
    let limits = resources.and_then(|r| r.limits.as_ref());

    ContainerSpec {
        name: container.name.clone(),
        image: container.image.clone().unwrap_or_default(),
        command: container.command.clone(),
        args: container.args.clone(),
        req_cpu_mcpu: parse_cpu_mcpu(quantity_str(requests, "cpu")),
        req_mem_mib: parse_mem_mib(quantity_str(requests, "memory")),
        lim_cpu_mcpu: parse_cpu_mcpu(quantity_str(limits, "cpu")),
        lim_mem_mib: parse_mem_mib(quantity_str(limits, "memory")),
    }
}

/// Sum GPU resources declared across container limits. Any limit key
/// containing `gpu` counts; unparseable values are skipped.
pub(crate) fn count_gpu_limits(containers: &[Container]) -> u32 {
    let mut total = 0u32;
    for container in containers {
        let Some(limits) = container.resources.as_ref().and_then(|r| r.limits.as_ref()) else {
            continue;
        };
        for (key, value) in limits {
            if !key.contains("gpu") {
                continue;
            }
            if let Ok(count) = value.0.trim().parse::<f64>() {
                total += count as u32;
            }
        }
    }
    total
}

/// Instance-type hint from the node selector, preferring the stable label key.
pub(crate) fn node_type_hint(node_selector: &BTreeMap<String, String>) -> Option<String> {
    node_selector
        .get(INSTANCE_TYPE_LABEL)
        .or_else(|| node_selector.get(INSTANCE_TYPE_LABEL_BETA))
        .cloned()
}

fn quantity_str<'a>(
    quantities: Option<&'a BTreeMap<String, Quantity>>,
    key: &str,
) -> Option<&'a str> {
    quantities
        .and_then(|map| map.get(key))
        .map(|quantity| quantity.0.as_str())
}
