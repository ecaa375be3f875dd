use clap::ValueEnum;
use derive_more::Display;
use kube::runtime::watcher;
use thiserror::Error;

/// The four watchable workload kinds.
///
/// Also the kind component of dedup fingerprints, so identical names across
/// kinds never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Display)]
pub enum WorkloadKind {
    #[value(name = "Deployment")]
    Deployment,
    #[value(name = "Job")]
    Job,
    #[value(name = "CronJob")]
    CronJob,
    #[value(name = "Pod")]
    Pod,
}

/// Errors surfaced by the observation pipeline.
#[derive(Debug, Error)]
pub enum ObserveError {
    #[error("failed to connect to Kubernetes API: {message}")]
    ConnectionFailed { message: String },
    /// The API server rejected a request outright (auth, RBAC, bad resource).
    #[error("cluster rejected {kind} request: {message}")]
    RequestRejected { kind: WorkloadKind, message: String },
    /// Network-level interruption; the affected subscription is reopened.
    #[error("{kind} watch interrupted: {message}")]
    WatchInterrupted { kind: WorkloadKind, message: String },
}

impl ObserveError {
    /// A fatal error stops the whole run; cluster access failures are not
    /// specific to one resource kind.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::WatchInterrupted { .. })
    }
}

pub(crate) fn classify_kube_error(kind: WorkloadKind, error: &kube::Error) -> ObserveError {
    match error {
        kube::Error::Api(response) => ObserveError::RequestRejected {
            kind,
            message: format!("{} (status {})", response.message, response.code),
        },
        kube::Error::Auth(_) => ObserveError::RequestRejected {
            kind,
            message: error.to_string(),
        },
        _ => ObserveError::WatchInterrupted {
            kind,
            message: error.to_string(),
        },
    }
}

pub(crate) fn classify_watcher_error(kind: WorkloadKind, error: &watcher::Error) -> ObserveError {
    match error {
        watcher::Error::InitialListFailed(inner)
        | watcher::Error::WatchStartFailed(inner)
        | watcher::Error::WatchFailed(inner) => classify_kube_error(kind, inner),
        watcher::Error::WatchError(response) if response.code == 401 || response.code == 403 => {
            ObserveError::RequestRejected {
                kind,
                message: format!("{} (status {})", response.message, response.code),
            }
        }
        other => ObserveError::WatchInterrupted {
            kind,
            message: other.to_string(),
        },
    }
}
