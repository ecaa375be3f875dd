//! Live observation loops. One task per workload kind lists current objects,
//! subscribes to changes, and funnels accepted changes through extraction into
//! the sinks.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use error_stack::Report;
use futures::StreamExt;
use kube::api::ListParams;
use kube::runtime::watcher;
use kube::runtime::watcher::Event;
use kube::Api;
use kube::Client;
use kube::ResourceExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;
use workload_types::WorkloadDescription;

use crate::dedup::SeenCache;
use crate::k8s::extract::WorkloadResource;
use crate::k8s::record;
use crate::k8s::types::classify_kube_error;
use crate::k8s::types::classify_watcher_error;
use crate::k8s::types::ObserveError;
use crate::k8s::types::WorkloadKind;
use crate::sink::SinkSet;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Namespace allow-list; `None` admits every namespace.
    pub namespaces: Option<HashSet<String>>,
    /// Emit records for objects that already exist at startup.
    pub emit_initial: bool,
    pub dedup_ttl: Duration,
    pub dedup_max_entries: usize,
}

#[derive(Clone)]
pub struct WatchController {
    client: Client,
    options: WatchOptions,
    sinks: Arc<SinkSet>,
}

impl WatchController {
    pub fn new(client: Client, options: WatchOptions, sinks: Arc<SinkSet>) -> Self {
        Self {
            client,
            options,
            sinks,
        }
    }

    /// Observe the selected kinds until cancellation or a fatal error.
    ///
    /// A fatal error on any kind cancels the remaining loops; the first such
    /// report is returned.
    pub async fn run(
        &self,
        kinds: &[WorkloadKind],
        token: CancellationToken,
    ) -> Result<(), Report<ObserveError>> {
        let mut tasks = JoinSet::new();
        let mut started: HashSet<WorkloadKind> = HashSet::new();

        for &kind in kinds {
            if !started.insert(kind) {
                continue;
            }
            let controller = self.clone();
            let token = token.clone();
            match kind {
                WorkloadKind::Deployment => {
                    tasks.spawn(async move {
                        controller
                            .watch_kind::<k8s_openapi::api::apps::v1::Deployment>(token)
                            .await
                    });
                }
                WorkloadKind::Job => {
                    tasks.spawn(async move {
                        controller
                            .watch_kind::<k8s_openapi::api::batch::v1::Job>(token)
                            .await
                    });
                }
                WorkloadKind::CronJob => {
                    tasks.spawn(async move {
                        controller
                            .watch_kind::<k8s_openapi::api::batch::v1::CronJob>(token)
                            .await
                    });
                }
                WorkloadKind::Pod => {
                    tasks.spawn(async move {
                        controller
                            .watch_kind::<k8s_openapi::api::core::v1::Pod>(token)
                            .await
                    });
                }
            }
        }

        let mut first_failure: Option<Report<ObserveError>> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(report)) => {
                    error!("observation loop failed: {report:?}");
                    token.cancel();
                    first_failure.get_or_insert(report);
                }
                Err(join_error) => {
                    error!(%join_error, "observation task panicked");
                    token.cancel();
                    first_failure.get_or_insert(Report::new(ObserveError::ConnectionFailed {
                        message: format!("observation task panicked: {join_error}"),
                    }));
                }
            }
        }

        match first_failure {
            Some(report) => Err(report),
            None => Ok(()),
        }
    }

    #[tracing::instrument(skip(self, token), fields(kind = %K::KIND))]
    async fn watch_kind<K: WorkloadResource>(
        &self,
        token: CancellationToken,
    ) -> Result<(), Report<ObserveError>> {
        let api: Api<K> = Api::all(self.client.clone());
        let mut cache = SeenCache::new(self.options.dedup_ttl, self.options.dedup_max_entries);

        if self.options.emit_initial {
            self.emit_current(&api, &mut cache).await?;
        }

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("observation loop stopped");
                    return Ok(());
                }
                result = self.subscribe(&api, &mut cache) => {
                    match result {
                        Ok(()) => {
                            warn!("change stream ended, reconnecting");
                        }
                        Err(report) if report.current_context().is_fatal() => {
                            return Err(report);
                        }
                        Err(report) => {
                            warn!("change stream interrupted, reconnecting: {report:?}");
                        }
                    }
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    /// List and emit the current objects of a kind, priming the dedup cache so
    /// the first stream snapshot does not re-emit them.
    async fn emit_current<K: WorkloadResource>(
        &self,
        api: &Api<K>,
        cache: &mut SeenCache,
    ) -> Result<(), Report<ObserveError>> {
        let objects = api
            .list(&ListParams::default())
            .await
            .map_err(|error| Report::new(classify_kube_error(K::KIND, &error)))?;

        info!(count = objects.items.len(), "emitting current objects");
        for object in &objects.items {
            self.process(object, cache).await;
        }
        Ok(())
    }

    /// Run one subscription until it ends or errors.
    async fn subscribe<K: WorkloadResource>(
        &self,
        api: &Api<K>,
        cache: &mut SeenCache,
    ) -> Result<(), Report<ObserveError>> {
        let mut stream = watcher(api.clone(), watcher::Config::default()).boxed();

        while let Some(event) = stream.next().await {
            match event {
                Ok(Event::Applied(object)) => {
                    self.process(&object, cache).await;
                }
                Ok(Event::Restarted(objects)) => {
                    // Stream snapshots re-deliver live objects; the dedup gate
                    // suppresses the ones observed recently.
                    for object in &objects {
                        self.process(object, cache).await;
                    }
                }
                // Deletions carry no declared state to describe.
                Ok(Event::Deleted(_)) => {}
                Err(error) => {
                    return Err(Report::new(classify_watcher_error(K::KIND, &error))
                        .attach_printable("change stream produced an error"));
                }
            }
        }
        Ok(())
    }

    async fn process<K: WorkloadResource>(&self, object: &K, cache: &mut SeenCache) {
        if let Some(record) = self.accept(object, cache) {
            self.sinks.emit(&record).await;
        }
    }

    /// Gate one observed object through the namespace filter, the dedup cache,
    /// and shape extraction. `None` means the change is dropped.
    fn accept<K: WorkloadResource>(
        &self,
        object: &K,
        cache: &mut SeenCache,
    ) -> Option<WorkloadDescription> {
        let namespace = object.namespace().unwrap_or_else(|| "default".to_string());
        if let Some(allowed) = &self.options.namespaces {
            if !allowed.contains(&namespace) {
                return None;
            }
        }

        let name = object.name_any();
        let resource_version = object.resource_version().unwrap_or_else(|| "0".to_string());
        if cache.seen((namespace.clone(), K::KIND, name, resource_version)) {
            return None;
        }

        let extracted = object.extract()?;
        Some(record::build_description(
            &namespace,
            &extracted.kind,
            &extracted.name,
            &extracted.template,
            extracted.parent.as_ref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::apps::v1::DeploymentSpec;
    use k8s_openapi::api::core::v1::PodTemplateSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;

    fn test_controller(namespaces: Option<HashSet<String>>) -> WatchController {
        let config = kube::Config::new("http://localhost:8080".parse().unwrap());
        let client = Client::try_from(config).unwrap();
        WatchController::new(
            client,
            WatchOptions {
                namespaces,
                emit_initial: false,
                dedup_ttl: Duration::from_secs(10),
                dedup_max_entries: 100,
            },
            Arc::new(SinkSet::default_for_tests()),
        )
    }

    fn deployment(namespace: &str, name: &str, resource_version: &str) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                resource_version: Some(resource_version.to_string()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                template: PodTemplateSpec::default(),
                ..Default::default()
            }),
            status: None,
        }
    }

    #[tokio::test]
    async fn redelivered_change_is_accepted_once() {
        let controller = test_controller(None);
        let mut cache = SeenCache::new(Duration::from_secs(10), 100);
        let object = deployment("default", "web", "42");

        assert!(controller.accept(&object, &mut cache).is_some());
        assert!(controller.accept(&object, &mut cache).is_none());
    }

    #[tokio::test]
    async fn new_resource_version_is_a_new_change() {
        let controller = test_controller(None);
        let mut cache = SeenCache::new(Duration::from_secs(10), 100);

        assert!(controller
            .accept(&deployment("default", "web", "42"), &mut cache)
            .is_some());
        assert!(controller
            .accept(&deployment("default", "web", "43"), &mut cache)
            .is_some());
    }

    #[tokio::test]
    async fn namespace_filter_drops_other_namespaces() {
        let allowed: HashSet<String> = ["prod".to_string()].into();
        let controller = test_controller(Some(allowed));
        let mut cache = SeenCache::new(Duration::from_secs(10), 100);

        assert!(controller
            .accept(&deployment("staging", "web", "1"), &mut cache)
            .is_none());
        assert!(controller
            .accept(&deployment("prod", "web", "1"), &mut cache)
            .is_some());
    }
}
