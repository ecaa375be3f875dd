use std::path::PathBuf;

use error_stack::Report;
use error_stack::ResultExt;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;

use crate::k8s::types::ObserveError;

/// Build an authenticated Kubernetes client.
///
/// An explicit kubeconfig path wins; otherwise the default resolution applies
/// (local kubeconfig, then in-cluster identity).
pub async fn init_kube_client(
    kubeconfig: Option<PathBuf>,
) -> Result<Client, Report<ObserveError>> {
    let client = match kubeconfig {
        Some(kubeconfig_path) => {
            let kubeconfig = Kubeconfig::read_from(&kubeconfig_path).change_context(
                ObserveError::ConnectionFailed {
                    message: format!(
                        "failed to read kubeconfig file: {}",
                        kubeconfig_path.display()
                    ),
                },
            )?;

            let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .change_context(ObserveError::ConnectionFailed {
                    message: format!(
                        "failed to create config from kubeconfig: {}",
                        kubeconfig_path.display()
                    ),
                })?;

            Client::try_from(config).change_context(ObserveError::ConnectionFailed {
                message: "failed to create Kubernetes client from custom kubeconfig".to_string(),
            })?
        }
        None => {
            Client::try_default()
                .await
                .change_context(ObserveError::ConnectionFailed {
                    message: "failed to create Kubernetes client".to_string(),
                })?
        }
    };
    Ok(client)
}
