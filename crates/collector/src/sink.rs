//! Record delivery. Every record always goes to stdout as one NDJSON line;
//! a file sink and a webhook sink are layered on top when configured.
//!
//! Sink failures are logged and swallowed. A full disk or an unreachable
//! webhook must never stall or kill the observation loop.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use tokio::fs::File;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;
use workload_types::WorkloadDescription;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

struct Webhook {
    client: reqwest::Client,
    url: String,
}

pub struct SinkSet {
    file: Option<Mutex<File>>,
    webhook: Option<Webhook>,
}

impl SinkSet {
    /// Open the configured sinks. Opening is fail-fast: a sink that cannot be
    /// set up aborts startup rather than silently dropping records later.
    pub async fn open(output: Option<&Path>, post_url: Option<&str>) -> anyhow::Result<Self> {
        let file = match output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await.with_context(|| {
                            format!("failed to create output directory {}", parent.display())
                        })?;
                    }
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await
                    .with_context(|| format!("failed to open output file {}", path.display()))?;
                Some(Mutex::new(file))
            }
            None => None,
        };

        let webhook = match post_url {
            Some(url) => {
                let client = reqwest::Client::builder()
                    .timeout(WEBHOOK_TIMEOUT)
                    .build()
                    .context("failed to build webhook HTTP client")?;
                Some(Webhook {
                    client,
                    url: url.to_string(),
                })
            }
            None => None,
        };

        Ok(Self { file, webhook })
    }

    /// Deliver one record to every configured sink.
    pub async fn emit(&self, record: &WorkloadDescription) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(error) => {
                warn!(%error, "failed to serialize record, dropping it");
                return;
            }
        };

        println!("{line}");

        if let Some(file) = &self.file {
            let mut file = file.lock().await;
            let write = async {
                file.write_all(line.as_bytes()).await?;
                file.write_all(b"\n").await?;
                file.flush().await
            };
            if let Err(error) = write.await {
                warn!(%error, "failed to append record to output file");
            }
        }

        if let Some(webhook) = &self.webhook {
            match webhook.client.post(&webhook.url).json(record).send().await {
                Ok(response) if !response.status().is_success() => {
                    warn!(
                        status = %response.status(),
                        url = %webhook.url,
                        "webhook rejected record"
                    );
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(%error, url = %webhook.url, "failed to post record to webhook");
                }
            }
        }
    }
}

#[cfg(test)]
impl SinkSet {
    /// Stdout-only sink set for tests.
    pub(crate) fn default_for_tests() -> Self {
        Self {
            file: None,
            webhook: None,
        }
    }
}
