mod config;
mod dedup;
mod k8s;
mod logging;
mod manifest;
mod sink;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;

use crate::config::Cli;
use crate::config::Commands;
use crate::k8s::client::init_kube_client;
use crate::k8s::watcher::WatchController;
use crate::k8s::watcher::WatchOptions;
use crate::sink::SinkSet;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();
    logging::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch(watch_args) => run_watch(watch_args).await,
        Commands::FromFile(from_file_args) => run_from_file(from_file_args).await,
    }
}

async fn run_watch(args: config::WatchArgs) -> Result<()> {
    tracing::info!(kinds = ?args.kinds, "starting workload observation");

    let client = init_kube_client(args.kubeconfig)
        .await
        .map_err(|report| anyhow::anyhow!("{report:?}"))?;

    let sinks = SinkSet::open(args.output.as_deref(), args.post.as_deref())
        .await
        .context("failed to open record sinks")?;

    let options = WatchOptions {
        namespaces: args
            .namespaces
            .map(|namespaces| namespaces.into_iter().collect::<HashSet<_>>()),
        emit_initial: args.emit_initial,
        dedup_ttl: Duration::from_secs(args.dedup_ttl_secs),
        dedup_max_entries: args.dedup_max_entries,
    };
    let controller = WatchController::new(client, options, Arc::new(sinks));

    let token = tokio_util::sync::CancellationToken::new();
    let shutdown_token = token.clone();
    tokio::spawn(async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for shutdown signal");
        }
        tracing::info!("shutdown signal received");
        shutdown_token.cancel();
    });

    controller
        .run(&args.kinds, token)
        .await
        .map_err(|report| anyhow::anyhow!("{report:?}"))
}

async fn run_from_file(args: config::FromFileArgs) -> Result<()> {
    let records = manifest::describe_manifest(&args.path)?;
    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}
