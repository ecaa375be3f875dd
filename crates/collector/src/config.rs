use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueHint;

use crate::k8s::types::WorkloadKind;

#[derive(Parser, Debug)]
#[command(author, version, about = "Observe Kubernetes workload changes and emit normalized NDJSON records")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch a live cluster for workload changes
    Watch(WatchArgs),
    /// Describe workloads from a local manifest file
    #[command(name = "from-file")]
    FromFile(FromFileArgs),
}

#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Workload kinds to observe
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [WorkloadKind::Deployment, WorkloadKind::Job, WorkloadKind::CronJob]
    )]
    pub kinds: Vec<WorkloadKind>,

    /// Namespace allow-list; omit to observe every namespace
    #[arg(long, value_delimiter = ',')]
    pub namespaces: Option<Vec<String>>,

    /// Emit records for objects that already exist at startup
    #[arg(long)]
    pub emit_initial: bool,

    /// Path to a kubeconfig file; defaults to standard resolution
    #[arg(long, env = "KUBECONFIG", value_hint = ValueHint::FilePath)]
    pub kubeconfig: Option<PathBuf>,

    /// Append records to this NDJSON file in addition to stdout
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// POST each record as JSON to this URL in addition to stdout
    #[arg(long)]
    pub post: Option<String>,

    /// Seconds a change fingerprint suppresses re-emission
    #[arg(long, default_value_t = 10)]
    pub dedup_ttl_secs: u64,

    /// Upper bound on tracked change fingerprints
    #[arg(long, default_value_t = 5000)]
    pub dedup_max_entries: usize,
}

#[derive(Parser, Debug)]
pub struct FromFileArgs {
    /// Manifest file to describe (YAML or JSON)
    #[arg(value_hint = ValueHint::FilePath)]
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_defaults_exclude_pods() {
        let cli = Cli::parse_from(["collector", "watch"]);
        let Commands::Watch(args) = cli.command else {
            panic!("expected watch command");
        };
        assert_eq!(
            args.kinds,
            vec![WorkloadKind::Deployment, WorkloadKind::Job, WorkloadKind::CronJob]
        );
        assert!(args.namespaces.is_none());
        assert!(!args.emit_initial);
        assert_eq!(args.dedup_ttl_secs, 10);
        assert_eq!(args.dedup_max_entries, 5000);
    }

    #[test]
    fn kinds_parse_as_capitalized_names() {
        let cli = Cli::parse_from(["collector", "watch", "--kinds", "Pod,CronJob"]);
        let Commands::Watch(args) = cli.command else {
            panic!("expected watch command");
        };
        assert_eq!(args.kinds, vec![WorkloadKind::Pod, WorkloadKind::CronJob]);
    }

    #[test]
    fn namespaces_split_on_commas() {
        let cli = Cli::parse_from(["collector", "watch", "--namespaces", "prod,staging"]);
        let Commands::Watch(args) = cli.command else {
            panic!("expected watch command");
        };
        assert_eq!(
            args.namespaces,
            Some(vec!["prod".to_string(), "staging".to_string()])
        );
    }

    #[test]
    fn from_file_takes_a_path() {
        let cli = Cli::parse_from(["collector", "from-file", "deploy.yaml"]);
        let Commands::FromFile(args) = cli.command else {
            panic!("expected from-file command");
        };
        assert_eq!(args.path, PathBuf::from("deploy.yaml"));
    }
}
