//! Handler for the `run` command: the interactive pool session.

use std::collections::HashSet;

use serde_json::json;
use tabled::{Table, Tabled};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::adapter::inbound::cli::command::RunArgs;
use crate::adapter::inbound::cli::config::load_or_default;
use crate::adapter::inbound::cli::output;
use crate::adapter::inbound::cli::session::{parse_line, session_help, SessionCommand};
use crate::adapter::outbound::notifier::{describe, ChannelNotifier};
use crate::application::orchestrator::Orchestrator;
use crate::domain::Cluster;
use crate::error::Result;
use crate::infrastructure::bootstrap::build_orchestrator;
use crate::infrastructure::config::settings::Config;
use crate::port::Event;

#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "API")]
    api: String,
    #[tabled(rename = "Workers")]
    workers: u32,
    #[tabled(rename = "Master")]
    master: String,
    #[tabled(rename = "Registry")]
    registry: String,
}

impl From<&Cluster> for ClusterRow {
    fn from(cluster: &Cluster) -> Self {
        Self {
            name: cluster.name().to_string(),
            state: cluster.state.to_string(),
            api: format!("{}:{}", cluster.api_address(), cluster.api_port),
            workers: cluster.worker_count(),
            master: cluster.master_ip.clone().unwrap_or_else(|| "-".into()),
            registry: cluster
                .registry()
                .map_or_else(|| "-".into(), |r| r.address()),
        }
    }
}

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = load_or_default(&args.config)?;
    apply_overrides(&mut config, args, output::is_json());
    config.init_logging();

    output::header(env!("CARGO_PKG_VERSION"));
    print_startup_config(&config);

    let events = ChannelNotifier::new();
    let printer = tokio::spawn(print_events(events.subscribe()));
    let orchestrator = build_orchestrator(&config, Some(&events));

    let recovered = match orchestrator.recover().await {
        Ok(recovered) => recovered,
        Err(e) => {
            warn!(error = %e, "Could not discover running clusters");
            output::warning(&format!("recovery skipped: {e}"));
            Vec::new()
        }
    };
    if !recovered.is_empty() {
        output::success(&format!("Adopted {} running cluster(s)", recovered.len()));
    }
    preallocate(&orchestrator, &config, recovered.len());

    output::hint("type `help` for commands");
    session(&orchestrator, &config).await;

    output::section("Shutting down");
    let report = orchestrator.shutdown(config.pool.shutdown_grace()).await;
    for cluster in &report.abandoned {
        output::warning(&format!("abandoned {} while {}", cluster.name(), cluster.state));
    }
    output::success(&format!(
        "{} background task(s) finished, {} cluster(s) left running",
        report.completed,
        orchestrator.list().len()
    ));
    printer.abort();
    info!("kpool stopped");
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &RunArgs, force_json_logs: bool) {
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs || force_json_logs {
        config.logging.format = "json".to_string();
    }
    if let Some(standby) = args.standby {
        config.pool.standby = standby;
    }
}

fn print_startup_config(config: &Config) {
    output::field("Standby", config.pool.standby);
    output::field(
        "Registry",
        config
            .registry
            .requested()
            .map_or_else(|| "disabled".to_string(), |r| r.to_string()),
    );
    if output::verbosity() > 0 {
        output::field(
            "Ports",
            format!(
                "{}..{}",
                config.network.port_range_start, config.network.port_range_end
            ),
        );
        output::field(
            "Kubeconfigs",
            config.provisioner.resolved_kubeconfig_dir().display(),
        );
    }
}

/// Clusters to create at startup: one active plus the standby pool,
/// minus what was adopted.
pub(crate) fn preallocation_count(standby: usize, recovered: usize) -> usize {
    (standby + 1).saturating_sub(recovered)
}

fn preallocate(orchestrator: &Orchestrator, config: &Config, recovered: usize) {
    let count = preallocation_count(config.pool.standby, recovered);
    let mut names = HashSet::new();
    for _ in 0..count {
        let name = loop {
            match orchestrator.fresh_name() {
                Ok(name) if names.insert(name.clone()) => break Some(name),
                Ok(_) => continue,
                Err(e) => {
                    output::error(&e.to_string());
                    break None;
                }
            }
        };
        let Some(name) = name else {
            return;
        };
        let spec = config
            .cluster
            .spec(Some(name), config.registry.requested());
        orchestrator.spawn_create_standby(spec);
    }
    if count > 0 {
        output::note(&format!("creating {count} cluster(s) in the background"));
    }
}

async fn print_events(mut rx: broadcast::Receiver<Event>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let label = event.cluster_name().unwrap_or("registry").to_string();
                output::event(&label, &describe(&event), event.is_failure());
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                output::warning(&format!("missed {missed} event(s)"));
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn session(orchestrator: &Orchestrator, config: &Config) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => match parse_line(&line) {
                    Ok(Some(SessionCommand::Quit)) => break,
                    Ok(Some(command)) => handle(orchestrator, config, command).await,
                    Ok(None) => {}
                    Err(e) => {
                        output::error(&e.to_string());
                        output::hint("type `help` for commands");
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    output::error(&format!("stdin: {e}"));
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }
}

async fn handle(orchestrator: &Orchestrator, config: &Config, command: SessionCommand) {
    match command {
        SessionCommand::List => list(orchestrator),
        SessionCommand::Create {
            name,
            workers,
            registry,
        } => {
            let name = match name {
                Some(name) => name,
                None => match orchestrator.fresh_name() {
                    Ok(name) => name,
                    Err(e) => return output::error(&e.to_string()),
                },
            };
            let registry = if registry {
                config.registry.requested()
            } else {
                None
            };
            let mut spec = config.cluster.spec(Some(name), registry);
            if let Some(workers) = workers {
                spec = spec.with_workers(workers);
            }
            output::note(&format!("creating {} in the background", spec.name));
            orchestrator.spawn_create(spec);
        }
        SessionCommand::Destroy(name) => match orchestrator.find(&name) {
            Some(cluster) => orchestrator.spawn_destroy(cluster.id),
            None => output::error(&format!("no cluster named '{name}'")),
        },
        SessionCommand::Activate(name) => match orchestrator.find(&name) {
            Some(cluster) => match orchestrator.activate(cluster.id) {
                Ok(cluster) => output::success(&format!("{} is active", cluster.name())),
                Err(e) => output::error(&e.to_string()),
            },
            None => output::error(&format!("no cluster named '{name}'")),
        },
        SessionCommand::Recycle => match orchestrator.recycle() {
            Ok(recycle) => output::success(&format!(
                "{} is active, rebuilding {}",
                recycle.activated.name(),
                recycle.retired.name()
            )),
            Err(e) => output::error(&e.to_string()),
        },
        SessionCommand::Registry => {
            let status = orchestrator.registry_status().await;
            if output::is_json() {
                output::json_output(json!({
                    "command": "registry",
                    "mode": status.mode.as_str(),
                    "address": status.config.as_ref().map(|c| c.address()),
                    "ref_count": status.ref_count,
                }));
                return;
            }
            match status.config {
                Some(config) => {
                    output::field("Registry", output::highlight(&config));
                    output::field("Users", status.ref_count);
                }
                None => output::field("Registry", output::muted("not running")),
            }
        }
        SessionCommand::Help => output::lines(session_help()),
        SessionCommand::Quit => {}
    }
}

fn list(orchestrator: &Orchestrator) {
    let clusters = orchestrator.list();
    if output::is_json() {
        let clusters: Vec<_> = clusters
            .iter()
            .map(|c| {
                json!({
                    "name": c.name(),
                    "id": c.id.to_string(),
                    "state": c.state.as_str(),
                    "api_port": c.api_port,
                    "workers": c.worker_count(),
                    "master_ip": c.master_ip,
                    "registry": c.registry().map(|r| r.address()),
                })
            })
            .collect();
        output::json_output(json!({ "command": "list", "clusters": clusters }));
        return;
    }
    if clusters.is_empty() {
        output::note("(no clusters)");
        return;
    }
    let rows: Vec<ClusterRow> = clusters.iter().map(ClusterRow::from).collect();
    output::lines(&Table::new(rows).to_string());
}
