use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use tracing_subscriber::EnvFilter;

use flowlift::cli::{CheckArgs, Command, InitArgs, MigrateArgs, RootArgs, SanitizeArgs};
use flowlift::config::{config_stub, load_config, EnvironmentEndpoints, MigrationConfig};
use flowlift::export::stage_flows_for_export;
use flowlift::migrate::{migrate_flows, ApplyOptions};
use flowlift::nifi::{wait_until_ready, NifiClient, RegistryClient};
use flowlift::sanitize::sanitize_snapshot;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = RootArgs::parse();
    match args.command {
        Command::Init(args) => cmd_init(args),
        Command::Check(args) => cmd_check(args),
        Command::Migrate(args) => cmd_migrate(args),
        Command::Sanitize(args) => cmd_sanitize(args),
    }
}

fn cmd_init(args: InitArgs) -> Result<()> {
    if args.out.exists() && !args.force {
        return Err(anyhow!(
            "{} already exists (use --force to overwrite)",
            args.out.display()
        ));
    }
    fs::write(&args.out, config_stub())
        .with_context(|| format!("write {}", args.out.display()))?;
    println!("Wrote config stub to {}", args.out.display());
    Ok(())
}

fn cmd_check(args: CheckArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let (canvas, registry) = connect_environment("source", &config.source, &config)?;

    let exported = stage_flows_for_export(&canvas, &registry, &config.flows)?;
    for flow in &exported {
        println!(
            "{}: bucket {}, {} bytes exported",
            flow.name,
            flow.bucket_name,
            flow.definition.len()
        );
    }
    println!("All {} flow(s) passed source preconditions.", exported.len());
    Ok(())
}

fn cmd_migrate(args: MigrateArgs) -> Result<()> {
    let config = load_config(&args.config)?;

    let (source_canvas, source_registry) = connect_environment("source", &config.source, &config)?;
    tracing::info!(flows = config.flows.len(), "staging flows for export");
    let exported = stage_flows_for_export(&source_canvas, &source_registry, &config.flows)?;

    let (target_canvas, target_registry) = connect_environment("target", &config.target, &config)?;
    let options = ApplyOptions {
        propagation_delay: config.propagation_delay(),
    };
    let summary = migrate_flows(&target_canvas, &target_registry, &exported, &options)?;

    for name in &summary.created {
        println!("created: {name}");
    }
    for name in &summary.updated {
        println!("updated: {name}");
    }
    println!(
        "Migrated {} flow(s) ({} created, {} updated).",
        summary.created.len() + summary.updated.len(),
        summary.created.len(),
        summary.updated.len()
    );
    Ok(())
}

fn cmd_sanitize(args: SanitizeArgs) -> Result<()> {
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("read {}", args.input.display()))?;
    let mut snapshot: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parse {}", args.input.display()))?;
    sanitize_snapshot(&mut snapshot);

    let rendered = serde_json::to_string_pretty(&snapshot).context("serialize snapshot")?;
    match &args.output {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("write {}", path.display()))?;
            println!("Wrote sanitized snapshot to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Bring up one environment's clients, blocking until both endpoints answer.
fn connect_environment(
    which: &str,
    endpoints: &EnvironmentEndpoints,
    config: &MigrationConfig,
) -> Result<(NifiClient, RegistryClient)> {
    tracing::info!(environment = which, "connecting to NiFi and Registry");

    let canvas = NifiClient::new(&endpoints.nifi_api_url);
    wait_until_ready(
        &format!("{which} NiFi"),
        canvas.base_url(),
        config.poll_interval(),
        config.max_wait(),
        || canvas.is_up(),
    )?;

    let registry = RegistryClient::new(&endpoints.registry_api_url);
    wait_until_ready(
        &format!("{which} Registry"),
        registry.base_url(),
        config.poll_interval(),
        config.max_wait(),
        || registry.is_up(),
    )?;

    Ok((canvas, registry))
}
