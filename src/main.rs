//! netpol-e2e - NetworkPolicy enforcement tests for Cluster API workload clusters
//!
//! Resolves a workload cluster's kubeconfig from the management cluster,
//! starts a client and a server pod in different namespaces, and checks that
//! an ingress-denial NetworkPolicy blocks the client and that removing it
//! restores connectivity.
//!
//! ## Usage
//!
//! ```bash
//! # Run every scenario against cluster "rke" in namespace "bm-osp"
//! KUBECONFIG=~/.kube/mgmt.yaml netpol-e2e run --cluster rke --namespace bm-osp
//!
//! # Run only the policy scenario and print JSON
//! netpol-e2e run --scenario network-policy --format json
//!
//! # List scenarios
//! netpol-e2e list --detailed
//!
//! # Write a config file with the defaults
//! netpol-e2e config init --output netpol-e2e.yaml
//! ```

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;

mod cli;
mod config;
mod executor;
mod k8s;
mod models;
mod output;
mod probe;
mod scenarios;
mod utils;

use cli::Args;
use config::{EnvConfig, SuiteConfig};
use executor::{SuiteContext, SuiteRunner};
use models::ScenarioKind;
use output::{OutputFormat, ResultFormatter};
use utils::logger::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    init_logger(LogLevel::resolve(args.verbose, env.log.as_deref()));

    match args.command {
        cli::Command::Run(run_args) => {
            run_suite(run_args, &env).await?;
        }
        cli::Command::List(list_args) => {
            list_scenarios(list_args);
        }
        cli::Command::Env => {
            config::print_env_help();
            println!();
            env.print_summary();
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args, &env)?;
        }
    }

    Ok(())
}

/// Defaults, then the config file, then `NETPOL_E2E_*`, then command-line flags
fn build_config(args: &cli::RunArgs, env: &EnvConfig) -> Result<SuiteConfig> {
    let mut config = match args.config.as_ref().or(env.config_file.as_ref()) {
        Some(path) => SuiteConfig::load(path)?,
        None => SuiteConfig::default(),
    };
    config.apply_env(env)?;

    if let Some(cluster) = &args.cluster {
        config.cluster_name = cluster.clone();
    }
    if let Some(namespace) = &args.namespace {
        config.cluster_namespace = namespace.clone();
    }
    if let Some(image) = &args.image {
        config.network.image = image.clone();
    }
    if let Some(selection) = &args.scenario {
        config.scenarios = ScenarioKind::parse_selection(selection).map_err(anyhow::Error::msg)?;
    }
    if args.kubeconfig.is_some() {
        config.kubeconfig = args.kubeconfig.clone();
    }

    config.validate()?;
    Ok(config)
}

fn output_format(args: &cli::RunArgs, env: &EnvConfig) -> Result<OutputFormat> {
    match args.format.as_ref().or(env.format.as_ref()) {
        Some(name) => OutputFormat::from_str(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown output format: {name}")),
        None => Ok(OutputFormat::Table),
    }
}

async fn run_suite(args: cli::RunArgs, env: &EnvConfig) -> Result<()> {
    let config = build_config(&args, env)?;
    let format = output_format(&args, env)?;
    let selected = config.scenarios.clone();

    info!(
        "Testing cluster {}/{} ({} scenarios)",
        config.cluster_namespace,
        config.cluster_name,
        selected.len()
    );

    let ctx = SuiteContext::connect(config).await?;
    let summary = SuiteRunner::new(&ctx).run(&selected).await;

    println!("{}", ResultFormatter::new(format).format_summary(&summary));

    if let Some(path) = &args.output {
        output::write_results_to_file(path, &summary, format)?;
        info!("Results saved to {path}");
    }

    if !summary.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

fn list_scenarios(args: cli::ListArgs) {
    println!("\nNetwork Policy E2E Scenarios\n");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut current_category = "";

    for kind in ScenarioKind::all() {
        let category = kind.category();
        if category != current_category {
            println!("\n{category}:");
            println!("──────────────────────────────────────────────────────────────────────");
            current_category = category;
        }

        if args.detailed {
            println!("  {:2}. {:28} [{}]", kind.number(), kind.name(), kind.id());
        } else {
            println!("  {:2}. {}", kind.number(), kind.name());
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
}

fn manage_config(args: cli::ConfigArgs, env: &EnvConfig) -> Result<()> {
    use std::path::Path;

    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = Path::new(&output);
            if path.exists() && !force {
                bail!("Configuration file already exists: {output}. Use --force to overwrite.");
            }

            SuiteConfig::default().save(path)?;
            println!("✓ Configuration file created: {output}");
        }

        cli::ConfigAction::Show { file, format } => {
            let mut config = match file.as_ref().or(env.config_file.as_ref()) {
                Some(path) => SuiteConfig::load(path)?,
                None => SuiteConfig::default(),
            };
            config.apply_env(env)?;

            let output = if format == "json" {
                serde_json::to_string_pretty(&config)?
            } else {
                serde_yaml::to_string(&config)?
            };
            println!("{output}");
        }

        cli::ConfigAction::Validate { file } => match SuiteConfig::load(&file) {
            Ok(_) => {
                println!("✓ Configuration file is valid: {file}");
            }
            Err(e) => {
                println!("✗ Configuration file is invalid: {file}");
                println!("  Error: {e:#}");
                return Err(e);
            }
        },
    }

    Ok(())
}
