//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// NetworkPolicy enforcement tests for Cluster API workload clusters
#[derive(Parser, Debug)]
#[command(name = "netpol-e2e")]
#[command(version = "0.1.0")]
#[command(about = "Verify NetworkPolicy enforcement on a Cluster API workload cluster")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the e2e scenarios against a workload cluster
    Run(RunArgs),

    /// List available scenarios
    List(ListArgs),

    /// Show supported environment variables and their current values
    Env,

    /// Manage configuration files
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Cluster API cluster name
    #[arg(short, long)]
    pub cluster: Option<String>,

    /// Management namespace holding the cluster and its secrets
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Scenarios to run (comma-separated ids or numbers)
    #[arg(short, long)]
    pub scenario: Option<String>,

    /// Image for the test pods
    #[arg(long)]
    pub image: Option<String>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Configuration file (YAML or JSON)
    #[arg(long)]
    pub config: Option<String>,

    /// Management cluster kubeconfig
    #[arg(long)]
    pub kubeconfig: Option<String>,

    /// Save results to file
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show scenario ids and categories
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a configuration file with default values
    Init {
        /// Output path
        #[arg(short, long, default_value = "netpol-e2e.yaml")]
        output: String,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show {
        /// Configuration file to start from
        #[arg(short, long)]
        file: Option<String>,

        /// Output format (yaml, json)
        #[arg(long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file
        file: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["netpol-e2e", "list", "--detailed"]);
        match args.command {
            Command::List(list_args) => {
                assert!(list_args.detailed);
            }
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_run_args() {
        let args = Args::parse_from([
            "netpol-e2e",
            "run",
            "--cluster",
            "rke",
            "--scenario",
            "network-policy",
            "-f",
            "json",
            "-v",
        ]);
        assert!(args.verbose);
        match args.command {
            Command::Run(run_args) => {
                assert_eq!(run_args.cluster.as_deref(), Some("rke"));
                assert_eq!(run_args.scenario.as_deref(), Some("network-policy"));
                assert_eq!(run_args.format.as_deref(), Some("json"));
                assert!(run_args.namespace.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_config_init_defaults() {
        let args = Args::parse_from(["netpol-e2e", "config", "init"]);
        match args.command {
            Command::Config(ConfigArgs {
                action: ConfigAction::Init { output, force },
            }) => {
                assert_eq!(output, "netpol-e2e.yaml");
                assert!(!force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
