//! # CLI Interface
//!
//! Command-line arguments for `longchain-node`, via `clap` derive. Two
//! subcommands: `simulate` runs a whole in-memory network in one process,
//! `version` prints build information.

use clap::{Parser, Subcommand, ValueEnum};

use longchain_protocol::config::DEFAULT_IDLE_BACKOFF_MS;

use crate::logging::LogFormat;

/// longchain simulation node.
///
/// Runs several longest-valid-chain nodes on a shared in-memory network,
/// drives them with wallet traffic, and serves a read-only inspection API
/// with Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "longchain-node",
    about = "longchain longest-valid-chain simulation node",
    version,
    propagate_version = true
)]
pub struct LongchainCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run N nodes on an in-memory network with generated traffic.
    Simulate(SimulateArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Number of nodes on the network.
    #[arg(long, short = 'n', env = "LONGCHAIN_NODES", default_value_t = 4,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub nodes: u16,

    /// Number of wallets generating traffic.
    #[arg(long, short = 'w', env = "LONGCHAIN_WALLETS", default_value_t = 3,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub wallets: u16,

    /// Milliseconds between generated transactions.
    #[arg(long, env = "LONGCHAIN_TX_INTERVAL_MS", default_value_t = 750)]
    pub tx_interval_ms: u64,

    /// Milliseconds a node sleeps after a cycle with nothing to propose.
    #[arg(long, env = "LONGCHAIN_BACKOFF_MS", default_value_t = DEFAULT_IDLE_BACKOFF_MS)]
    pub backoff_ms: u64,

    /// Reject blocks containing unsigned or badly signed transactions.
    #[arg(long, env = "LONGCHAIN_REQUIRE_SIGNED")]
    pub require_signed: bool,

    /// Stop after this many seconds. Runs until Ctrl+C when omitted.
    #[arg(long, short = 'd', env = "LONGCHAIN_DURATION_SECS")]
    pub duration_secs: Option<u64>,

    /// Port for the inspection API and `/metrics`.
    #[arg(long, env = "LONGCHAIN_API_PORT", default_value_t = 9841)]
    pub api_port: u16,

    /// Resource name the reservation contract manages.
    #[arg(long, env = "LONGCHAIN_RESOURCE", default_value = "court-7")]
    pub resource: String,

    /// Log output format.
    #[arg(long, env = "LONGCHAIN_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        LongchainCli::command().debug_assert();
    }

    #[test]
    fn simulate_defaults() {
        let cli = LongchainCli::try_parse_from(["longchain-node", "simulate"]).unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.nodes, 4);
        assert_eq!(args.backoff_ms, DEFAULT_IDLE_BACKOFF_MS);
        assert!(!args.require_signed);
        assert!(args.duration_secs.is_none());
        assert_eq!(args.log_format, LogFormatArg::Pretty);
    }

    #[test]
    fn simulate_flags() {
        let cli = LongchainCli::try_parse_from([
            "longchain-node",
            "simulate",
            "-n",
            "7",
            "--require-signed",
            "--duration-secs",
            "30",
            "--log-format",
            "json",
        ])
        .unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.nodes, 7);
        assert!(args.require_signed);
        assert_eq!(args.duration_secs, Some(30));
        assert_eq!(args.log_format, LogFormatArg::Json);
    }

    #[test]
    fn zero_nodes_rejected() {
        assert!(LongchainCli::try_parse_from(["longchain-node", "simulate", "-n", "0"]).is_err());
    }
}
