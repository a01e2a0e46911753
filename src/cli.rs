use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Clone, Debug, Default)]
pub struct GlobalArgs {
    /// Config file [default: $HOME/mining-tools.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log file [default: $HOME/mining-tools.log]
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,

    /// Log verbosity, 0 (errors only) to 6 (trace) [default: 4]
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(0..=6))]
    pub log_level: Option<u8>,

    /// Time-series DB address [default: 127.0.0.1:9009]
    #[arg(long = "timeseries-db", global = true)]
    pub timeseries_db: Option<String>,

    /// Time-series DB wire protocol
    #[arg(long, value_enum, global = true)]
    pub timeseries_protocol: Option<TimeseriesProtocol>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Query a nanopool Ethereum miner account
    Nanopool(Nanopool),
    /// Collect pool and wallet metrics and ship them to the time-series DB
    Metrics {
        /// Print metrics instead of shipping them to the time-series DB
        #[arg(short, long)]
        dryrun: bool,
    },
}

#[derive(Parser, Clone, Debug)]
pub struct Nanopool {
    #[command(flatten)]
    pub account: NanopoolArgs,

    #[command(subcommand)]
    pub command: NanopoolCommands,
}

#[derive(Args, Clone, Debug, Default)]
pub struct NanopoolArgs {
    /// Miner account address
    #[arg(long, global = true)]
    pub address: Option<String>,

    /// Base URL of the nanopool Ethereum API [default: https://api.nanopool.org/v1/eth/]
    #[arg(long, global = true)]
    pub api_root: Option<String>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum NanopoolCommands {
    /// General info of the miner account, with optional derived values
    GeneralInfo(GeneralInfo),
}

#[derive(Parser, Clone, Debug)]
pub struct GeneralInfo {
    /// Include rewardPerShare (lifetime average)
    #[arg(short = 'r', long)]
    pub reward_per_share: bool,

    /// Include sharesPerHour (rolling average over --hours)
    #[arg(short = 's', long)]
    pub shares_per_hour: bool,

    /// Lookback window for sharesPerHour; 0 or less uses all history
    #[arg(long, default_value_t = 24, allow_negative_numbers = true)]
    pub hours: i64,
}

#[derive(ValueEnum, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeseriesProtocol {
    /// InfluxDB line protocol over TCP (QuestDB ILP)
    #[default]
    Influxdb,
}
