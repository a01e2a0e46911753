mod api;
mod cli;
mod commands;
mod config;
mod line_protocol;
mod logging;
mod rate;
mod sink;
mod stats;

use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::debug;

use crate::api::{ApiError, HttpClient};
use crate::cli::{Cli, Commands, Nanopool, NanopoolCommands};
use crate::commands::{general_info, metrics};
use crate::config::{ConfigError, Settings};
use crate::rate::{unix_now, RateError};
use crate::sink::{DryRunSink, MetricSink, TcpSink, DEFAULT_CONNECT_TIMEOUT};
use crate::stats::StatsError;

fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help().ok();
        println!();
        return Ok(());
    };

    let nanopool_args = match &command {
        Commands::Nanopool(n) => Some(&n.account),
        Commands::Metrics { .. } => None,
    };
    let settings = Settings::load(&cli.global, nanopool_args)?;
    logging::init(&settings.logging)?;
    debug!(
        timeseries = %settings.timeseries.address,
        nanopool = %settings.nanopool.api_root,
        level = settings.logging.level,
        "Configuration loaded"
    );

    let http = HttpClient::new(settings.http_timeout)?;
    match command {
        Commands::Nanopool(Nanopool { command: NanopoolCommands::GeneralInfo(args), .. }) => {
            general_info::run(&settings, &args, &http, &mut io::stdout().lock())
        }
        Commands::Metrics { dryrun } => {
            let mut sink: Box<dyn MetricSink> = if dryrun {
                Box::new(DryRunSink::new(io::stdout()))
            } else {
                Box::new(TcpSink::new(settings.timeseries.address.clone(), DEFAULT_CONNECT_TIMEOUT))
            };
            metrics::run(&settings, &http, unix_now(), sink.as_mut())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        // Map to stable exit codes
        let code = exit_code_for_error(&err);
        eprintln!("error: {err:?}");
        std::process::exit(code);
    }
}

pub(crate) fn exit_code_for_error(err: &anyhow::Error) -> i32 {
    // 2: config, 3: upstream API, 4: time-series sink I/O, 5: rate computation, 1: other
    for cause in err.chain() {
        if cause.is::<ConfigError>() {
            return 2;
        }
        if cause.is::<ApiError>() {
            return 3;
        }
        if cause.is::<RateError>() || cause.is::<StatsError>() {
            return 5;
        }
        if cause.is::<io::Error>() {
            return 4;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn exit_code_config() {
        let err = anyhow::Error::from(ConfigError::Missing("nanopool.address"));
        assert_eq!(exit_code_for_error(&err), 2);
    }

    #[test]
    fn exit_code_api() {
        let err = anyhow::Error::from(ApiError::Upstream("Address does not exist".into())).context("Fetching general info");
        assert_eq!(exit_code_for_error(&err), 3);
    }

    #[test]
    fn exit_code_sink_io_error() {
        let err = Err::<(), _>(io::Error::from(io::ErrorKind::ConnectionRefused))
            .context("Connecting to time-series DB")
            .unwrap_err();
        assert_eq!(exit_code_for_error(&err), 4);
    }

    #[test]
    fn exit_code_rate_error() {
        let err = anyhow::Error::from(RateError::InvalidWindow { requested_hours: 0 });
        assert_eq!(exit_code_for_error(&err), 5);
        let err = anyhow::Error::from(StatsError::NoShares);
        assert_eq!(exit_code_for_error(&err), 5);
    }

    #[test]
    fn exit_code_log_file_is_config() {
        let err = anyhow::Error::from(ConfigError::LogFile {
            path: "/nope/x.log".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        assert_eq!(exit_code_for_error(&err), 2);
    }

    #[test]
    fn exit_code_other() {
        let err = anyhow::anyhow!("other");
        assert_eq!(exit_code_for_error(&err), 1);
    }
}
