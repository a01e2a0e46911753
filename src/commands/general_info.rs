use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, info};

use crate::api::nanopool::{MinerGeneralInfo, NanopoolClient};
use crate::api::HttpGet;
use crate::cli::GeneralInfo;
use crate::config::Settings;
use crate::rate::RateRequest;
use crate::stats;

/// Fetch the account's general info, enrich it as requested and print it
/// as pretty JSON.
pub fn run<C: HttpGet + ?Sized, W: Write>(
    settings: &Settings,
    args: &GeneralInfo,
    http: &C,
    out: &mut W,
) -> Result<()> {
    let address = settings.nanopool.require_address()?;
    let client = NanopoolClient::new(http, &settings.nanopool.api_root);

    let mut info = client
        .general_info(address)
        .with_context(|| format!("Fetching general info for {address}"))?;

    let reward_per_share = if args.reward_per_share {
        let payments = client
            .payments(address)
            .with_context(|| format!("Fetching payments for {address}"))?;
        let payout = stats::total_payout(&payments.data);
        let shares = stats::total_shares(&info.data.workers);
        let r = stats::reward_per_share(&info.data.balance, payout, shares).context("Computing reward per share")?;
        debug!(payout, shares, reward_per_share = r, "Reward per share");
        info.data.reward_per_share = Some(stats::format_amount(r));
        Some(r)
    } else {
        None
    };

    let shares_per_hour = if args.shares_per_hour {
        let history = client
            .share_rate_history(address)
            .with_context(|| format!("Fetching share rate history for {address}"))?;
        let result = RateRequest::new(history.samples(), args.hours)
            .compute()
            .with_context(|| format!("Computing shares per hour over {}h", args.hours))?;
        if result.effective_hours != args.hours {
            info!(
                requested = args.hours,
                effective = result.effective_hours,
                "Share history does not cover the requested window"
            );
        }
        info.data.shares_per_hour = Some(result.shares_per_hour);
        Some(result.shares_per_hour)
    } else {
        None
    };

    if let (Some(rps), Some(sph)) = (reward_per_share, shares_per_hour) {
        info.data.reward_per_hour = Some(stats::format_amount(stats::reward_per_hour(rps, sph)));
    }

    write_pretty(&info, out)
}

fn write_pretty<W: Write>(info: &MinerGeneralInfo, out: &mut W) -> Result<()> {
    let mut ser = serde_json::Serializer::with_formatter(&mut *out, PrettyFormatter::with_indent(b"    "));
    info.serialize(&mut ser).context("Encoding general info")?;
    writeln!(out)?;
    Ok(())
}
