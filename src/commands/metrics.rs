use std::thread;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::unbounded;
use tracing::{debug, info, warn};

use crate::api::etherscan::EtherscanClient;
use crate::api::nanopool::NanopoolClient;
use crate::api::HttpGet;
use crate::cli::TimeseriesProtocol;
use crate::config::Settings;
use crate::line_protocol::{FinancialMetric, Metric, Payload, PoolMetric};
use crate::rate::truncate_to_bucket;
use crate::sink::MetricSink;

pub const NANOPOOL_LOCATION: &str = "nanopool";
pub const WALLET_LOCATION: &str = "wallet";

type Collector<'s> = Box<dyn FnOnce() -> Result<Metric> + Send + 's>;

/// Collect every metric, then ship them as one payload.
pub fn run<C: HttpGet + ?Sized>(
    settings: &Settings,
    http: &C,
    now_epoch: i64,
    sink: &mut dyn MetricSink,
) -> Result<()> {
    let metrics = collect(settings, http, now_epoch)?;

    let payload = match settings.timeseries.protocol {
        TimeseriesProtocol::Influxdb => {
            let mut payload = Payload::new();
            for m in &metrics {
                payload.push(m);
            }
            payload
        }
    };
    if payload.is_empty() {
        return Err(anyhow!("No metrics to ship"));
    }
    info!(lines = payload.len(), "Shipping metrics");
    sink.send(&payload.freeze())
}

/// Run the collectors concurrently. Failed collectors are logged and
/// skipped; the result keeps the order pool, nanopool, wallet.
pub fn collect<C: HttpGet + ?Sized>(settings: &Settings, http: &C, now_epoch: i64) -> Result<Vec<Metric>> {
    let address = settings.nanopool.require_address()?;
    let nanopool = NanopoolClient::new(http, &settings.nanopool.api_root);
    let nanopool = &nanopool;

    let mut jobs: Vec<(&'static str, Collector<'_>)> = vec![
        ("pool", Box::new(move || pool_stats(nanopool, address, now_epoch).map(Metric::Pool))),
        ("nanopool", Box::new(move || nanopool_financial(nanopool, address).map(Metric::Financial))),
    ];
    match (settings.etherscan.require_address(), settings.etherscan.require_api_key()) {
        (Ok(wallet), Ok(key)) => {
            let etherscan = EtherscanClient::new(http, &settings.etherscan.api_root, key);
            jobs.push((
                "wallet",
                Box::new(move || wallet_financial(&etherscan, nanopool, wallet).map(Metric::Financial)),
            ));
        }
        (Err(e), _) | (_, Err(e)) => warn!(error = %e, "Skipping wallet metrics"),
    }

    let (tx, rx) = unbounded();
    thread::scope(|s| {
        for (slot, (name, job)) in jobs.into_iter().enumerate() {
            let tx = tx.clone();
            s.spawn(move || {
                tx.send((slot, name, job())).ok();
            });
        }
    });
    drop(tx);

    let mut results: Vec<_> = rx.iter().collect();
    results.sort_by_key(|(slot, _, _)| *slot);

    let mut metrics = Vec::with_capacity(results.len());
    let mut first_err = None;
    for (_, name, result) in results {
        match result {
            Ok(m) => {
                debug!(collector = name, line = %m.to_line().trim_end(), "Collected");
                metrics.push(m);
            }
            Err(e) => {
                warn!(collector = name, error = %format!("{e:#}"), "Collector failed, skipping");
                first_err.get_or_insert(e);
            }
        }
    }

    if metrics.is_empty() {
        return Err(match first_err {
            Some(e) => e.context("No metrics could be collected"),
            None => anyhow!("No metrics could be collected"),
        });
    }
    Ok(metrics)
}

/// Balance plus the share count of the current 10-minute bucket.
fn pool_stats<C: HttpGet + ?Sized>(client: &NanopoolClient<'_, C>, address: &str, now_epoch: i64) -> Result<PoolMetric> {
    let balance = client.balance(address).context("Fetching nanopool balance")?;
    let history = client.share_rate_history(address).context("Fetching share rate history")?;
    let bucket = truncate_to_bucket(now_epoch);
    let current = history
        .data
        .iter()
        .find(|d| d.date == bucket)
        .ok_or_else(|| anyhow!("Bucket {bucket} not found in share rate history"))?;
    Ok(PoolMetric { location: NANOPOOL_LOCATION.to_string(), balance: balance.data, shares: current.shares, timestamp: None })
}

fn nanopool_financial<C: HttpGet + ?Sized>(client: &NanopoolClient<'_, C>, address: &str) -> Result<FinancialMetric> {
    let balance = client.balance(address).context("Fetching nanopool balance")?;
    let prices = client.prices().context("Fetching prices")?;
    Ok(FinancialMetric::priced(NANOPOOL_LOCATION, balance.data, prices.data.price_usd, prices.data.price_btc))
}

fn wallet_financial<C: HttpGet + ?Sized>(
    etherscan: &EtherscanClient<'_, C>,
    nanopool: &NanopoolClient<'_, C>,
    wallet: &str,
) -> Result<FinancialMetric> {
    let balance = etherscan.wallet_balance(wallet).context("Fetching wallet balance")?;
    let prices = nanopool.prices().context("Fetching prices")?;
    Ok(FinancialMetric::priced(WALLET_LOCATION, balance, prices.data.price_usd, prices.data.price_btc))
}
