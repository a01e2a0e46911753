use thiserror::Error;

use crate::api::nanopool::{MinerGeneralInfoWorker, MinerPaymentsData};

#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    #[error("balance {0:?} is not a number")]
    InvalidBalance(String),
    #[error("account has no shares; reward per share is undefined")]
    NoShares,
}

pub fn total_payout(payments: &[MinerPaymentsData]) -> f64 {
    payments.iter().map(|p| p.amount).sum()
}

/// Lifetime shares, as reported through each worker's rating.
pub fn total_shares(workers: &[MinerGeneralInfoWorker]) -> i64 {
    workers.iter().map(|w| w.rating).sum()
}

/// Lifetime average reward per share: (unpaid balance + paid out) / shares.
pub fn reward_per_share(balance: &str, total_payout: f64, total_shares: i64) -> Result<f64, StatsError> {
    let balance: f64 = balance
        .trim()
        .parse()
        .map_err(|_| StatsError::InvalidBalance(balance.to_string()))?;
    if total_shares == 0 {
        return Err(StatsError::NoShares);
    }
    Ok((balance + total_payout) / total_shares as f64)
}

pub fn reward_per_hour(reward_per_share: f64, shares_per_hour: i64) -> f64 {
    reward_per_share * shares_per_hour as f64
}

pub fn format_amount(v: f64) -> String {
    format!("{v:.6}")
}
