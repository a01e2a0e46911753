use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Share-rate history is bucketed by the pool at this granularity.
pub const BUCKET_SECS: i64 = 600;
const SECS_PER_HOUR: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareSample {
    pub timestamp: i64,
    pub shares: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRequest {
    pub series: Vec<ShareSample>,
    pub requested_hours: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateResult {
    pub shares_per_hour: i64,
    pub effective_hours: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateError {
    #[error("lookback window of {requested_hours}h resolves to zero hours of history")]
    InvalidWindow { requested_hours: i64 },
    #[error("sample at {timestamp} has negative share count {shares}")]
    InvalidInput { timestamp: i64, shares: i64 },
}

pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Round an epoch timestamp down to its 10-minute bucket.
pub fn truncate_to_bucket(epoch: i64) -> i64 {
    epoch - epoch.rem_euclid(BUCKET_SECS)
}

impl RateRequest {
    pub fn new(series: Vec<ShareSample>, requested_hours: i64) -> Self {
        Self { series, requested_hours }
    }

    pub fn compute(&self) -> Result<RateResult, RateError> {
        compute(&self.series, self.requested_hours)
    }
}

pub fn compute(series: &[ShareSample], requested_hours: i64) -> Result<RateResult, RateError> {
    compute_at(series, requested_hours, unix_now())
}

/// Reduce a share-rate history to an hourly rate over the last
/// `requested_hours`, anchored at `now_epoch`.
///
/// A non-positive request means "all history". When the history is shorter
/// than the request, the window shrinks to the rounded span that actually
/// exists and `effective_hours` reports it.
pub fn compute_at(
    series: &[ShareSample],
    requested_hours: i64,
    now_epoch: i64,
) -> Result<RateResult, RateError> {
    if let Some(bad) = series.iter().find(|s| s.shares < 0) {
        return Err(RateError::InvalidInput { timestamp: bad.timestamp, shares: bad.shares });
    }

    if series.is_empty() {
        if requested_hours > 0 {
            return Ok(RateResult { shares_per_hour: 0, effective_hours: requested_hours });
        }
        return Err(RateError::InvalidWindow { requested_hours });
    }

    let now = truncate_to_bucket(now_epoch);
    // A window reaching past the representable range covers all history.
    let cutoff = if requested_hours <= 0 {
        i64::MIN
    } else {
        requested_hours
            .checked_mul(SECS_PER_HOUR)
            .and_then(|span| now.checked_sub(span))
            .unwrap_or(i64::MIN)
    };

    let mut oldest = now;
    let mut total_shares: i64 = 0;
    for sample in series {
        oldest = oldest.min(sample.timestamp);
        if sample.timestamp > cutoff {
            total_shares = total_shares.saturating_add(sample.shares);
        }
    }

    let effective_hours = if oldest > cutoff {
        (now.saturating_sub(oldest) as f64 / SECS_PER_HOUR as f64).round() as i64
    } else {
        requested_hours
    };
    if effective_hours <= 0 {
        return Err(RateError::InvalidWindow { requested_hours });
    }

    let shares_per_hour = (total_shares as f64 / effective_hours as f64).round() as i64;
    Ok(RateResult { shares_per_hour, effective_hours })
}
