use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{decode, get_body, ApiError, HttpGet};
use crate::rate::ShareSample;

pub const DEFAULT_API_ROOT: &str = "https://api.nanopool.org/v1/eth/";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinerGeneralInfo {
    pub status: bool,
    pub data: MinerGeneralInfoData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinerGeneralInfoData {
    #[serde(default)]
    pub account: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub unconfirmed_balance: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub balance: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub hashrate: String,
    #[serde(rename = "avgHashrate", default)]
    pub avg_hashrate: MinerAvgHashrate,
    #[serde(default)]
    pub workers: Vec<MinerGeneralInfoWorker>,
    #[serde(rename = "rewardPerShare", default, skip_serializing_if = "Option::is_none")]
    pub reward_per_share: Option<String>,
    #[serde(rename = "sharesPerHour", default, skip_serializing_if = "Option::is_none")]
    pub shares_per_hour: Option<i64>,
    #[serde(rename = "rewardPerHour", default, skip_serializing_if = "Option::is_none")]
    pub reward_per_hour: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinerAvgHashrate {
    #[serde(default, deserialize_with = "lenient_string")]
    pub h1: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub h3: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub h6: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub h12: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub h24: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinerGeneralInfoWorker {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub uid: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub hashrate: String,
    #[serde(default)]
    pub lastshare: i64,
    #[serde(default)]
    pub rating: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub h1: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub h3: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub h6: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub h12: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub h24: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinerShareRate {
    pub status: bool,
    #[serde(default)]
    pub data: Vec<MinerShareRateData>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MinerShareRateData {
    pub date: i64,
    pub shares: i64,
}

impl From<MinerShareRateData> for ShareSample {
    fn from(d: MinerShareRateData) -> Self {
        ShareSample { timestamp: d.date, shares: d.shares }
    }
}

impl MinerShareRate {
    pub fn samples(&self) -> Vec<ShareSample> {
        self.data.iter().copied().map(ShareSample::from).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinerPayments {
    pub status: bool,
    #[serde(default)]
    pub data: Vec<MinerPaymentsData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinerPaymentsData {
    pub date: i64,
    #[serde(rename = "txHash", default)]
    pub tx_hash: String,
    pub amount: f64,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinerBalance {
    pub status: bool,
    pub data: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtherPrices {
    pub status: bool,
    pub data: OtherPricesData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtherPricesData {
    #[serde(default)]
    pub price_usd: f64,
    #[serde(default)]
    pub price_eur: f64,
    #[serde(default)]
    pub price_rur: f64,
    #[serde(default)]
    pub price_cny: f64,
    #[serde(default)]
    pub price_btc: f64,
}

// Every nanopool body carries `status`; failures add `error` and omit `data`.
#[derive(Debug, Deserialize)]
struct StatusProbe {
    status: bool,
    #[serde(default)]
    error: Option<String>,
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

pub struct NanopoolClient<'a, C: HttpGet + ?Sized> {
    http: &'a C,
    api_root: String,
}

impl<'a, C: HttpGet + ?Sized> NanopoolClient<'a, C> {
    pub fn new(http: &'a C, api_root: &str) -> Self {
        let mut api_root = api_root.trim().to_string();
        if !api_root.ends_with('/') {
            api_root.push('/');
        }
        Self { http, api_root }
    }

    fn fetch<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.api_root, path);
        let body = get_body(self.http, &url)?;
        let probe: StatusProbe = decode(&url, &body)?;
        if !probe.status {
            let msg = probe.error.unwrap_or_else(|| "status false".to_string());
            debug!(%url, error = %msg, "nanopool rejected request");
            return Err(ApiError::Upstream(msg));
        }
        decode(&url, &body)
    }

    pub fn general_info(&self, address: &str) -> Result<MinerGeneralInfo, ApiError> {
        self.fetch(&format!("user/{address}"))
    }

    pub fn payments(&self, address: &str) -> Result<MinerPayments, ApiError> {
        self.fetch(&format!("payments/{address}"))
    }

    pub fn share_rate_history(&self, address: &str) -> Result<MinerShareRate, ApiError> {
        self.fetch(&format!("shareratehistory/{address}"))
    }

    pub fn balance(&self, address: &str) -> Result<MinerBalance, ApiError> {
        self.fetch(&format!("balance/{address}"))
    }

    pub fn prices(&self) -> Result<OtherPrices, ApiError> {
        self.fetch("prices/")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::fake::FakeHttp;

    pub(crate) const ROOT: &str = "http://test.com/";

    pub(crate) const USER_0X01: &str = r#"{
        "status": true,
        "data": {
            "account": "0x01",
            "unconfirmed_balance": "0.0",
            "balance": "0.142",
            "hashrate": 91.3,
            "avgHashrate": {"h1": "90.1", "h3": "89.0", "h6": "88.5", "h12": "90.0", "h24": "90.2"},
            "workers": [
                {"id": "rig-01", "uid": 1, "hashrate": "45.0", "lastshare": 1609459200, "rating": 2000},
                {"id": "rig-02", "uid": 2, "hashrate": "46.3", "lastshare": 1609459100, "rating": 8000}
            ]
        }
    }"#;

    #[test]
    fn general_info_decodes() {
        let http = FakeHttp::default().with("http://test.com/user/0x01", USER_0X01);
        let info = NanopoolClient::new(&http, ROOT).general_info("0x01").unwrap();
        assert!(info.status);
        assert_eq!(info.data.balance, "0.142");
        assert_eq!(info.data.hashrate, "91.3");
        assert_eq!(info.data.avg_hashrate.h24, "90.2");
        assert_eq!(info.data.workers.len(), 2);
        assert_eq!(info.data.workers[1].rating, 8000);
        assert_eq!(info.data.shares_per_hour, None);
    }

    #[test]
    fn root_without_slash_is_normalised() {
        let http = FakeHttp::default().with("http://test.com/balance/0x01", r#"{"status":true,"data":1.5}"#);
        let bal = NanopoolClient::new(&http, "http://test.com").balance("0x01").unwrap();
        assert_eq!(bal.data, 1.5);
    }

    #[test]
    fn share_rate_history_converts_to_samples() {
        let body = r#"{"status":true,"data":[{"date":1200,"shares":4},{"date":1800,"shares":6}]}"#;
        let http = FakeHttp::default().with("http://test.com/shareratehistory/0x02", body);
        let rate = NanopoolClient::new(&http, ROOT).share_rate_history("0x02").unwrap();
        assert_eq!(
            rate.samples(),
            vec![ShareSample { timestamp: 1200, shares: 4 }, ShareSample { timestamp: 1800, shares: 6 }]
        );
    }

    #[test]
    fn payments_and_prices_decode() {
        let http = FakeHttp::default()
            .with(
                "http://test.com/payments/0x01",
                r#"{"status":true,"data":[{"date":1,"txHash":"0xab","amount":0.2,"confirmed":true}]}"#,
            )
            .with("http://test.com/prices/", r#"{"status":true,"data":{"price_usd":730.5,"price_btc":0.025}}"#);
        let client = NanopoolClient::new(&http, ROOT);
        let payments = client.payments("0x01").unwrap();
        assert_eq!(payments.data[0].tx_hash, "0xab");
        let prices = client.prices().unwrap();
        assert_eq!(prices.data.price_usd, 730.5);
        assert_eq!(prices.data.price_eur, 0.0);
    }

    #[test]
    fn status_false_is_upstream_error() {
        let http = FakeHttp::default()
            .with("http://test.com/user/0x02", r#"{"status":false,"error":"Address does not exist"}"#);
        let err = NanopoolClient::new(&http, ROOT).general_info("0x02").unwrap_err();
        assert!(matches!(err, ApiError::Upstream(ref m) if m == "Address does not exist"));
    }

    #[test]
    fn transport_failure_propagates() {
        let http = FakeHttp::default();
        let err = NanopoolClient::new(&http, ROOT).share_rate_history("").unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }));
        assert_eq!(http.requested.lock().unwrap().as_slice(), ["http://test.com/shareratehistory/"]);
    }

    #[test]
    fn garbage_body_is_decode_error() {
        let http = FakeHttp::default().with("http://test.com/balance/0x01", "<html>busy</html>");
        let err = NanopoolClient::new(&http, ROOT).balance("0x01").unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}
