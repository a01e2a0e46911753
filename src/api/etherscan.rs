use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::{decode, get_body, ApiError, HttpGet};

pub const DEFAULT_API_ROOT: &str = "https://api.etherscan.io/api";

const WEI_PER_ETHER: f64 = 1e18;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EtherscanAccountBalance {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: String,
}

impl EtherscanAccountBalance {
    /// Balance in ether. `result` is a wei integer encoded as a string.
    pub fn ether(&self) -> Result<f64, ApiError> {
        if self.status != "1" {
            let reason = if self.result.is_empty() { &self.message } else { &self.result };
            return Err(ApiError::Upstream(format!("etherscan: {reason}")));
        }
        let wei: f64 = self
            .result
            .parse()
            .map_err(|_| ApiError::Upstream(format!("etherscan returned non-numeric balance {:?}", self.result)))?;
        Ok(wei / WEI_PER_ETHER)
    }
}

pub struct EtherscanClient<'a, C: HttpGet + ?Sized> {
    http: &'a C,
    api_root: String,
    api_key: String,
}

impl<'a, C: HttpGet + ?Sized> EtherscanClient<'a, C> {
    pub fn new(http: &'a C, api_root: &str, api_key: &str) -> Self {
        Self { http, api_root: api_root.trim().to_string(), api_key: api_key.to_string() }
    }

    fn balance_url(&self, address: &str) -> Result<Url, ApiError> {
        Url::parse_with_params(
            &self.api_root,
            &[
                ("module", "account"),
                ("action", "balance"),
                ("address", address),
                ("tag", "latest"),
                ("apikey", self.api_key.as_str()),
            ],
        )
        .map_err(|e| ApiError::Transport { url: self.api_root.clone(), reason: e.to_string() })
    }

    pub fn account_balance(&self, address: &str) -> Result<EtherscanAccountBalance, ApiError> {
        let url = self.balance_url(address)?;
        let body = get_body(self.http, url.as_str())?;
        decode(url.as_str(), &body)
    }

    pub fn wallet_balance(&self, address: &str) -> Result<f64, ApiError> {
        self.account_balance(address)?.ether()
    }
}
