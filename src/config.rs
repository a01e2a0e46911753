use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::api::{etherscan, nanopool, DEFAULT_TIMEOUT};
use crate::cli::{GlobalArgs, NanopoolArgs, TimeseriesProtocol};

pub const CONFIG_FILE_NAME: &str = "mining-tools.toml";
pub const LOG_FILE_NAME: &str = "mining-tools.log";
pub const DEFAULT_LOG_LEVEL: u8 = 4;
pub const DEFAULT_TIMESERIES_ADDRESS: &str = "127.0.0.1:9009";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("missing required config value: {0}")]
    Missing(&'static str),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("failed to open log file {path}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// On-disk layout. Every field is optional so partial files merge cleanly.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub logging: LoggingSection,
    pub timeseries: TimeseriesSection,
    pub nanopool: NanopoolSection,
    pub etherscan: EtherscanSection,
    pub http: HttpSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub file: Option<PathBuf>,
    pub level: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TimeseriesSection {
    pub address: Option<String>,
    pub protocol: Option<TimeseriesProtocol>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NanopoolSection {
    pub address: Option<String>,
    pub api_root: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EtherscanSection {
    pub address: Option<String>,
    pub api_root: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Self, ConfigError> {
        let path = p.as_ref();
        let txt = fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&txt).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// An explicit path must exist; the default one may not.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }
        match default_path(CONFIG_FILE_NAME) {
            Some(path) if path.exists() => Self::load_from_path(path),
            _ => Ok(Self::default()),
        }
    }
}

fn default_path(file_name: &str) -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(file_name))
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// None when no home directory is known; logs then go to stderr.
    pub file: Option<PathBuf>,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesSettings {
    pub address: String,
    pub protocol: TimeseriesProtocol,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NanopoolSettings {
    pub address: Option<String>,
    pub api_root: String,
}

impl NanopoolSettings {
    pub fn require_address(&self) -> Result<&str, ConfigError> {
        non_empty(&self.address).ok_or(ConfigError::Missing("nanopool.address"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EtherscanSettings {
    pub address: Option<String>,
    pub api_root: String,
    pub api_key: Option<String>,
}

impl EtherscanSettings {
    pub fn require_address(&self) -> Result<&str, ConfigError> {
        non_empty(&self.address).ok_or(ConfigError::Missing("etherscan.address"))
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        non_empty(&self.api_key).ok_or(ConfigError::Missing("etherscan.api_key"))
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Effective configuration: CLI flag, then config file, then built-in default.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub timeseries: TimeseriesSettings,
    pub nanopool: NanopoolSettings,
    pub etherscan: EtherscanSettings,
    pub http_timeout: Duration,
}

impl Settings {
    pub fn load(global: &GlobalArgs, nanopool_args: Option<&NanopoolArgs>) -> Result<Self, ConfigError> {
        let file = FileConfig::load(global.config.as_deref())?;
        Self::resolve(file, global, nanopool_args, default_path(LOG_FILE_NAME))
    }

    pub fn resolve(
        file: FileConfig,
        global: &GlobalArgs,
        nanopool_args: Option<&NanopoolArgs>,
        default_log: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let level = global.log_level.or(file.logging.level).unwrap_or(DEFAULT_LOG_LEVEL);
        if level > 6 {
            return Err(ConfigError::Invalid { field: "logging.level", reason: format!("{level} is not in 0..=6") });
        }
        let timeout_secs = file.http.timeout_secs.unwrap_or(DEFAULT_TIMEOUT.as_secs());
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid { field: "http.timeout_secs", reason: "must be positive".into() });
        }
        let cli_nanopool = nanopool_args.cloned().unwrap_or_default();

        Ok(Self {
            logging: LoggingSettings { file: global.log.clone().or(file.logging.file).or(default_log), level },
            timeseries: TimeseriesSettings {
                address: global
                    .timeseries_db
                    .clone()
                    .or(file.timeseries.address)
                    .unwrap_or_else(|| DEFAULT_TIMESERIES_ADDRESS.to_string()),
                protocol: global.timeseries_protocol.or(file.timeseries.protocol).unwrap_or_default(),
            },
            nanopool: NanopoolSettings {
                address: cli_nanopool.address.or(file.nanopool.address),
                api_root: cli_nanopool
                    .api_root
                    .or(file.nanopool.api_root)
                    .unwrap_or_else(|| nanopool::DEFAULT_API_ROOT.to_string()),
            },
            etherscan: EtherscanSettings {
                address: file.etherscan.address,
                api_root: file.etherscan.api_root.unwrap_or_else(|| etherscan::DEFAULT_API_ROOT.to_string()),
                api_key: file.etherscan.api_key,
            },
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const FULL: &str = r#"
[logging]
file = "/var/log/mt.log"
level = 5

[timeseries]
address = "questdb:9009"
protocol = "influxdb"

[nanopool]
address = "0xpool"
api_root = "http://pool.test/"

[etherscan]
address = "0xwallet"
api_key = "KEY"

[http]
timeout_secs = 3
"#;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn defaults_without_file_or_flags() {
        let s = Settings::resolve(FileConfig::default(), &GlobalArgs::default(), None, None).unwrap();
        assert_eq!(s.logging, LoggingSettings { file: None, level: 4 });
        assert_eq!(s.timeseries.address, "127.0.0.1:9009");
        assert_eq!(s.timeseries.protocol, TimeseriesProtocol::Influxdb);
        assert_eq!(s.nanopool.api_root, "https://api.nanopool.org/v1/eth/");
        assert_eq!(s.etherscan.api_root, "https://api.etherscan.io/api");
        assert_eq!(s.http_timeout, Duration::from_secs(10));
        assert!(matches!(s.nanopool.require_address(), Err(ConfigError::Missing("nanopool.address"))));
    }

    #[test]
    fn file_values_are_used() {
        let f = write_config(FULL);
        let file = FileConfig::load(Some(f.path())).unwrap();
        let s = Settings::resolve(file, &GlobalArgs::default(), None, Some("/home/x/mining-tools.log".into())).unwrap();
        assert_eq!(s.logging.file.as_deref(), Some(Path::new("/var/log/mt.log")));
        assert_eq!(s.logging.level, 5);
        assert_eq!(s.timeseries.address, "questdb:9009");
        assert_eq!(s.nanopool.require_address().unwrap(), "0xpool");
        assert_eq!(s.nanopool.api_root, "http://pool.test/");
        assert_eq!(s.etherscan.require_address().unwrap(), "0xwallet");
        assert_eq!(s.etherscan.require_api_key().unwrap(), "KEY");
        assert_eq!(s.http_timeout, Duration::from_secs(3));
    }

    #[test]
    fn cli_flags_win_over_file() {
        let f = write_config(FULL);
        let file = FileConfig::load(Some(f.path())).unwrap();
        let global = GlobalArgs {
            log: Some("/tmp/override.log".into()),
            log_level: Some(1),
            timeseries_db: Some("10.0.0.1:9009".into()),
            ..Default::default()
        };
        let np = NanopoolArgs { address: Some("0xcli".into()), api_root: None };
        let s = Settings::resolve(file, &global, Some(&np), None).unwrap();
        assert_eq!(s.logging, LoggingSettings { file: Some("/tmp/override.log".into()), level: 1 });
        assert_eq!(s.timeseries.address, "10.0.0.1:9009");
        assert_eq!(s.nanopool.require_address().unwrap(), "0xcli");
        assert_eq!(s.nanopool.api_root, "http://pool.test/");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let f = write_config("[nanopool]\naddress = \"0x01\"\n");
        let file = FileConfig::load(Some(f.path())).unwrap();
        let s = Settings::resolve(file, &GlobalArgs::default(), None, Some("/h/mining-tools.log".into())).unwrap();
        assert_eq!(s.nanopool.require_address().unwrap(), "0x01");
        assert_eq!(s.logging.file.as_deref(), Some(Path::new("/h/mining-tools.log")));
        assert!(matches!(s.etherscan.require_api_key(), Err(ConfigError::Missing("etherscan.api_key"))));
    }

    #[test]
    fn blank_address_counts_as_missing() {
        let np = NanopoolArgs { address: Some("  ".into()), api_root: None };
        let s = Settings::resolve(FileConfig::default(), &GlobalArgs::default(), Some(&np), None).unwrap();
        assert!(matches!(s.nanopool.require_address(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn explicit_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let f = write_config("[logging]\nlevel = \"loud\"\n");
        assert!(matches!(FileConfig::load(Some(f.path())), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let f = write_config("[logging]\nlevel = 9\n");
        let file = FileConfig::load(Some(f.path())).unwrap();
        assert!(matches!(
            Settings::resolve(file, &GlobalArgs::default(), None, None),
            Err(ConfigError::Invalid { field: "logging.level", .. })
        ));

        let f = write_config("[http]\ntimeout_secs = 0\n");
        let file = FileConfig::load(Some(f.path())).unwrap();
        assert!(Settings::resolve(file, &GlobalArgs::default(), None, None).is_err());
    }
}
