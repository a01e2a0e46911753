use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub trait MetricSink {
    fn send(&mut self, payload: &[u8]) -> Result<()>;
}

/// Fire-and-forget ILP over TCP; QuestDB never answers on this port.
pub struct TcpSink {
    address: String,
    connect_timeout: Duration,
}

impl TcpSink {
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self { address: address.into(), connect_timeout }
    }

    fn connect(&self) -> Result<TcpStream> {
        let addrs = self
            .address
            .to_socket_addrs()
            .with_context(|| format!("Resolving time-series DB address {}", self.address))?;
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    let _ = stream.set_nodelay(true);
                    return Ok(stream);
                }
                Err(e) => {
                    warn!(?e, %addr, "Connect failed");
                    last_err = Some(e);
                }
            }
        }
        match last_err {
            Some(e) => Err(anyhow::Error::from(e).context(format!("Connecting to time-series DB at {}", self.address))),
            None => Err(anyhow!("No addresses found for {}", self.address)),
        }
    }
}

impl MetricSink for TcpSink {
    fn send(&mut self, payload: &[u8]) -> Result<()> {
        let mut stream = self.connect()?;
        debug!(address = %self.address, payload = %String::from_utf8_lossy(payload), "Sending metrics");
        stream
            .write_all(payload)
            .with_context(|| format!("Writing {} bytes to {}", payload.len(), self.address))?;
        stream.flush().context("Flushing time-series DB stream")?;
        info!(address = %self.address, bytes = payload.len(), "Metrics delivered");
        Ok(())
    }
}

pub struct DryRunSink<W: Write> {
    out: W,
}

impl<W: Write> DryRunSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> MetricSink for DryRunSink<W> {
    fn send(&mut self, payload: &[u8]) -> Result<()> {
        write!(self.out, "DRYRUN: Metrics in InfluxDB Line format - {}", String::from_utf8_lossy(payload))?;
        self.out.flush()?;
        Ok(())
    }
}
