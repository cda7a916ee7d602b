use async_trait::async_trait;
use bytes::Bytes;
use clamav_client::{clean, TransportProtocol};
use docup_core::{ScanVerdict, ScannerConfig};
use docup_processing::ContentScanner;
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::str;
use std::time::{Duration, Instant};

/// TCP transport whose connect, read and write calls are bounded by `timeout`,
/// so a stalled clamd cannot pin a blocking-pool thread.
struct TimedTcp {
    address: String,
    timeout: Duration,
}

impl TransportProtocol for TimedTcp {
    type Stream = TcpStream;

    fn connect(&self) -> io::Result<Self::Stream> {
        let mut last_err = None;
        for addr in self.address.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.timeout))?;
                    stream.set_write_timeout(Some(self.timeout))?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no addresses resolved for {}", self.address),
            )
        }))
    }
}

#[derive(Clone, Debug)]
pub struct ClamAVService {
    host: String,
    port: u16,
    /// Timeout in seconds for each scan or ping (default: 10)
    timeout_secs: u64,
}

impl ClamAVService {
    /// Create a new ClamAVService.
    ///
    /// # Arguments
    /// * `host` - ClamAV daemon hostname
    /// * `port` - ClamAV daemon port (typically 3310)
    pub fn new(host: String, port: u16) -> Self {
        Self::with_timeout(host, port, 10)
    }

    /// Create with a custom timeout (for large files or slow ClamAV instances).
    pub fn with_timeout(host: String, port: u16, timeout_secs: u64) -> Self {
        Self {
            host,
            port,
            timeout_secs,
        }
    }

    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::with_timeout(config.host.clone(), config.port, config.timeout_secs)
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn transport(&self) -> TimedTcp {
        TimedTcp {
            address: self.address(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    /// Scan in-memory data using sync API inside spawn_blocking to avoid !Send tokio futures.
    pub async fn scan_bytes(&self, data: Bytes) -> ScanVerdict {
        let start = Instant::now();
        tracing::debug!(host = %self.host, port = %self.port, size_bytes = data.len(), "Starting ClamAV scan");
        let connection = self.transport();

        let timeout_secs = self.timeout_secs;
        let result = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            tokio::task::spawn_blocking(move || {
                match clamav_client::scan_buffer(&data, connection, None) {
                    Ok(response_bytes) => interpret_response(&response_bytes),
                    Err(e) => ScanVerdict::Unavailable(format!("ClamAV scan error: {}", e)),
                }
            }),
        )
        .await;

        let verdict = match result {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => ScanVerdict::Unavailable(format!("ClamAV scan task join error: {}", e)),
            Err(_) => ScanVerdict::Unavailable(format!(
                "ClamAV scan timeout (exceeded {} seconds)",
                timeout_secs
            )),
        };

        match &verdict {
            ScanVerdict::Clean => tracing::info!(
                duration_ms = start.elapsed().as_millis(),
                "File scan completed: clean"
            ),
            ScanVerdict::Infected(virus) => tracing::warn!(
                duration_ms = start.elapsed().as_millis(),
                virus = %virus,
                "File scan detected virus"
            ),
            ScanVerdict::Unavailable(reason) => tracing::error!(
                duration_ms = start.elapsed().as_millis(),
                error = %reason,
                "ClamAV scan failed"
            ),
        }

        verdict
    }

    /// Send PING and expect PONG.
    pub async fn ping(&self) -> bool {
        let connection = self.transport();
        let result = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            tokio::task::spawn_blocking(move || clamav_client::ping(connection)),
        )
        .await;

        match result {
            Ok(Ok(Ok(response))) => response == clamav_client::PONG,
            Ok(Ok(Err(e))) => {
                tracing::debug!(error = %e, "ClamAV ping failed");
                false
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "ClamAV ping task join error");
                false
            }
            Err(_) => {
                tracing::debug!(timeout_secs = self.timeout_secs, "ClamAV ping timeout");
                false
            }
        }
    }
}

#[async_trait]
impl ContentScanner for ClamAVService {
    async fn scan(&self, data: Bytes) -> ScanVerdict {
        self.scan_bytes(data).await
    }

    async fn is_available(&self) -> bool {
        self.ping().await
    }
}

/// Map a raw clamd reply to a verdict.
fn interpret_response(response_bytes: &[u8]) -> ScanVerdict {
    match clean(response_bytes) {
        Ok(true) => ScanVerdict::Clean,
        Ok(false) => {
            let response_str = str::from_utf8(response_bytes).unwrap_or("unknown");
            match parse_signature(response_str) {
                Some(virus_name) => ScanVerdict::Infected(virus_name),
                None => ScanVerdict::Unavailable(format!(
                    "Unexpected ClamAV response: {}",
                    response_str.trim_matches(char::from(0)).trim()
                )),
            }
        }
        Err(e) => ScanVerdict::Unavailable(format!("Failed to parse ClamAV response: {}", e)),
    }
}

/// Extract the signature name from a reply like `stream: Eicar-Test-Signature FOUND`.
fn parse_signature(response: &str) -> Option<String> {
    let response = response.trim_matches(char::from(0)).trim();
    let body = response.strip_suffix("FOUND")?.trim_end();
    let name = body.rsplit_once(':').map_or(body, |(_, name)| name).trim();
    if name.is_empty() {
        Some("unknown".to_string())
    } else {
        Some(name.to_string())
    }
}
