//! Online access to a Rekor log
//!
//! [`LogProofSource`] is the narrow seam the verifier uses to obtain current
//! log evidence. [`RekorClient`] implements it over HTTP; tests substitute
//! their own implementation.

use crate::entry::{LogEntry, LogEntryResponse};
use crate::error::{Error, Result};
use std::time::Duration;

/// Fetches log entries with fresh inclusion proofs
pub trait LogProofSource {
    fn fetch_entry(&self, base_url: &str, log_index: i64) -> Result<LogEntry>;
}

/// Configuration for [`RekorClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RekorClientConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// Additional attempts after a failed request
    pub retries: u32,
    pub user_agent: String,
}

impl Default for RekorClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retries: 3,
            user_agent: format!("sigcheck/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl RekorClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Blocking Rekor v1 API client
pub struct RekorClient {
    config: RekorClientConfig,
    client: reqwest::blocking::Client,
}

impl RekorClient {
    pub fn new(config: RekorClientConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RekorClientConfig {
        &self.config
    }

    fn fetch_once(&self, url: &str) -> std::result::Result<LogEntry, Attempt> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Attempt::Retry(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let msg = format!("{} returned {}: {}", url, status, body.trim());
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                Attempt::Retry(msg)
            } else {
                Attempt::Fatal(msg)
            });
        }

        let entries: LogEntryResponse = response
            .json()
            .map_err(|e| Attempt::Fatal(format!("failed to parse log entry response: {}", e)))?;
        LogEntry::from_response(entries).map_err(|e| Attempt::Fatal(e.to_string()))
    }
}

/// Outcome of one failed request
enum Attempt {
    /// Transport failure, 5xx or 429
    Retry(String),
    /// Any other status, or a body that does not decode
    Fatal(String),
}

impl LogProofSource for RekorClient {
    fn fetch_entry(&self, base_url: &str, log_index: i64) -> Result<LogEntry> {
        let url = format!(
            "{}/api/v1/log/entries?logIndex={}",
            base_url.trim_end_matches('/'),
            log_index
        );

        let mut attempt = 0;
        loop {
            match self.fetch_once(&url) {
                Ok(entry) => {
                    tracing::debug!(%url, uuid = %entry.uuid, "fetched log entry");
                    return Ok(entry);
                }
                Err(Attempt::Fatal(msg)) => return Err(Error::Response(msg)),
                Err(Attempt::Retry(msg)) if attempt < self.config.retries => {
                    let backoff = Duration::from_millis(200 * 2u64.pow(attempt));
                    tracing::warn!(%url, attempt, error = %msg, "log request failed, retrying");
                    std::thread::sleep(backoff);
                    attempt += 1;
                }
                Err(Attempt::Retry(msg)) => return Err(Error::Network(msg)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    /// Serve `requests` HTTP requests on localhost, each answered with `status`
    fn serve(status: &'static str, requests: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        std::thread::spawn(move || {
            for stream in listener.incoming().take(requests) {
                let mut stream = stream.unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut line = String::new();
                while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                    line.clear();
                }
                let body = "{\"code\":0}";
                write!(
                    stream,
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                )
                .unwrap();
            }
        });
        url
    }

    fn client(retries: u32) -> RekorClient {
        RekorClient::new(
            RekorClientConfig::default()
                .with_retries(retries)
                .with_timeout(Duration::from_secs(5)),
        )
        .unwrap()
    }

    #[test]
    fn test_config_builder() {
        let config = RekorClientConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_retries(0)
            .with_user_agent("test");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retries, 0);
        assert_eq!(config.user_agent, "test");
        assert!(RekorClientConfig::default().user_agent.starts_with("sigcheck/"));
    }

    #[test]
    fn test_unreachable_log_is_network_error() {
        let client = RekorClient::new(
            RekorClientConfig::default()
                .with_retries(1)
                .with_timeout(Duration::from_secs(2)),
        )
        .unwrap();
        // port 9 on localhost is the discard service and is normally closed
        let err = client.fetch_entry("http://127.0.0.1:9/", 1).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_not_found_is_not_retryable() {
        let url = serve("404 Not Found", 1);
        let err = client(0).fetch_entry(&url, 1).unwrap_err();
        assert!(matches!(err, Error::Response(_)), "{:?}", err);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_server_error_is_retryable() {
        let url = serve("503 Service Unavailable", 2);
        let err = client(1).fetch_entry(&url, 1).unwrap_err();
        assert!(matches!(err, Error::Network(_)), "{:?}", err);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_undecodable_body_is_not_retryable() {
        // `{"code":0}` is not a map of UUID to entry
        let url = serve("200 OK", 1);
        let err = client(0).fetch_entry(&url, 1).unwrap_err();
        assert!(matches!(err, Error::Response(_)), "{:?}", err);
    }
}
