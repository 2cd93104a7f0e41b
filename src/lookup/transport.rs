use std::thread::sleep;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;

use crate::error::{ScanError, ScanResult};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Sends one form-encoded POST and returns the response body.
pub trait Transport {
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> ScanResult<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub limit: usize,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(limit: usize, base_delay: Duration) -> Self {
        Self { limit, base_delay }
    }

    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Exponential backoff, `attempt` counted from 1.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(MAX_BACKOFF)
    }
}

enum Failure {
    Retryable(ScanError),
    Fatal(ScanError),
}

pub struct HttpTransport {
    client: HttpClient,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> ScanResult<Self> {
        let client = HttpClient::builder()
            .timeout(timeout)
            .user_agent(concat!("vtscan/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, retry })
    }

    fn send_once(&self, url: &str, form: &[(&str, &str)]) -> Result<String, Failure> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .map_err(|err| Failure::Retryable(err.into()))?;
        let status = response.status();
        if let Some(failure) = classify_status(status) {
            return Err(failure);
        }
        response.text().map_err(|err| Failure::Retryable(err.into()))
    }
}

impl Transport for HttpTransport {
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> ScanResult<String> {
        let mut attempt = 0usize;
        loop {
            match self.send_once(url, form) {
                Ok(body) => return Ok(body),
                Err(Failure::Retryable(err)) if attempt < self.retry.limit => {
                    attempt += 1;
                    let delay = self.retry.delay_for_attempt(attempt);
                    log::warn!(
                        "lookup attempt {} failed: {}; retrying in {:?}",
                        attempt,
                        err,
                        delay
                    );
                    sleep(delay);
                }
                Err(Failure::Retryable(err)) | Err(Failure::Fatal(err)) => return Err(err),
            }
        }
    }
}

fn classify_status(status: StatusCode) -> Option<Failure> {
    if status == StatusCode::NO_CONTENT {
        return Some(Failure::Fatal(ScanError::Network(
            "request rate limit exceeded (HTTP 204)".into(),
        )));
    }
    if status == StatusCode::FORBIDDEN {
        return Some(Failure::Fatal(ScanError::Network(
            "access denied, check the API key (HTTP 403)".into(),
        )));
    }
    if status.is_server_error() {
        return Some(Failure::Retryable(ScanError::Network(format!(
            "server returned HTTP {}",
            status
        ))));
    }
    if !status.is_success() {
        return Some(Failure::Fatal(ScanError::Network(format!(
            "server returned HTTP {}",
            status
        ))));
    }
    None
}
