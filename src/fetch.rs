//! Synchronous HTTP fetch layer
//!
//! One shared agent, fixed per-request timeout, non-2xx mapped to a
//! transport error. Every fetch in the pipeline goes through here.

use crate::error::Error;
use std::io::Read;
use std::time::Duration;

const USER_AGENT: &str = "rakuten-m3u/0.2";

pub struct Fetcher {
    agent: ureq::Agent,
}

impl Fetcher {
    pub fn new(timeout_secs: u64) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs)))
            .build()
            .new_agent();
        Self { agent }
    }

    /// Fetch a URL as UTF-8 text.
    pub fn text(&self, url: &str) -> Result<String, Error> {
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| Error::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::transport(url, format!("HTTP status {}", status)));
        }

        response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::transport(url, e))
    }

    /// Fetch a URL as raw bytes (the guide feed arrives gzip-compressed).
    pub fn bytes(&self, url: &str) -> Result<Vec<u8>, Error> {
        let response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| Error::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::transport(url, format!("HTTP status {}", status)));
        }

        let mut bytes = Vec::new();
        response
            .into_body()
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| Error::transport(url, e))?;
        Ok(bytes)
    }
}
