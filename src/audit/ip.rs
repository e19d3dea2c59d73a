use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::time::Duration;

/// Placeholder IP used whenever the lookup fails for any reason
pub const UNKNOWN_IP: &str = "unknown";

/// Best-effort resolver of the caller's public IP address.
///
/// Resolution must never fail: implementations map every error to
/// [`UNKNOWN_IP`] so the audit path cannot disturb the operation being
/// audited.
pub trait IpResolver: Send + Sync {
    fn resolve(&self) -> String;
}

#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: String,
}

/// Resolver backed by an HTTP IP-echo service returning `{"ip": "..."}`.
///
/// Carries its own bounded timeout so a slow lookup cannot block the
/// critical path.
pub struct HttpIpResolver {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpIpResolver {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build IP lookup client")?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    fn lookup(&self) -> Result<String> {
        let response: IpResponse = self
            .client
            .get(&self.url)
            .send()
            .context("IP lookup request failed")?
            .error_for_status()
            .context("IP lookup returned an error status")?
            .json()
            .context("Failed to parse IP lookup response")?;

        Ok(response.ip)
    }
}

impl IpResolver for HttpIpResolver {
    fn resolve(&self) -> String {
        match self.lookup() {
            Ok(ip) => ip,
            Err(err) => {
                warn!("IP lookup failed, recording as unknown: {:#}", err);
                UNKNOWN_IP.to_string()
            }
        }
    }
}
