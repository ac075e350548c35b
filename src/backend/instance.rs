//! Instance and address types

use serde::{Deserialize, Serialize};
use std::fmt;
use url::{Host, Url};

use crate::error::{AppError, Result};

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Validated `host:port` pair of a backend instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceAddress {
    host: String,
    port: u16,
    base: Url,
}

impl InstanceAddress {
    /// Validate and build an address. The host must be an IP literal or a
    /// DNS hostname, the port must be non-zero.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        if port == 0 {
            return Err(AppError::InvalidAddress("port must be in 1..=65535".to_string()));
        }
        let parsed = parse_host(host)?;
        let base = Url::parse(&format!("http://{}:{}/", parsed, port))
            .map_err(|e| AppError::InvalidAddress(format!("'{}': {}", host, e)))?;

        Ok(Self {
            host: host.to_string(),
            port,
            base,
        })
    }

    /// Parse a port given as free text, as form fields arrive
    pub fn parse_port(raw: &str) -> Result<u16> {
        raw.trim()
            .parse::<u16>()
            .map_err(|_| AppError::InvalidAddress(format!("'{}' is not a valid port", raw)))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL for requests to this instance, without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// URL of `path` on this instance, with an optional raw query string
    pub fn url(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(query);
        url
    }
}

impl fmt::Display for InstanceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base.host() {
            Some(host) => write!(f, "{}:{}", host, self.port),
            None => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

/// IP literal (IPv6 with or without brackets) or a DNS hostname made of
/// letters, digits and inner hyphens
fn parse_host(host: &str) -> Result<Host> {
    if host.is_empty() {
        return Err(AppError::InvalidAddress("host must not be empty".to_string()));
    }
    let invalid = || AppError::InvalidAddress(format!("'{}' is not a valid host", host));

    let parsed = if host.contains(':') && !host.starts_with('[') {
        Host::parse(&format!("[{}]", host))
    } else {
        Host::parse(host)
    }
    .map_err(|_| invalid())?;

    if let Host::Domain(domain) = &parsed {
        if domain.len() > MAX_HOSTNAME_LEN {
            return Err(AppError::InvalidAddress("host name is too long".to_string()));
        }
        let valid_label = |label: &str| {
            !label.is_empty()
                && label.len() <= MAX_LABEL_LEN
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        };
        if !domain.split('.').all(valid_label) {
            return Err(invalid());
        }
    }

    Ok(parsed)
}

/// One backend instance tracked by the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub address: InstanceAddress,
    pub healthy: bool,
}

impl Instance {
    /// New instances start healthy
    pub fn new(address: InstanceAddress) -> Self {
        Self {
            address,
            healthy: true,
        }
    }
}

/// Wire shape of an instance: `{ip, port, active}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceView {
    pub ip: String,
    pub port: u16,
    pub active: bool,
}

impl From<&Instance> for InstanceView {
    fn from(instance: &Instance) -> Self {
        Self {
            ip: instance.address.host().to_string(),
            port: instance.address.port(),
            active: instance.healthy,
        }
    }
}
