//! Host information lookup.
//!
//! The derived variables of a host tree include its IP address, fully
//! qualified domain name and DNS aliases. [`HostLookup`] hides where those
//! come from: [`DnsLookup`] asks the system resolver, [`StaticLookup`] serves
//! a fixed table (used in tests and for hosts that are not in DNS yet).

use std::collections::HashMap;
use std::net::{IpAddr, ToSocketAddrs};

use log::{debug, warn};

use crate::error::{Error, Result};

/// Network identity of a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub ip: Option<IpAddr>,
    pub fqdn: String,
    pub aliases: Vec<String>,
}

impl HostInfo {
    /// The identity of a host nothing is known about.
    pub fn unresolved(hostname: &str) -> Self {
        Self {
            ip: None,
            fqdn: hostname.to_string(),
            aliases: Vec::new(),
        }
    }
}

/// Resolves host names to [`HostInfo`].
pub trait HostLookup: Send + Sync {
    fn lookup(&self, hostname: &str) -> Result<HostInfo>;
}

/// Resolves `<hostname>.<domain>` through the system resolver.
///
/// A host that does not resolve gets an empty IP unless the lookup is
/// [strict](DnsLookup::strict), in which case it fails the build.
#[derive(Debug, Clone, Default)]
pub struct DnsLookup {
    domain: Option<String>,
    strict: bool,
}

impl DnsLookup {
    pub fn new(domain: Option<String>) -> Self {
        Self {
            domain,
            strict: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn fqdn(&self, hostname: &str) -> String {
        match &self.domain {
            Some(domain) if !domain.is_empty() => {
                format!("{}.{}", hostname, domain.trim_start_matches('.'))
            }
            _ => hostname.to_string(),
        }
    }
}

impl HostLookup for DnsLookup {
    fn lookup(&self, hostname: &str) -> Result<HostInfo> {
        let fqdn = self.fqdn(hostname);
        debug!("Resolving {}", fqdn);
        let ip = match (fqdn.as_str(), 0u16).to_socket_addrs() {
            Ok(mut addrs) => addrs.next().map(|addr| addr.ip()),
            Err(e) if self.strict => {
                return Err(Error::HostLookup {
                    host: fqdn,
                    message: e.to_string(),
                })
            }
            Err(e) => {
                warn!("Cannot resolve {}: {}", fqdn, e);
                None
            }
        };
        Ok(HostInfo {
            ip,
            fqdn,
            aliases: Vec::new(),
        })
    }
}

/// A fixed host table. Unknown hosts resolve to [`HostInfo::unresolved`].
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    hosts: HashMap<String, HostInfo>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, hostname: &str, info: HostInfo) -> Self {
        self.hosts.insert(hostname.to_string(), info);
        self
    }
}

impl HostLookup for StaticLookup {
    fn lookup(&self, hostname: &str) -> Result<HostInfo> {
        Ok(self
            .hosts
            .get(hostname)
            .cloned()
            .unwrap_or_else(|| HostInfo::unresolved(hostname)))
    }
}
