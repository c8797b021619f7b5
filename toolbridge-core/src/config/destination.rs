//! Outbound destination policy.
//!
//! The bridge forwards caller-supplied tool arguments to whatever endpoint
//! it is configured with, so the endpoint itself must not point back into
//! the local machine or a private network. [`validate_destination`] is the
//! only way to obtain a [`ValidatedUrl`], and the forwarder accepts nothing
//! else.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use thiserror::Error;
use url::{Host, Url};

/// Hostname suffixes reserved for internal name resolution.
pub const RESERVED_HOST_SUFFIXES: &[&str] = &[".local", ".internal", ".localhost"];

/// Why a destination URL was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DestinationError {
    /// The string is not a parseable absolute URL.
    #[error("invalid server URL '{url}': {reason}")]
    Malformed {
        /// The rejected input
        url: String,
        /// Parser message
        reason: String,
    },

    /// Only `http` and `https` are allowed.
    #[error("unsupported URL scheme '{scheme}': only http and https are allowed")]
    UnsupportedScheme {
        /// The rejected scheme
        scheme: String,
    },

    /// URL has no host component.
    #[error("server URL '{url}' has no host")]
    MissingHost {
        /// The rejected input
        url: String,
    },

    /// Host resolves to a loopback, private, link-local or internal target.
    #[error("server URL host '{host}' is not allowed: {reason}")]
    BlockedHost {
        /// The rejected host
        host: String,
        /// Which rule matched
        reason: &'static str,
    },
}

/// A URL that passed [`validate_destination`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl(Url);

impl ValidatedUrl {
    /// The URL as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The underlying parsed URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Wrap a URL without running the policy, for tests against local mock
    /// servers.
    #[cfg(test)]
    pub(crate) fn assume_valid(raw: &str) -> Self {
        Self(Url::parse(raw).expect("test URL must parse"))
    }
}

impl std::fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Validate a remote endpoint URL against the destination policy.
///
/// # Errors
///
/// Returns [`DestinationError`] if the URL is malformed, uses a scheme other
/// than `http`/`https`, or targets a loopback, unspecified, link-local,
/// private-range, or reserved-suffix host.
pub fn validate_destination(raw: &str) -> Result<ValidatedUrl, DestinationError> {
    let url = Url::parse(raw.trim()).map_err(|e| DestinationError::Malformed {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(DestinationError::UnsupportedScheme {
                scheme: other.to_string(),
            });
        }
    }

    let host = url.host().ok_or_else(|| DestinationError::MissingHost {
        url: raw.to_string(),
    })?;

    let blocked = match &host {
        Host::Domain(domain) => check_domain(domain),
        Host::Ipv4(addr) => check_ip(IpAddr::V4(*addr)),
        Host::Ipv6(addr) => check_ip(IpAddr::V6(*addr)),
    };

    if let Some(reason) = blocked {
        return Err(DestinationError::BlockedHost {
            host: host.to_string(),
            reason,
        });
    }

    Ok(ValidatedUrl(url))
}

fn check_domain(domain: &str) -> Option<&'static str> {
    let name = domain.trim_end_matches('.').to_ascii_lowercase();
    if name == "localhost" {
        return Some("loopback host");
    }
    if RESERVED_HOST_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
    {
        return Some("reserved internal hostname");
    }
    None
}

fn check_ip(addr: IpAddr) -> Option<&'static str> {
    match addr {
        IpAddr::V4(v4) => check_ipv4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(mapped) => check_ipv4(mapped),
            None => check_ipv6(v6),
        },
    }
}

fn check_ipv4(addr: Ipv4Addr) -> Option<&'static str> {
    if addr.is_loopback() {
        Some("loopback address")
    } else if addr.is_unspecified() {
        Some("unspecified address")
    } else if addr.is_link_local() {
        // 169.254.0.0/16, includes the cloud metadata endpoint
        Some("link-local address")
    } else if addr.is_private() {
        // 10/8, 172.16/12, 192.168/16
        Some("private network address")
    } else {
        None
    }
}

fn check_ipv6(addr: Ipv6Addr) -> Option<&'static str> {
    if addr.is_loopback() {
        Some("loopback address")
    } else if addr.is_unspecified() {
        Some("unspecified address")
    } else if addr.is_unicast_link_local() {
        Some("link-local address")
    } else if addr.is_unique_local() {
        Some("private network address")
    } else {
        None
    }
}
