use std::net::IpAddr;

use reqwest::header::HeaderMap;

/// Proxy headers consulted before the direct peer address, highest precedence first.
pub const FORWARDING_HEADERS: [&str; 4] = [
    "x-forwarded-for",
    "client-ip",
    "x-client-ip",
    "x-cluster-client-ip",
];

/// Where the paying user's request came from, as seen by the merchant server.
#[non_exhaustive]
#[derive(Clone, Debug, Default)]
pub struct RequestOrigin {
    pub headers: HeaderMap,
    pub remote_addr: Option<IpAddr>,
}

impl RequestOrigin {
    #[must_use]
    pub fn new(headers: HeaderMap, remote_addr: Option<IpAddr>) -> Self {
        Self {
            headers,
            remote_addr,
        }
    }

    #[must_use]
    pub fn from_remote_addr(remote_addr: IpAddr) -> Self {
        Self::new(HeaderMap::new(), Some(remote_addr))
    }

    /// Resolves the client address; `None` when nothing usable is present.
    ///
    /// The first header in [`FORWARDING_HEADERS`] holding a non-empty value wins,
    /// and its value is passed through as-is.
    #[must_use]
    pub fn client_ip(&self) -> Option<String> {
        FORWARDING_HEADERS
            .iter()
            .filter_map(|name| self.headers.get(*name))
            .filter_map(|value| value.to_str().ok())
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_owned)
            .or_else(|| self.remote_addr.map(|addr| addr.to_string()))
    }
}
