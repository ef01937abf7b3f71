//! Endpoint pair keys

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Unordered pair of transport endpoints, the unit of flow correlation state.
///
/// `EndpointPair::new(a, b) == EndpointPair::new(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointPair {
    low: SocketAddr,
    high: SocketAddr,
}

impl EndpointPair {
    pub fn new(a: SocketAddr, b: SocketAddr) -> Self {
        if a <= b { Self { low: a, high: b } } else { Self { low: b, high: a } }
    }

    pub fn endpoints(&self) -> (SocketAddr, SocketAddr) {
        (self.low, self.high)
    }

    pub fn contains(&self, endpoint: SocketAddr) -> bool {
        self.low == endpoint || self.high == endpoint
    }
}

impl fmt::Display for EndpointPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.low, self.high)
    }
}

/// Ordered (client, server) host addresses, ports ignored.
///
/// Conversations between the same two hosts are linked through this key even when the
/// client picks a fresh source port for every exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostPair {
    pub client: IpAddr,
    pub server: IpAddr,
}

impl HostPair {
    pub fn new(client: IpAddr, server: IpAddr) -> Self {
        Self { client, server }
    }
}

impl fmt::Display for HostPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.client, self.server)
    }
}
