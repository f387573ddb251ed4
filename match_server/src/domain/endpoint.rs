// Strategy endpoint parsing (`host[:port]`).

use super::errors::StrategyError;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub addr: SocketAddr,
}

impl Endpoint {
    /// Parses `host[:port]`; a missing or zero port falls back to `default_port`.
    /// The host must be an IP address or `localhost`.
    pub fn parse(raw: &str, default_port: u16) -> Result<Self, StrategyError> {
        let raw = raw.trim();
        let invalid = || StrategyError::InvalidEndpoint(raw.to_string());

        let mut addr = if let Ok(addr) = raw.parse::<SocketAddr>() {
            addr
        } else if let Ok(ip) = raw.parse::<IpAddr>() {
            SocketAddr::new(ip, 0)
        } else {
            let (host, port) = match raw.rsplit_once(':') {
                Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
                None => (raw, 0),
            };
            if !host.eq_ignore_ascii_case("localhost") {
                return Err(invalid());
            }
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
        };

        if addr.port() == 0 {
            addr.set_port(default_port);
        }
        Ok(Self { addr })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.addr.fmt(f)
    }
}
