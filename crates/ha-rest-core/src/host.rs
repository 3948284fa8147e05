//! Server host validation

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::InputError;

/// The only hostname accepted besides an IPv4 literal
pub const HOMEASSISTANT_LOCAL: &str = "homeassistant.local";

/// Default Home Assistant HTTP port
pub const DEFAULT_PORT: u16 = 8123;

/// Address of a Home Assistant server
///
/// Either a dotted IPv4 literal or the mDNS name `homeassistant.local`
/// (matched case-insensitively, stored lowercase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Host {
    Ipv4(Ipv4Addr),
    HomeAssistantLocal,
}

impl Host {
    /// Build the REST API base URL for this host, always ending in `/api/`
    pub fn base_url(&self, port: u16) -> String {
        format!("http://{}:{}/api/", self, port)
    }
}

impl FromStr for Host {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(HOMEASSISTANT_LOCAL) {
            return Ok(Host::HomeAssistantLocal);
        }
        s.parse::<Ipv4Addr>()
            .map(Host::Ipv4)
            .map_err(|_| InputError::InvalidHost {
                host: s.to_string(),
            })
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Ipv4(addr) => write!(f, "{}", addr),
            Host::HomeAssistantLocal => f.write_str(HOMEASSISTANT_LOCAL),
        }
    }
}
