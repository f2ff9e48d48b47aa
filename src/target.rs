use crate::error::PingError;
use dns_lookup::lookup_host;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr};

/// A destination as typed by the user, plus the IPv4 address it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub addr: Ipv4Addr,
}

impl Target {
    /// Takes a literal IPv4 address as is; otherwise resolves `name` and keeps
    /// the first IPv4 result.
    pub fn resolve(name: &str) -> Result<Self, PingError> {
        let addr = match name.parse::<Ipv4Addr>() {
            Ok(addr) => addr,
            Err(_) => {
                let ips = lookup_host(name).map_err(|source| PingError::Resolve {
                    host: name.to_string(),
                    source,
                })?;
                first_ipv4(&ips).ok_or_else(|| PingError::UnknownHost(name.to_string()))?
            }
        };
        log::debug!("resolved {} to {}", name, addr);

        Ok(Target {
            name: name.to_string(),
            addr,
        })
    }
}

fn first_ipv4(ips: &[IpAddr]) -> Option<Ipv4Addr> {
    ips.iter().find_map(|ip| match ip {
        IpAddr::V4(v4) => Some(*v4),
        IpAddr::V6(_) => None,
    })
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.name, f)
    }
}
