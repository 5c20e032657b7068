//! Description of things on the network: targets, sources, bystanders

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use socket2::SockAddr;

use crate::error::Error;

/// Network identifier handed to raw-socket senders: IPv4, protocol TCP
pub const ADDRESS_FAMILY: &str = "ip4:tcp";

/// Address shape expected by a raw "send to" call
pub trait ProbeAddr {
    /// Name of the network, e.g. `"ip4:tcp"`
    fn network(&self) -> &'static str;
    /// Textual address in `ip:port` form
    fn address_string(&self) -> String;
}

/// MAC address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub const BROADCAST: MacAddress = MacAddress([0xFF; 6]);

    pub const ZERO: MacAddress = MacAddress([0x00; 6]);

    pub fn new(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    /// Accepts six hex octets separated by `:` or `-`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let octets: Vec<&str> = s.split([':', '-']).collect();
        if octets.len() != 6 {
            return Err(Error::InvalidMac(s.to_string()));
        }

        let mut bytes = [0u8; 6];
        for (slot, octet) in bytes.iter_mut().zip(octets) {
            if octet.is_empty() || octet.len() > 2 {
                return Err(Error::InvalidMac(s.to_string()));
            }
            *slot = u8::from_str_radix(octet, 16).map_err(|_| Error::InvalidMac(s.to_string()))?;
        }

        Ok(MacAddress(bytes))
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }
}

/// Anything with an address on the net.
///
/// `hostname` and `domain` are independent of each other and of `ip`.
/// Resolving one into the other is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEndpoint {
    /// Unevaluated name or literal IP, as the user gave it
    pub address: String,
    /// Hostname in "www.example.com" form
    pub hostname: String,
    /// Domain in "example.com" form
    pub domain: String,
    /// Resolved IP address
    pub ip: IpAddr,
    pub mask: Option<IpAddr>,
    /// TCP port
    pub port: u16,
    /// Link-layer address, only known on the local segment
    pub mac: Option<MacAddress>,
}

impl Default for NetworkEndpoint {
    fn default() -> Self {
        NetworkEndpoint {
            address: String::new(),
            hostname: String::new(),
            domain: String::new(),
            ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            mask: None,
            port: 0,
            mac: None,
        }
    }
}

impl NetworkEndpoint {
    /// Describes an endpoint from the address the user typed. A literal IP
    /// fills in `ip`; anything else is kept as the hostname.
    pub fn new(address: &str) -> Self {
        let address = address.trim();
        match address.parse::<IpAddr>() {
            Ok(ip) => NetworkEndpoint {
                address: address.to_string(),
                ip,
                ..Default::default()
            },
            Err(_) => NetworkEndpoint {
                address: address.to_string(),
                hostname: address.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = ip;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_hostname(mut self, hostname: &str) -> Self {
        self.hostname = hostname.to_string();
        self
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = domain.to_string();
        self
    }

    pub fn with_mask(mut self, mask: IpAddr) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_mac(mut self, mac: MacAddress) -> Self {
        self.mac = Some(mac);
        self
    }

    pub fn network(&self) -> &'static str {
        ADDRESS_FAMILY
    }

    /// `ip:port`, e.g. `"192.0.2.7:80"`
    pub fn address_string(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Last dot-separated label of the hostname, "com" for "a.b.com".
    /// Empty when there is no hostname. Not checked against any TLD list.
    pub fn top_level_domain(&self) -> &str {
        if self.hostname.is_empty() {
            return "";
        }
        self.hostname.rsplit('.').next().unwrap_or("")
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl ProbeAddr for NetworkEndpoint {
    fn network(&self) -> &'static str {
        NetworkEndpoint::network(self)
    }

    fn address_string(&self) -> String {
        NetworkEndpoint::address_string(self)
    }
}

impl fmt::Display for NetworkEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl From<SocketAddr> for NetworkEndpoint {
    fn from(addr: SocketAddr) -> Self {
        NetworkEndpoint {
            address: addr.ip().to_string(),
            ip: addr.ip(),
            port: addr.port(),
            ..Default::default()
        }
    }
}

impl From<&NetworkEndpoint> for SocketAddr {
    fn from(endpoint: &NetworkEndpoint) -> Self {
        endpoint.socket_addr()
    }
}

impl From<&NetworkEndpoint> for SockAddr {
    fn from(endpoint: &NetworkEndpoint) -> Self {
        SockAddr::from(endpoint.socket_addr())
    }
}
