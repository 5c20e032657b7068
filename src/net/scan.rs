//! Scan techniques and the flag bytes their probes carry

use std::fmt;
use std::str::FromStr;

use super::tcp::flags::{ACK, FIN, PSH, SYN, URG};
use crate::error::Error;

/// Probe styles that differ only in which TCP flags are set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    /// Half-open scan
    Syn,
    /// No flags at all
    Null,
    Fin,
    /// FIN, PSH and URG lit up like a tree
    Xmas,
    /// Firewall rule mapping
    Ack,
    /// ACK probe, classified by the window of the RST reply
    Window,
    /// FIN+ACK
    Maimon,
}

impl ScanKind {
    pub const ALL: [ScanKind; 7] = [
        ScanKind::Syn,
        ScanKind::Null,
        ScanKind::Fin,
        ScanKind::Xmas,
        ScanKind::Ack,
        ScanKind::Window,
        ScanKind::Maimon,
    ];

    /// Flag byte for a probe of this kind
    pub fn flags(self) -> u8 {
        match self {
            ScanKind::Syn => SYN,
            ScanKind::Null => 0,
            ScanKind::Fin => FIN,
            ScanKind::Xmas => FIN | PSH | URG,
            ScanKind::Ack | ScanKind::Window => ACK,
            ScanKind::Maimon => FIN | ACK,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScanKind::Syn => "syn",
            ScanKind::Null => "null",
            ScanKind::Fin => "fin",
            ScanKind::Xmas => "xmas",
            ScanKind::Ack => "ack",
            ScanKind::Window => "window",
            ScanKind::Maimon => "maimon",
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ScanKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ScanKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| Error::UnknownScan(s.to_string()))
    }
}
