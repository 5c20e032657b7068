//! Raw TCP probe construction for scanners.
//!
//! Builds TCP headers with arbitrary, possibly nonsensical, field values and
//! marshals them to network byte order for a raw socket. Opening sockets,
//! computing checksums and building the IP layer are left to the caller.
//!
//! ```rust
//! use rawprobe::{flags, TcpHeader};
//!
//! let mut header = TcpHeader::new_default();
//! header.configure(80, flags::FIN | flags::PSH | flags::URG, 0xffff, Vec::new());
//! let wire = header.marshal();
//! assert_eq!(wire.len(), 20 + header.payload.len());
//! ```

pub mod error;
pub mod hextools;
pub mod net;

pub use error::{Error, Result};
pub use net::endpoint::{MacAddress, NetworkEndpoint, ProbeAddr, ADDRESS_FAMILY};
pub use net::scan::ScanKind;
pub use net::tcp::{flags, TcpHeader};
