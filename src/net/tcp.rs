use std::time::{SystemTime, UNIX_EPOCH};

use rand::{rngs::SmallRng, Rng, SeedableRng};
use tracing::{debug, trace, warn};

use super::scan::ScanKind;
use crate::hextools::format_hexdump;

/// Length of the fixed part of a TCP header, in bytes
pub const TCP_MIN_HEADER_LEN: usize = 20;

/// Largest header length the 4-bit data offset can describe, in bytes
pub const TCP_MAX_HEADER_LEN: usize = 60;

/// Default data offset: five 32-bit words, reserved nibble zero
pub const DEFAULT_OFFSET_AND_RESERVED: u8 = 0x50;

/// End of option list
pub const OPTION_END: u8 = 0x00;

/// Placeholder payload carried by a fresh header: "PRB" plus a NUL
pub const DEFAULT_PAYLOAD: [u8; 4] = *b"PRB\0";

/// TCP control flags as raw bits.
///
/// Any combination, including none or all of them, is a valid value for
/// [`TcpHeader::flags`].
pub mod flags {
    use crate::error::{Error, Result};

    /// Congestion Window Reduced
    pub const CWR: u8 = 0b1000_0000;
    /// ECN-Echo
    pub const ECE: u8 = 0b0100_0000;
    pub const URG: u8 = 0b0010_0000;
    pub const ACK: u8 = 0b0001_0000;
    pub const PSH: u8 = 0b0000_1000;
    pub const RST: u8 = 0b0000_0100;
    pub const SYN: u8 = 0b0000_0010;
    pub const FIN: u8 = 0b0000_0001;

    const NAMES: [(u8, &str); 8] = [
        (CWR, "CWR"),
        (ECE, "ECE"),
        (URG, "URG"),
        (ACK, "ACK"),
        (PSH, "PSH"),
        (RST, "RST"),
        (SYN, "SYN"),
        (FIN, "FIN"),
    ];

    /// Renders a flag byte as `"SYN|ACK"`, most significant bit first.
    /// Returns `"none"` when no bit is set.
    pub fn describe(value: u8) -> String {
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(bit, _)| value & bit != 0)
            .map(|(_, name)| *name)
            .collect();

        if set.is_empty() {
            "none".to_string()
        } else {
            set.join("|")
        }
    }

    /// Parses a flag byte from `"0x29"`, `"41"`, `"none"` or names joined
    /// by `|`, `,` or `+` such as `"fin|psh|urg"`.
    pub fn parse(input: &str) -> Result<u8> {
        let trimmed = input.trim();
        let invalid = || Error::InvalidFlags(input.to_string());

        if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            return u8::from_str_radix(hex, 16).map_err(|_| invalid());
        }
        if trimmed.chars().all(|c| c.is_ascii_digit()) && !trimmed.is_empty() {
            return trimmed.parse::<u8>().map_err(|_| invalid());
        }
        if trimmed.eq_ignore_ascii_case("none") {
            return Ok(0);
        }

        trimmed
            .split(['|', ',', '+'])
            .map(|name| {
                NAMES
                    .iter()
                    .find(|(_, known)| known.eq_ignore_ascii_case(name.trim()))
                    .map(|(bit, _)| *bit)
                    .ok_or_else(invalid)
            })
            .try_fold(0u8, |acc, bit| bit.map(|bit| acc | bit))
    }
}

/// A TCP segment header, kept as raw wire-width fields.
///
/// Nothing here is validated. Zero ports, zero flags, impossible flag
/// combinations, non-zero reserved bits and a data offset that disagrees
/// with `options` are all representable and marshal as-is. Callers who want
/// a well-formed header are responsible for:
///
/// - setting `destination_port` (0 means "unset"),
/// - setting `flags` (0 means "not configured for a scan"),
/// - keeping the data offset in line with `options`, e.g. through
///   [`TcpHeader::sync_data_offset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpHeader {
    /// Source port (16 bits), 0 lets the OS pick an ephemeral port
    pub source_port: u16,
    /// Destination port (16 bits)
    pub destination_port: u16,
    /// Sequence number (32 bits)
    pub sequence_number: u32,
    /// Acknowledgment number (32 bits)
    pub ack_number: u32,
    /// Data offset (high nibble, 32-bit words) and reserved bits (low nibble)
    pub offset_and_reserved: u8,
    /// Control flags, see [`flags`]
    pub flags: u8,
    /// Window size (16 bits)
    pub window: u16,
    /// Checksum (16 bits), 0 leaves it to the OS
    pub checksum: u16,
    /// Urgent pointer (16 bits)
    pub urgent_pointer: u16,
    /// Raw option bytes, written as-is with no padding
    pub options: Vec<u8>,
    /// Data following the header
    pub payload: Vec<u8>,
}

impl Default for TcpHeader {
    fn default() -> Self {
        TcpHeader::new_default()
    }
}

impl TcpHeader {
    /// Creates a header with scanning defaults: ports and flags unset, a
    /// time-seeded random sequence number, a 20 byte data offset, a full
    /// window, a lone end-of-options byte and a 4 byte placeholder payload.
    pub fn new_default() -> Self {
        TcpHeader {
            source_port: 0,
            destination_port: 0,
            sequence_number: time_seeded_sequence(),
            ack_number: 0,
            offset_and_reserved: DEFAULT_OFFSET_AND_RESERVED,
            flags: 0,
            window: 0xffff,
            checksum: 0,
            urgent_pointer: 0,
            options: vec![OPTION_END],
            payload: DEFAULT_PAYLOAD.to_vec(),
        }
    }

    /// Builds a bare probe for `kind` aimed at `destination_port`.
    ///
    /// Options are left empty so the default data offset still matches.
    pub fn probe(kind: ScanKind, destination_port: u16) -> Self {
        let mut header = TcpHeader::new_default();
        header.configure(destination_port, kind.flags(), 0xffff, Vec::new());
        header
    }

    /// Overwrites destination port, flags, window and options.
    ///
    /// The data offset is left alone even when `options` changes length.
    /// A mismatch is reported through `tracing` and otherwise kept.
    pub fn configure(&mut self, destination_port: u16, flags: u8, window: u16, options: Vec<u8>) {
        self.destination_port = destination_port;
        self.flags = flags;
        self.window = window;
        self.options = options;

        debug!(
            "configured tcp header: dport={} flags={} window=0x{:04x} options={}B",
            self.destination_port,
            flags::describe(self.flags),
            self.window,
            self.options.len()
        );

        if !self.is_offset_consistent() {
            warn!(
                "tcp data offset declares {} header bytes but {} would be marshaled",
                self.header_len(),
                TCP_MIN_HEADER_LEN + self.options.len()
            );
        }
    }

    /// Data offset in 32-bit words, the high nibble of `offset_and_reserved`
    pub fn data_offset_words(&self) -> u8 {
        self.offset_and_reserved >> 4
    }

    /// Reserved bits, the low nibble of `offset_and_reserved`
    pub fn reserved(&self) -> u8 {
        self.offset_and_reserved & 0x0f
    }

    /// Header length in bytes as declared by the data offset
    pub fn header_len(&self) -> usize {
        self.data_offset_words() as usize * 4
    }

    /// True when the declared header length covers exactly the fixed
    /// fields plus `options`.
    pub fn is_offset_consistent(&self) -> bool {
        self.header_len() == TCP_MIN_HEADER_LEN + self.options.len()
    }

    /// Recomputes the data offset from the current options length, rounding
    /// up to whole words and capping at 15. Reserved bits are preserved.
    /// Options are not padded, so unaligned options stay inconsistent.
    pub fn sync_data_offset(&mut self) {
        let words = (TCP_MIN_HEADER_LEN + self.options.len()).div_ceil(4).min(15) as u8;
        self.offset_and_reserved = (words << 4) | self.reserved();
    }

    pub fn set_flags(&mut self, flags: u8) {
        self.flags = flags;
    }

    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag == flag
    }

    /// Returns the header with `flag` OR-ed into its flag byte
    pub fn with_flag(mut self, flag: u8) -> Self {
        self.flags |= flag;
        self
    }

    /// Number of bytes [`TcpHeader::marshal`] produces
    pub fn wire_len(&self) -> usize {
        TCP_MIN_HEADER_LEN + self.options.len() + self.payload.len()
    }

    /// Serializes the header in network byte order: the 20 fixed bytes,
    /// then `options`, then `payload`. The checksum is written as stored.
    pub fn marshal(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.wire_len());

        buffer.extend_from_slice(&self.source_port.to_be_bytes());
        buffer.extend_from_slice(&self.destination_port.to_be_bytes());
        buffer.extend_from_slice(&self.sequence_number.to_be_bytes());
        buffer.extend_from_slice(&self.ack_number.to_be_bytes());
        buffer.push(self.offset_and_reserved);
        buffer.push(self.flags);
        buffer.extend_from_slice(&self.window.to_be_bytes());
        buffer.extend_from_slice(&self.checksum.to_be_bytes());
        buffer.extend_from_slice(&self.urgent_pointer.to_be_bytes());
        buffer.extend_from_slice(&self.options);
        buffer.extend_from_slice(&self.payload);

        trace!("marshaled tcp header:\n{}", format_hexdump(&buffer));

        buffer
    }
}

// Not cryptographically secure. Headers built within the same clock tick
// may share a sequence number.
fn time_seeded_sequence() -> u32 {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0);
    SmallRng::seed_from_u64(seed).gen()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYN_OPTIONS: [u8; 12] = [
        0x02, 0x04, 0x05, 0xb4, // MSS 1460
        0x01, // NOP
        0x03, 0x03, 0x08, // window scale 8
        0x01, 0x01, // NOP NOP
        0x04, 0x02, // SACK permitted
    ];

    fn counting_header() -> TcpHeader {
        TcpHeader {
            source_port: 0x0001,
            destination_port: 0x0203,
            sequence_number: 0x04050607,
            ack_number: 0x08090a0b,
            offset_and_reserved: 0x0c,
            flags: 0x0d,
            window: 0x0e0f,
            checksum: 0x1011,
            urgent_pointer: 0x1213,
            options: vec![0x14, 0x15],
            payload: vec![0x16, 0x17],
        }
    }

    #[test]
    fn test_marshal_field_order() {
        let expected: Vec<u8> = (0x00..=0x17).collect();
        let packed = counting_header().marshal();

        println!("packed: {:02x?}", packed);
        assert_eq!(packed.len(), 24);
        assert_eq!(packed, expected, "fields out of place on the wire");
    }

    #[test]
    fn test_marshal_is_deterministic() {
        let header = TcpHeader::probe(ScanKind::Xmas, 8080);
        assert_eq!(header.marshal(), header.marshal());
        assert_eq!(header.clone().marshal(), header.marshal());
    }

    #[test]
    fn test_marshal_length_tracks_options_and_payload() {
        let mut header = TcpHeader::new_default();
        assert_eq!(header.marshal().len(), 20 + 1 + 4);

        header.configure(22, flags::SYN, 1024, SYN_OPTIONS.to_vec());
        assert_eq!(header.marshal().len(), 20 + 12 + 4);
        assert_eq!(header.wire_len(), header.marshal().len());

        header.options.clear();
        header.payload.clear();
        assert_eq!(header.marshal().len(), TCP_MIN_HEADER_LEN);

        header.payload = vec![0xaa; 1500];
        assert_eq!(header.marshal().len(), 20 + 1500);
    }

    #[test]
    fn test_marshal_keeps_checksum_and_offset_verbatim() {
        let mut header = TcpHeader::new_default();
        header.checksum = 0xbeef;
        header.offset_and_reserved = 0xff;
        header.options = vec![0x01, 0x02, 0x03];

        let packed = header.marshal();
        assert_eq!(packed[12], 0xff);
        assert_eq!(&packed[16..18], &[0xbe, 0xef]);
        // no padding after the three option bytes
        assert_eq!(&packed[20..23], &[0x01, 0x02, 0x03]);
        assert_eq!(&packed[23..], &DEFAULT_PAYLOAD);
    }

    #[test]
    fn test_new_default_values() {
        let header = TcpHeader::new_default();

        assert_eq!(header.source_port, 0);
        assert_eq!(header.destination_port, 0);
        assert_eq!(header.ack_number, 0);
        assert_eq!(header.offset_and_reserved, 0x50);
        assert_eq!(header.data_offset_words(), 5);
        assert_eq!(header.header_len(), 20);
        assert_eq!(header.flags, 0);
        assert_eq!(header.window, 0xffff);
        assert_eq!(header.checksum, 0);
        assert_eq!(header.urgent_pointer, 0);
        assert_eq!(header.options, vec![OPTION_END]);
        assert_eq!(header.payload, b"PRB\0".to_vec());
    }

    #[test]
    fn test_configure_syn_probe() {
        let mut header = TcpHeader::new_default();
        let sequence = header.sequence_number;

        header.configure(80, flags::SYN, 0xfaf0, SYN_OPTIONS.to_vec());

        assert_eq!(header.destination_port, 80);
        assert_eq!(header.flags, 2);
        assert_eq!(header.window, 0xfaf0);
        assert_eq!(header.options, SYN_OPTIONS.to_vec());
        // untouched by configure
        assert_eq!(header.sequence_number, sequence);
        assert_eq!(header.offset_and_reserved, 0x50);
        assert!(!header.is_offset_consistent());
    }

    #[test]
    fn test_configure_twice_is_idempotent() {
        let mut header = TcpHeader::new_default();
        header.configure(443, flags::FIN | flags::PSH | flags::URG, 0x1000, vec![0x01, 0x00]);
        let first = header.clone();
        header.configure(443, flags::FIN | flags::PSH | flags::URG, 0x1000, vec![0x01, 0x00]);

        assert_eq!(header, first);
    }

    #[test]
    fn test_configure_accepts_any_flags_and_empty_options() {
        let mut header = TcpHeader::new_default();

        header.configure(1, 0xff, 0, Vec::new());
        assert_eq!(header.flags, 0xff);
        assert!(header.options.is_empty());
        assert!(header.is_offset_consistent());

        header.configure(0, 0, 0, Vec::new());
        assert_eq!(header.flags, 0);
        assert_eq!(header.destination_port, 0);
    }

    #[test]
    fn test_sync_data_offset() {
        let mut header = TcpHeader::new_default();
        header.offset_and_reserved = 0x53;
        header.configure(80, flags::SYN, 0xfaf0, SYN_OPTIONS.to_vec());

        header.sync_data_offset();
        assert_eq!(header.data_offset_words(), 8);
        assert_eq!(header.reserved(), 0x3);
        assert!(header.is_offset_consistent());

        // rounds up, stays inconsistent because options are never padded
        header.options = vec![0x01; 3];
        header.sync_data_offset();
        assert_eq!(header.data_offset_words(), 6);
        assert!(!header.is_offset_consistent());

        header.options = vec![0x01; 100];
        header.sync_data_offset();
        assert_eq!(header.data_offset_words(), 15);
        assert_eq!(header.header_len(), TCP_MAX_HEADER_LEN);
    }

    #[test]
    fn test_flag_helpers() {
        let header = TcpHeader::new_default()
            .with_flag(flags::SYN)
            .with_flag(flags::ACK);

        assert_eq!(header.flags, 0x12);
        assert!(header.has_flag(flags::SYN));
        assert!(header.has_flag(flags::SYN | flags::ACK));
        assert!(!header.has_flag(flags::RST));

        let mut header = header;
        header.set_flags(0);
        assert!(!header.has_flag(flags::SYN));
    }

    #[test]
    fn test_describe_flags() {
        assert_eq!(flags::describe(0), "none");
        assert_eq!(flags::describe(flags::SYN), "SYN");
        assert_eq!(flags::describe(0x12), "ACK|SYN");
        assert_eq!(
            flags::describe(0xff),
            "CWR|ECE|URG|ACK|PSH|RST|SYN|FIN"
        );
    }

    #[test]
    fn test_parse_flags() {
        assert_eq!(flags::parse("0x29"), Ok(0x29));
        assert_eq!(flags::parse("41"), Ok(41));
        assert_eq!(flags::parse("none"), Ok(0));
        assert_eq!(flags::parse("syn"), Ok(flags::SYN));
        assert_eq!(flags::parse("FIN|psh|Urg"), Ok(0x29));
        assert_eq!(flags::parse("syn, ack"), Ok(0x12));
        assert_eq!(flags::parse("syn+syn"), Ok(flags::SYN));

        for bad in ["", "256", "0x100", "syn|bogus"] {
            assert_eq!(
                flags::parse(bad),
                Err(crate::error::Error::InvalidFlags(bad.to_string()))
            );
        }
    }

    #[test]
    fn test_probe_is_well_formed() {
        let header = TcpHeader::probe(ScanKind::Syn, 22);

        assert_eq!(header.destination_port, 22);
        assert_eq!(header.flags, flags::SYN);
        assert!(header.options.is_empty());
        assert!(header.is_offset_consistent());
    }

    #[test]
    fn test_marshal_parses_with_pnet() {
        use pnet_packet::tcp::TcpPacket;
        use pnet_packet::Packet;

        let mut header = TcpHeader::new_default();
        header.source_port = 40000;
        header.configure(
            443,
            flags::SYN | flags::ECE | flags::CWR,
            0xfaf0,
            vec![0x02, 0x04, 0x05, 0xb4],
        );
        header.sync_data_offset();
        header.payload = b"abc".to_vec();

        let packed = header.marshal();
        let packet = TcpPacket::new(&packed).expect("buffer holds a full header");

        assert_eq!(packet.get_source(), 40000);
        assert_eq!(packet.get_destination(), 443);
        assert_eq!(packet.get_sequence(), header.sequence_number);
        assert_eq!(packet.get_acknowledgement(), 0);
        assert_eq!(packet.get_data_offset(), 6);
        assert_eq!(u16::from(packet.get_flags()), 0xc2);
        assert_eq!(packet.get_window(), 0xfaf0);
        assert_eq!(packet.get_checksum(), 0);
        assert_eq!(packet.get_urgent_ptr(), 0);
        assert_eq!(packet.payload(), b"abc");
    }
}
