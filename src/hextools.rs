use std::{
    fs::File,
    io::{self, Write},
    path::Path,
};

use crate::error::{Error, Result};

/// Formats bytes as a classic offset / hex / ASCII dump, 16 bytes per line.
pub fn format_hexdump(data: &[u8]) -> String {
    let mut result = String::new();

    for (i, chunk) in data.chunks(16).enumerate() {
        // Offset column
        result.push_str(&format!("0x{:04x}:  ", i * 16));

        for (j, byte) in chunk.iter().enumerate() {
            result.push_str(&format!("{:02x}", byte));

            // Space after every byte, and an extra one after 8 bytes
            if j < chunk.len() - 1 {
                result.push(' ');
                if j == 7 {
                    result.push(' ');
                }
            }
        }

        // Pad short lines so the ASCII column lines up
        if chunk.len() < 16 {
            let padding = (16 - chunk.len()) * 3 + if chunk.len() <= 8 { 1 } else { 0 };
            result.push_str(&" ".repeat(padding));
        }

        result.push_str("  ");
        for &byte in chunk {
            if byte.is_ascii_graphic() {
                result.push(byte as char);
            } else {
                result.push('.');
            }
        }

        result.push('\n');
    }

    result
}

/// Parses a hex byte string such as `"02 04 05 b4"`, `"0x020405b4"` or
/// `"02:04:05:b4"` into raw bytes. An empty string yields no bytes.
pub fn parse_hex_bytes(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let digits: Vec<char> = body
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-' && *c != ',')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(Error::invalid_hex(input, "odd number of hex digits"));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let hi = pair[0].to_digit(16);
            let lo = pair[1].to_digit(16);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok(((hi << 4) | lo) as u8),
                _ => Err(Error::InvalidHex {
                    input: input.to_string(),
                    reason: format!("'{}{}' is not a hex byte", pair[0], pair[1]),
                }),
            }
        })
        .collect()
}

/// Writes the raw bytes to `path`, creating or truncating the file.
pub fn dump_hex_file(path: &Path, buffer: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(buffer)?;
    tracing::info!("{} bytes dumped to {}", buffer.len(), path.display());
    Ok(())
}
