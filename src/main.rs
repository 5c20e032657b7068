use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rawprobe::hextools::{dump_hex_file, format_hexdump, parse_hex_bytes};
use rawprobe::net::tcp::OPTION_END;
use rawprobe::{flags, NetworkEndpoint, ScanKind, TcpHeader};

const DEFAULT_PORT: u16 = 80;

/// Crafts a raw TCP probe header and prints the wire bytes. Nothing is sent.
#[derive(Parser, Debug)]
#[command(name = "rawprobe", version, about = "Craft raw TCP probe headers")]
struct Args {
    /// Target host name or IP address
    target: String,

    /// Resolved IP address, for targets given by name
    #[arg(long)]
    ip: Option<IpAddr>,

    /// Destination port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Scan technique: syn, null, fin, xmas, ack, window, maimon
    #[arg(short, long, conflicts_with = "flags")]
    scan: Option<ScanKind>,

    /// Raw flag byte, e.g. 0x29, 41 or fin|psh|urg
    #[arg(short, long, value_parser = flags::parse)]
    flags: Option<u8>,

    /// Window size
    #[arg(short, long, value_parser = parse_u16, default_value = "0xffff")]
    window: u16,

    /// Option bytes in hex, e.g. "02 04 05 b4". Defaults to one end-of-options byte
    #[arg(short, long)]
    options: Option<String>,

    /// Payload bytes in hex, replacing the placeholder payload
    #[arg(long)]
    payload: Option<String>,

    /// Source port, 0 lets the OS choose
    #[arg(long, default_value_t = 0)]
    source_port: u16,

    /// Recompute the data offset from the options length
    #[arg(long)]
    sync_offset: bool,

    /// Write the raw marshaled bytes to this file
    #[arg(short = 'O', long)]
    out: Option<PathBuf>,

    /// Verbose output (-v, -vv, -vvv), ignored when RUST_LOG is set
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_u16(input: &str) -> std::result::Result<u16, String> {
    let trimmed = input.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => trimmed.parse::<u16>(),
    };
    parsed.map_err(|e| format!("'{input}' is not a 16-bit value: {e}"))
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut target = NetworkEndpoint::new(&args.target).with_port(args.port);
    if let Some(ip) = args.ip {
        target = target.with_ip(ip);
    }
    if target.ip.is_unspecified() && !target.hostname.is_empty() {
        warn!(
            "{} is not resolved, pass --ip to set the address the probe is meant for",
            target.hostname
        );
    }
    info!("target: {} ({})", target, target.address);

    let probe_flags = match (args.flags, args.scan) {
        (Some(raw), _) => raw,
        (None, Some(kind)) => kind.flags(),
        (None, None) => ScanKind::Syn.flags(),
    };

    let options = match &args.options {
        Some(hex) => parse_hex_bytes(hex).context("parsing --options")?,
        None => vec![OPTION_END],
    };

    let mut header = TcpHeader::new_default();
    header.source_port = args.source_port;
    header.configure(args.port, probe_flags, args.window, options);
    if let Some(hex) = &args.payload {
        header.payload = parse_hex_bytes(hex).context("parsing --payload")?;
    }
    if args.sync_offset {
        header.sync_data_offset();
    }
    if header.flags == 0 {
        info!("probe carries no flags (null scan)");
    }

    let wire = header.marshal();

    println!(
        "{} {} -> {} [{}] seq=0x{:08x} {} bytes",
        target.network(),
        args.source_port,
        target.address_string(),
        flags::describe(header.flags),
        header.sequence_number,
        wire.len()
    );
    print!("{}", format_hexdump(&wire));

    if let Some(path) = &args.out {
        dump_hex_file(path, &wire)
            .with_context(|| format!("writing probe to {}", path.display()))?;
    }

    Ok(())
}
