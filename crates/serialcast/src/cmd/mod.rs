use clap::{Args, Subcommand};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod bridge;
pub mod ports;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read frames from a serial device and publish them to a multicast group.
    Bridge(BridgeArgs),
    /// List serial ports detected on this host.
    Ports(PortsArgs),
    /// Print the version.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Bridge(args) => bridge::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct BridgeArgs {
    /// Serial device path. Default: platform-specific (e.g. /dev/ttyACM0).
    #[arg(long, short = 'd', env = "SERIALCAST_DEVICE")]
    pub device: Option<PathBuf>,
    /// Serial baud rate.
    #[arg(long, default_value_t = serialcast_transport::DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Multicast group to publish to (ip:port).
    #[arg(long, short = 'g', env = "SERIALCAST_GROUP", default_value = serialcast_transport::DEFAULT_GROUP)]
    pub group: String,
    /// IPv4 multicast TTL.
    #[arg(long, default_value_t = serialcast_transport::DEFAULT_TTL)]
    pub ttl: u32,
    /// Local IPv4 address to send from.
    #[arg(long, value_name = "IP")]
    pub interface: Option<Ipv4Addr>,
    /// Do not deliver published frames to listeners on this host.
    #[arg(long)]
    pub no_loopback: bool,
    /// Frames buffered between reader and publisher.
    #[arg(long, default_value_t = serialcast_pipeline::DEFAULT_CAPACITY)]
    pub capacity: usize,
    /// Largest accepted record, in bytes.
    #[arg(long, default_value_t = serialcast_frame::DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
    /// Serial read timeout (e.g. 500ms, 1s). Bounds how long shutdown waits on the device.
    #[arg(long, default_value = "500ms")]
    pub read_timeout: String,
    /// Pause after a failed read before retrying (e.g. 100ms).
    #[arg(long, default_value = "100ms")]
    pub retry_delay: String,
    /// Publish the first record instead of discarding it.
    #[arg(long)]
    pub keep_first_frame: bool,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Include build target and compiled-in defaults.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `250ms`, `2s`, `1m`, or bare seconds (`3`).
pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let text = input.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);

    let amount: u64 = digits
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("bad duration {input:?}: expected e.g. 500ms")))?;
    let duration = match unit {
        "ms" => Duration::from_millis(amount),
        "" | "s" => Duration::from_secs(amount),
        "m" => Duration::from_secs(amount.saturating_mul(60)),
        other => {
            return Err(CliError::new(
                USAGE,
                format!("bad duration {input:?}: unknown unit {other:?}"),
            ))
        }
    };

    if duration.is_zero() {
        return Err(CliError::new(USAGE, format!("bad duration {input:?}: must be non-zero")));
    }
    Ok(duration)
}
