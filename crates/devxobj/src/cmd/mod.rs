use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use devxobj_object::{ChannelConfig, EmulatedFirmware, MemoryRegion};
use devxobj_transport::{CommandTransport, MailboxClient, MailboxConfig};

use crate::exit::{io_error, transport_error, CliError, CliResult, DATA_INVALID, USAGE};
use crate::output::OutputFormat;

pub mod classify;
pub mod encode;
pub mod exercise;
pub mod probe;
pub mod protocol_modes;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a CREATE, QUERY or DESTROY command buffer.
    Encode(EncodeArgs),
    /// Classify a firmware syndrome code.
    Classify(ClassifyArgs),
    /// Host emulated firmware on a Unix socket.
    Serve(ServeArgs),
    /// Create, query, compare and destroy one channel object.
    Exercise(ExerciseArgs),
    /// Run the protocol-mode gate matrix (modes 0, 1, 2, 255).
    ProtocolModes(ProtocolModesArgs),
    /// Check whether firmware supports channel objects.
    Probe(ProbeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Classify(args) => classify::run(args, format),
        Command::Serve(args) => serve::run(args, format),
        Command::Exercise(args) => exercise::run(args, format),
        Command::ProtocolModes(args) => protocol_modes::run(args, format),
        Command::Probe(args) => probe::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Channel configuration, from flags or a JSON file.
#[derive(Args, Debug, Clone)]
pub struct ChannelArgs {
    /// JSON file holding a channel configuration; replaces the field flags.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Queue protocol mode.
    #[arg(long, default_value = "0", value_parser = parse_number::<u8>)]
    pub protocol_mode: u8,
    /// Queue size in bytes.
    #[arg(long, default_value = "4096", value_parser = parse_number::<u32>)]
    pub queue_size: u32,
    /// Queue address (decimal or 0x-prefixed hex).
    #[arg(long, default_value = "0x1000", value_parser = parse_number::<u64>)]
    pub queue_address: u64,
    /// Memory key of the registered region holding the queue.
    #[arg(long, default_value = "0x55", value_parser = parse_number::<u32>)]
    pub mkey: u32,
    /// Channel stride index.
    #[arg(long, default_value = "1", value_parser = parse_number::<u16>)]
    pub stride_index: u16,
}

impl ChannelArgs {
    pub fn load(&self) -> CliResult<ChannelConfig> {
        let Some(path) = &self.config else {
            return Ok(ChannelConfig {
                protocol_mode: self.protocol_mode,
                queue_size: self.queue_size,
                queue_address: self.queue_address,
                memory_key: self.mkey,
                stride_index: self.stride_index,
            });
        };
        let text = std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("read {}", path.display()), err))?;
        serde_json::from_str(&text).map_err(|err| {
            CliError::new(
                DATA_INVALID,
                format!("invalid channel config {}: {err}", path.display()),
            )
        })
    }
}

/// Where commands are submitted.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Command endpoint socket path.
    #[arg(required_unless_present = "emulated")]
    pub socket: Option<PathBuf>,
    /// Submit to in-process emulated firmware instead of a socket.
    #[arg(long, conflicts_with = "socket")]
    pub emulated: bool,
    /// Socket read/write timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Size of the memory region backing the queue. Default: the queue size.
    #[arg(long, value_parser = parse_number::<u32>)]
    pub region_size: Option<u32>,
}

impl TargetArgs {
    pub fn open(&self) -> CliResult<Box<dyn CommandTransport>> {
        if self.emulated {
            return Ok(Box::new(EmulatedFirmware::new()));
        }
        let Some(path) = &self.socket else {
            return Err(CliError::new(USAGE, "socket path or --emulated required"));
        };
        let timeout = parse_timeout(&self.timeout)?;
        let config = MailboxConfig {
            read_timeout: Some(timeout),
            write_timeout: Some(timeout),
            ..MailboxConfig::default()
        };
        let client = MailboxClient::connect_with_config(path, config)
            .map_err(|err| transport_error("connect failed", err))?;
        Ok(Box::new(client))
    }

    /// Region descriptor starting at the queue address under the queue's key.
    pub fn region_for(&self, config: &ChannelConfig) -> MemoryRegion {
        MemoryRegion::new(
            config.queue_address,
            self.region_size.unwrap_or(config.queue_size),
            config.memory_key,
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Operation {
    Create,
    Query,
    Destroy,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Command to encode.
    #[arg(value_enum)]
    pub operation: Operation,
    /// Object id for QUERY and DESTROY.
    #[arg(long, default_value = "0", value_parser = parse_number::<u32>)]
    pub object_id: u32,
    #[command(flatten)]
    pub channel: ChannelArgs,
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Syndrome code (decimal or 0x-prefixed hex).
    #[arg(value_parser = parse_number::<u32>)]
    pub code: u32,
    /// Command status byte reported with the syndrome.
    #[arg(long, default_value = "0x03", value_parser = parse_number::<u8>)]
    pub status: u8,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Live objects before CREATE fails with a resource syndrome.
    #[arg(long, default_value = "64")]
    pub max_objects: usize,
    /// Register a translatable region as ADDR:SIZE:KEY. Repeatable; when any
    /// region is given, CREATE fails translation outside registered regions.
    #[arg(long = "region", value_name = "ADDR:SIZE:KEY", value_parser = parse_region)]
    pub regions: Vec<(u64, u32, u32)>,
}

#[derive(Args, Debug)]
pub struct ExerciseArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[command(flatten)]
    pub channel: ChannelArgs,
}

#[derive(Args, Debug)]
pub struct ProtocolModesArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[command(flatten)]
    pub channel: ChannelArgs,
    /// Reject unsupported modes locally instead of submitting them.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Address of the region used for the probe queue.
    #[arg(long, default_value = "0x1000", value_parser = parse_number::<u64>)]
    pub region_address: u64,
    /// Memory key of the probe region.
    #[arg(long, default_value = "0x55", value_parser = parse_number::<u32>)]
    pub mkey: u32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a decimal or `0x`-prefixed hexadecimal integer.
pub fn parse_number<T: TryFrom<u64>>(input: &str) -> Result<T, String> {
    let input = input.trim().replace('_', "");
    let value = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => input.parse::<u64>(),
    }
    .map_err(|err| format!("invalid number {input:?}: {err}"))?;
    T::try_from(value).map_err(|_| format!("{input} is out of range"))
}

fn parse_region(input: &str) -> Result<(u64, u32, u32), String> {
    let parts: Vec<&str> = input.split(':').collect();
    let [address, size, key] = parts.as_slice() else {
        return Err(format!("expected ADDR:SIZE:KEY, got {input:?}"));
    };
    Ok((
        parse_number(address)?,
        parse_number(size)?,
        parse_number(key)?,
    ))
}

pub fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_accept_hex_and_decimal() {
        assert_eq!(parse_number::<u32>("0xE1E101"), Ok(0xE1E101));
        assert_eq!(parse_number::<u32>("4096"), Ok(4096));
        assert_eq!(parse_number::<u64>("0x1_0000"), Ok(0x10000));
        assert!(parse_number::<u8>("256").is_err());
        assert!(parse_number::<u16>("0xzz").is_err());
    }

    #[test]
    fn region_triplets() {
        assert_eq!(
            parse_region("0x1000:4096:0x55"),
            Ok((0x1000, 4096, 0x55))
        );
        assert!(parse_region("0x1000:4096").is_err());
    }

    #[test]
    fn timeouts() {
        assert_eq!(parse_timeout("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_timeout("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_timeout("150ms").unwrap(), Duration::from_millis(150));
        assert!(parse_timeout("0s").is_err());
        assert!(parse_timeout("bad").is_err());
    }

    #[test]
    fn channel_flags_build_config() {
        let args = ChannelArgs {
            config: None,
            protocol_mode: 0,
            queue_size: 4096,
            queue_address: 0x1000,
            mkey: 0x55,
            stride_index: 1,
        };
        assert_eq!(
            args.load().unwrap(),
            ChannelConfig::new(0x1000, 4096, 0x55).with_stride_index(1)
        );
    }
}
