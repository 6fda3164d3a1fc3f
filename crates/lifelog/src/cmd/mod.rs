use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use lifelog_frame::{CATEGORY_LIFELOG, LIFELOG_PAYLOAD_LEN, STEPS_OFFSET};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod frame;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a transfer against a simulated watch and print the decoded steps.
    Simulate(SimulateArgs),
    /// Decode a control frame given as hex text.
    Decode(DecodeArgs),
    /// Print the hex text of a start or end control frame.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Simulate(args) => simulate::run(args, format),
        Command::Decode(args) => frame::decode(args, format),
        Command::Encode(args) => frame::encode(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Step count the simulated watch reports.
    #[arg(long, default_value_t = 0)]
    pub steps: u32,
    /// Payload length announced and sent by the watch.
    #[arg(long, default_value_t = LIFELOG_PAYLOAD_LEN)]
    pub length: usize,
    /// Bytes per bulk-channel notification.
    #[arg(long, default_value_t = 20)]
    pub chunk_size: usize,
    /// Pause between bulk-channel notifications (e.g. 0ms, 5ms).
    #[arg(long, default_value = "0ms")]
    pub chunk_delay: String,
    /// Overall transfer timeout (e.g. 60s, 500ms).
    #[arg(long, default_value = "60s", env = "LIFELOG_TIMEOUT")]
    pub timeout: String,
    /// Byte offset of the step count within the payload.
    #[arg(long, default_value_t = STEPS_OFFSET)]
    pub steps_offset: usize,
    /// Do not send the watch's own end-of-transfer signal.
    #[arg(long)]
    pub no_device_end: bool,
    /// Fail immediately when the payload is too short for the step count.
    #[arg(long)]
    pub reject_short: bool,
    /// Connection identifier used for the simulated link.
    #[arg(long, default_value = "simulated-watch")]
    pub connection: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex text (spaced or compact, optional 0x prefix).
    pub hex: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FrameKind {
    Start,
    End,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Frame to encode.
    pub kind: FrameKind,
    /// Category byte (decimal or 0x-prefixed hex).
    #[arg(long, default_value_t = CATEGORY_LIFELOG, value_parser = parse_u8)]
    pub category: u8,
    /// Length field (24-bit).
    #[arg(long, default_value_t = 0)]
    pub length: u32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_u8(input: &str) -> Result<u8, String> {
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse::<u8>(),
    };
    parsed.map_err(|err| format!("invalid byte value '{input}': {err}"))
}

/// Parse `500ms`, `2s` or a bare number of seconds.
pub(crate) fn parse_duration(input: &str, allow_zero: bool) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 && !allow_zero {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
