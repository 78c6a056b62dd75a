use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod crc;
pub mod decode;
pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the frame checksum of some bytes.
    Crc(CrcArgs),
    /// Encode one frame.
    Encode(EncodeArgs),
    /// Decode frames from a file, device or stdin.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Crc(args) => crc::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct CrcArgs {
    /// Hex input (e.g. "03 01 10 11 22 33").
    #[arg(conflicts_with = "data")]
    pub hex: Option<String>,
    /// Raw string input.
    #[arg(long)]
    pub data: Option<String>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Component ID.
    #[arg(long, short = 'c', value_parser = parse_id)]
    pub component: u8,
    /// Message ID.
    #[arg(long, short = 'm', value_parser = parse_id)]
    pub message: u8,
    /// Hex payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["hex", "data"])]
    pub file: Option<PathBuf>,
    /// Append the encoded frame to this file instead of printing it.
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File or serial device to read. Default: stdin.
    #[arg(conflicts_with = "hex")]
    pub path: Option<PathBuf>,
    /// Decode hex text instead of reading a byte stream.
    #[arg(long)]
    pub hex: Option<String>,
    /// Only print frames for this component ID.
    #[arg(long, value_parser = parse_id)]
    pub component: Option<u8>,
    /// Only print frames with this message ID.
    #[arg(long, value_parser = parse_id)]
    pub message: Option<u8>,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Fail after this many corrupted frames in a row.
    #[arg(long)]
    pub max_mismatches: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Accept decimal or `0x`-prefixed hex identifiers.
fn parse_id(input: &str) -> Result<u8, String> {
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("expected 0-255 or 0x00-0xFF, got {input:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_accept_decimal_and_hex() {
        assert_eq!(parse_id("16"), Ok(16));
        assert_eq!(parse_id("0x10"), Ok(16));
        assert_eq!(parse_id("0XFF"), Ok(255));
        assert!(parse_id("256").is_err());
        assert!(parse_id("0x1FF").is_err());
    }
}
