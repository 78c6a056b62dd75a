use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use xlink_frame::Frame;

use crate::exit::{CliError, CliResult, USAGE};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    component: u8,
    message: u8,
    payload_size: usize,
    payload_hex: &'a str,
    payload_text: Option<&'a str>,
}

#[derive(Serialize)]
struct WireOutput<'a> {
    component: u8,
    message: u8,
    frame_size: usize,
    wire_hex: &'a str,
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    let payload_hex = to_hex(&frame.payload);
    let payload_text = std::str::from_utf8(&frame.payload).ok();

    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                component: frame.component,
                message: frame.message,
                payload_size: frame.payload.len(),
                payload_hex: &payload_hex,
                payload_text,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMPONENT", "MESSAGE", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    format!("{:#04x}", frame.component),
                    format!("{:#04x}", frame.message),
                    frame.payload.len().to_string(),
                    payload_text.map_or(payload_hex.clone(), str::to_string),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "component={:#04x} message={:#04x} size={} payload={}",
                frame.component,
                frame.message,
                frame.payload.len(),
                payload_hex
            );
        }
        OutputFormat::Raw => print_raw(&frame.payload),
    }
}

pub fn print_wire(component: u8, message: u8, wire: &[u8], format: OutputFormat) {
    let wire_hex = to_hex(wire);
    match format {
        OutputFormat::Json => {
            let out = WireOutput {
                component,
                message,
                frame_size: wire.len(),
                wire_hex: &wire_hex,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMPONENT", "MESSAGE", "SIZE", "WIRE"])
                .add_row(vec![
                    format!("{component:#04x}"),
                    format!("{message:#04x}"),
                    wire.len().to_string(),
                    wire_hex,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{wire_hex}"),
        OutputFormat::Raw => print_raw(wire),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Space-separated upper-case hex, the way frames are usually written down.
pub fn to_hex(bytes: &[u8]) -> String {
    let encoded = hex::encode_upper(bytes);
    let mut spaced = String::with_capacity(encoded.len() + bytes.len());
    for (idx, digit) in encoded.chars().enumerate() {
        if idx > 0 && idx % 2 == 0 {
            spaced.push(' ');
        }
        spaced.push(digit);
    }
    spaced
}

/// Parse hex digits, ignoring whitespace, `:` and `,` separators and `0x` prefixes.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || c == ':' || c == ',')
        .map(|chunk| {
            chunk
                .strip_prefix("0x")
                .or_else(|| chunk.strip_prefix("0X"))
                .unwrap_or(chunk)
        })
        .collect();

    hex::decode(&digits)
        .map_err(|err| CliError::new(USAGE, format!("invalid hex input: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrips_reference_frame() {
        let wire = parse_hex("A5 03 01 10 11 22 33 3A 00").unwrap();
        assert_eq!(wire, vec![0xA5, 0x03, 0x01, 0x10, 0x11, 0x22, 0x33, 0x3A, 0x00]);
        assert_eq!(to_hex(&wire), "A5 03 01 10 11 22 33 3A 00");
    }

    #[test]
    fn hex_accepts_common_separators() {
        assert_eq!(parse_hex("0xa5,0x03").unwrap(), vec![0xA5, 0x03]);
        assert_eq!(parse_hex("a5:03").unwrap(), vec![0xA5, 0x03]);
        assert_eq!(parse_hex("a503").unwrap(), vec![0xA5, 0x03]);
        assert!(parse_hex("").unwrap().is_empty());
    }

    #[test]
    fn hex_rejects_bad_input() {
        assert_eq!(parse_hex("a5 0").unwrap_err().code, USAGE);
        assert_eq!(parse_hex("zz").unwrap_err().code, USAGE);
        assert_eq!(parse_hex("a5 é3").unwrap_err().code, USAGE);

        let err = parse_hex("a5 0").unwrap_err();
        assert!(err.message.contains("invalid hex input"), "{}", err.message);
    }

    #[test]
    fn hex_output_spaces_every_byte() {
        assert_eq!(to_hex(&[]), "");
        assert_eq!(to_hex(&[0x0A]), "0A");
        assert_eq!(to_hex(&[0xde, 0xad, 0xbe, 0xef]), "DE AD BE EF");
    }
}
