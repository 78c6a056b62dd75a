use serde::Serialize;
use xlink_frame::crc16;

use crate::cmd::CrcArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{parse_hex, OutputFormat};

#[derive(Serialize)]
struct CrcOutput {
    length: usize,
    crc16: String,
    wire_le: String,
}

pub fn run(args: CrcArgs, format: OutputFormat) -> CliResult<i32> {
    let input = match (&args.hex, &args.data) {
        (Some(hex), _) => parse_hex(hex)?,
        (None, Some(data)) => data.as_bytes().to_vec(),
        (None, None) => Vec::new(),
    };

    let crc = crc16(&input);
    let [lo, hi] = crc.to_le_bytes();

    match format {
        OutputFormat::Json => {
            let out = CrcOutput {
                length: input.len(),
                crc16: format!("{crc:#06x}"),
                wire_le: format!("{lo:02X} {hi:02X}"),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Raw => crate::output::print_raw(&[lo, hi]),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{crc:#06x} (wire: {lo:02X} {hi:02X}, {} bytes)", input.len());
        }
    }

    Ok(SUCCESS)
}
