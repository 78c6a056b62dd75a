use std::fs::{self, OpenOptions};
use std::io::Write;

use tracing::debug;
use xlink_frame::{encode_into, MAX_FRAME_SIZE};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{parse_hex, print_wire, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;

    let mut buf = [0u8; MAX_FRAME_SIZE];
    let written = encode_into(args.component, args.message, &payload, &mut buf)
        .map_err(|err| frame_error("encode failed", err))?;
    let wire = &buf[..written];
    debug!(
        component = args.component,
        message = args.message,
        len = payload.len(),
        "frame encoded"
    );

    match &args.out {
        Some(path) => {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
            file.write_all(wire)
                .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
        }
        None => print_wire(args.component, args.message, wire, format),
    }

    Ok(SUCCESS)
}

fn resolve_payload(args: &EncodeArgs) -> CliResult<Vec<u8>> {
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use xlink_frame::frame_size;

    use super::*;

    #[test]
    fn encode_appends_to_output_file() {
        let path = std::env::temp_dir().join(format!("xlink-encode-{}.bin", std::process::id()));
        let _ = fs::remove_file(&path);

        for _ in 0..2 {
            let args = EncodeArgs {
                component: 0x01,
                message: 0x10,
                hex: Some("11 22 33".to_string()),
                data: None,
                file: None,
                out: Some(path.clone()),
            };
            assert_eq!(run(args, OutputFormat::Raw).unwrap(), SUCCESS);
        }

        let written = fs::read(&path).unwrap();
        let _ = fs::remove_file(&path);
        let reference = [0xA5, 0x03, 0x01, 0x10, 0x11, 0x22, 0x33, 0x3A, 0x00];
        assert_eq!(written.len(), 2 * frame_size(3));
        assert_eq!(&written[..9], &reference);
        assert_eq!(&written[9..], &reference);
    }

    #[test]
    fn oversized_payload_is_invalid_data() {
        let args = EncodeArgs {
            component: 1,
            message: 1,
            hex: None,
            data: Some("x".repeat(251)),
            file: None,
            out: None,
        };
        let err = run(args, OutputFormat::Pretty).unwrap_err();
        assert_eq!(err.code, crate::exit::DATA_INVALID);
    }
}
