use std::fs::File;
use std::io::{self, Cursor, Read};

use tracing::info;
use xlink_frame::{Frame, FrameError, FrameReader, ReaderConfig};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{parse_hex, print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let source: Box<dyn Read> = match (&args.hex, &args.path) {
        (Some(hex), _) => Box::new(Cursor::new(parse_hex(hex)?)),
        (None, Some(path)) => Box::new(
            File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        (None, None) => Box::new(io::stdin().lock()),
    };

    let config = ReaderConfig {
        max_consecutive_mismatches: args.max_mismatches,
    };
    let mut reader = FrameReader::with_config(source, config);
    let mut printed = 0usize;

    loop {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("decode failed", err)),
        };

        if !matches_filter(&args, &frame) {
            continue;
        }

        print_frame(&frame, format);
        printed = printed.saturating_add(1);

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    info!(
        frames = printed,
        checksum_mismatches = reader.mismatches(),
        "decode finished"
    );
    Ok(SUCCESS)
}

fn matches_filter(args: &DecodeArgs, frame: &Frame) -> bool {
    args.component.is_none_or(|c| c == frame.component)
        && args.message.is_none_or(|m| m == frame.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::DATA_INVALID;

    fn args(hex: &str) -> DecodeArgs {
        DecodeArgs {
            path: None,
            hex: Some(hex.to_string()),
            component: None,
            message: None,
            count: None,
            max_mismatches: None,
        }
    }

    #[test]
    fn decodes_reference_frame_from_hex() {
        let result = run(args("A5 03 01 10 11 22 33 3A 00"), OutputFormat::Pretty);
        assert_eq!(result.unwrap(), SUCCESS);
    }

    #[test]
    fn corrupted_frame_fails_when_limited() {
        let mut decode = args("A5 03 01 10 11 22 33 3A 01");
        decode.max_mismatches = Some(1);
        let err = run(decode, OutputFormat::Pretty).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn filter_matches_component_and_message() {
        let frame = Frame::new(1, 0x10, &b""[..]);
        let mut decode = args("");
        assert!(matches_filter(&decode, &frame));

        decode.component = Some(1);
        decode.message = Some(0x11);
        assert!(!matches_filter(&decode, &frame));

        decode.message = Some(0x10);
        assert!(matches_filter(&decode, &frame));
    }
}
