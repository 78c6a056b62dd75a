use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("xlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: xlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target: {}", env!("XLINK_BUILD_TARGET"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "protocol: start={:#04x} max_payload={} crc=crc16/0x8408",
        xlink_frame::START_MARKER,
        xlink_frame::MAX_PAYLOAD
    );
    println!(
        "features: link={}, async={}, cli=true",
        cfg!(feature = "link"),
        cfg!(feature = "async")
    );

    Ok(SUCCESS)
}
