#![cfg(feature = "cli")]

use std::io::Write;
use std::process::{Command, Stdio};

fn xlink() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_xlink"));
    cmd.arg("--log-level").arg("error");
    cmd
}

#[test]
fn encode_prints_reference_wire() {
    let output = xlink()
        .args(["--format", "pretty", "encode", "-c", "1", "-m", "0x10", "--hex", "11 22 33"])
        .output()
        .expect("encode should run");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    assert_eq!(stdout.trim(), "A5 03 01 10 11 22 33 3A 00");
}

#[test]
fn crc_json_reports_checksum() {
    let output = xlink()
        .args(["--format", "json", "crc", "--data", "123456789"])
        .output()
        .expect("crc should run");

    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("crc output should be JSON");
    assert_eq!(value["crc16"], "0x6f91");
    assert_eq!(value["length"], 9);
}

#[test]
fn raw_encode_pipes_into_decode() {
    let encoded = xlink()
        .args(["--format", "raw", "encode", "-c", "7", "-m", "9", "--data", "hello"])
        .output()
        .expect("encode should run");
    assert!(encoded.status.success());

    let mut noisy = vec![0x00, 0x42];
    noisy.extend_from_slice(&encoded.stdout);

    let mut child = xlink()
        .args(["--format", "json", "decode"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("decode should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(&noisy)
        .expect("stdin should accept bytes");
    let output = child.wait_with_output().expect("decode should finish");

    assert!(output.status.success());
    let line = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    let value: serde_json::Value =
        serde_json::from_str(line.trim()).expect("frame output should be JSON");
    assert_eq!(value["component"], 7);
    assert_eq!(value["message"], 9);
    assert_eq!(value["payload_text"], "hello");
}

#[test]
fn decode_limit_on_corrupted_input_exits_with_data_invalid() {
    let output = xlink()
        .args([
            "decode",
            "--hex",
            "A5 03 01 10 11 22 33 3A 01",
            "--max-mismatches",
            "1",
        ])
        .output()
        .expect("decode should run");

    assert_eq!(output.status.code(), Some(60));
}
