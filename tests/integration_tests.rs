use std::process::Stdio;
use std::thread::sleep;
use std::time::{Duration, Instant};

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::str::contains;

fn lc3vm() -> Command {
    Command::cargo_bin("lc3vm").unwrap()
}

#[test]
fn requires_an_image() {
    lc3vm().write_stdin("").assert().failure().code(2);
}

#[test]
fn runs_hello_world() {
    lc3vm()
        .arg("tests/files/hello.obj")
        .write_stdin("")
        .assert()
        .success()
        .stdout(contains("Hello, world!HALT"))
        .stdout(contains("Loading"))
        .stdout(contains("17 word(s) at 0x3000..=0x3010"))
        .stdout(contains("Running"))
        .stdout(contains("Completed"));
}

#[test]
fn minimal_prints_only_program_output() {
    lc3vm()
        .arg("tests/files/hello.obj")
        .arg("--minimal")
        .write_stdin("")
        .assert()
        .success()
        .stdout("Hello, world!HALT\n");
}

#[test]
fn minimal_from_environment() {
    lc3vm()
        .arg("tests/files/hello.obj")
        .env("LC3VM_MINIMAL", "1")
        .write_stdin("")
        .assert()
        .success()
        .stdout("Hello, world!HALT\n");
}

#[test]
fn loads_multiple_images() {
    lc3vm()
        .args(["tests/files/print_string.obj", "tests/files/string.obj"])
        .arg("--minimal")
        .write_stdin("")
        .assert()
        .success()
        .stdout("Two imagesHALT\n");
}

#[test]
fn echoes_piped_input() {
    lc3vm()
        .args(["tests/files/echo.obj", "--minimal"])
        .write_stdin("hi")
        .assert()
        .success()
        .stdout("hiHALT\n");
}

#[test]
fn polls_keyboard_register() {
    lc3vm()
        .args(["tests/files/keyboard.obj", "--minimal"])
        .write_stdin("k")
        .assert()
        .success()
        .stdout("kHALT\n");
}

#[test]
fn prints_packed_string() {
    lc3vm()
        .args(["tests/files/putsp.obj", "--minimal"])
        .write_stdin("")
        .assert()
        .success()
        .stdout("Packed!HALT\n");
}

#[test]
fn prompts_for_input() {
    lc3vm()
        .args(["tests/files/prompt.obj", "--minimal"])
        .write_stdin("x")
        .assert()
        .success()
        .stdout("Enter a character: xHALT\n");
}

#[test]
fn traces_instructions() {
    lc3vm()
        .args(["tests/files/hello.obj", "--minimal"])
        .env("LC3VM_TRACE", "1")
        .write_stdin("")
        .assert()
        .success()
        .stderr(contains("0x3000  0xe002  LEA"))
        .stderr(contains("0x3002  0xf025  TRAP"));
}

#[test]
fn missing_image_fails_to_load() {
    lc3vm()
        .arg("tests/files/does_not_exist.obj")
        .write_stdin("")
        .assert()
        .failure()
        .code(1)
        .stdout(contains("Failed"))
        .stderr(contains("does_not_exist.obj"));
}

#[test]
fn short_image_fails_to_load() {
    lc3vm()
        .args(["tests/files/hello.obj", "tests/files/short.obj"])
        .write_stdin("")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("too short"));
}

#[test]
fn keyboard_poll_does_not_wait_for_open_stdin() {
    // LDI R0, #1; HALT; .FILL xFE00
    let mut child = std::process::Command::new(cargo_bin("lc3vm"))
        .args(["tests/files/poll_once.obj", "--minimal"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    // Kept open, never written to
    let stdin = child.stdin.take();

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break Some(status);
        }
        if started.elapsed() > Duration::from_secs(10) {
            child.kill().unwrap();
            break None;
        }
        sleep(Duration::from_millis(20));
    };
    drop(stdin);

    let status = status.expect("machine did not halt while stdin was open and empty");
    assert!(status.success());
    let output = child.wait_with_output().unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout), "HALT\n");
}
