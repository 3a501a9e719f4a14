//! Process-level shutdown of the built binary.
//!
//! The stdio transport reads stdin on a blocking thread, so these tests run
//! the real executable with a pipe the test keeps open.

#![cfg(unix)]

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde_json::Value;

fn spawn_stdio_server(home: &std::path::Path) -> Child {
    Command::new(env!("CARGO_BIN_EXE_fb-insights-mcp"))
        .arg("--announce-ready")
        .env("HOME", home)
        .env("FB_APP_ID", "1")
        .env("FB_APP_SECRET", "secret")
        .env("FB_ACCESS_TOKEN", "token")
        .env_remove("PORT")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap()
}

fn wait_for_exit(child: &mut Child, limit: Duration) -> Option<ExitStatus> {
    let started = Instant::now();
    while started.elapsed() < limit {
        if let Some(status) = child.try_wait().unwrap() {
            return Some(status);
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    None
}

#[test]
fn test_sigterm_exits_while_stdin_is_open() {
    let home = tempfile::tempdir().unwrap();
    let mut child = spawn_stdio_server(home.path());

    // Held for the whole test so stdin never reaches end of input.
    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap());

    let mut line = String::new();
    stdout.read_line(&mut line).unwrap();
    assert_eq!(line.trim_end(), r#"{"ready":true}"#);

    // A round trip guarantees the serve loop, and with it the signal
    // handler, is running.
    writeln!(stdin, r#"{{"jsonrpc":"2.0","id":1,"method":"ping"}}"#).unwrap();
    stdin.flush().unwrap();
    line.clear();
    stdout.read_line(&mut line).unwrap();
    let pong: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(pong["id"], 1);

    let killed = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let status = wait_for_exit(&mut child, Duration::from_secs(10));
    if status.is_none() {
        let _ = child.kill();
        let _ = child.wait();
    }
    drop(stdin);

    let status = status.expect("server kept running after SIGTERM");
    assert!(status.success(), "unexpected exit status: {status}");
}

#[test]
fn test_end_of_input_exits_cleanly() {
    let home = tempfile::tempdir().unwrap();
    let mut child = spawn_stdio_server(home.path());

    drop(child.stdin.take());

    let status = wait_for_exit(&mut child, Duration::from_secs(10));
    if status.is_none() {
        let _ = child.kill();
        let _ = child.wait();
    }

    let status = status.expect("server kept running after end of input");
    assert!(status.success(), "unexpected exit status: {status}");
}
