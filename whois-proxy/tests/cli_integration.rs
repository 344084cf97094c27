// whois-proxy/tests/cli_integration.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpListener};
use std::thread::{self, JoinHandle};
use tempfile::TempDir;

const REFERRAL_REPLY: &str = "% IANA WHOIS server\r\n\
refer:        whois.verisign-grs.com\r\n\
\r\n\
domain:       COM\r\n\
whois:        whois.verisign-grs.com\r\n";

/// Serves `connections` sequential clients with the same reply and returns the request lines.
fn spawn_stub_proxy(response: &'static str, connections: usize) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind stub proxy");
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for _ in 0..connections {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            for _ in 0..2 {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                requests.push(line);
            }

            let mut writer = stream;
            writer.write_all(response.as_bytes()).unwrap();
            writer.shutdown(Shutdown::Write).unwrap();

            let mut rest = Vec::new();
            let _ = reader.read_to_end(&mut rest);
        }
        requests
    });

    (port, handle)
}

fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Command isolated from the caller's config files and `WP_*` variables.
fn whois_proxy(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("whois-proxy").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("RUST_LOG");
    for var in [
        "WP_PROXY_HOST",
        "WP_PROXY_PORT",
        "WP_TIMEOUT",
        "WP_READ_TIMEOUT",
        "WP_MAX_LOOP",
        "WP_DEFAULT_SERVER",
        "WP_PATTERNS",
        "WP_CONFIG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_shows_flags() {
    let home = TempDir::new().unwrap();
    let mut cmd = whois_proxy(&home);
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--raw"))
        .stdout(predicate::str::contains("--server"))
        .stdout(predicate::str::contains("--max-loop"))
        .stdout(predicate::str::contains("--pattern"))
        .stdout(predicate::str::contains("--read-timeout"));
}

#[test]
fn test_missing_domain_is_usage_error() {
    let home = TempDir::new().unwrap();
    let mut cmd = whois_proxy(&home);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("DOMAINS"));
}

#[test]
fn test_zero_max_loop_rejected() {
    let home = TempDir::new().unwrap();
    let mut cmd = whois_proxy(&home);
    cmd.args(["example.com", "--max-loop", "0"]);

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("--max-loop must be at least 1"));
}

#[test]
fn test_refused_proxy_exits_with_error() {
    let home = TempDir::new().unwrap();
    let port = unused_port().to_string();
    let mut cmd = whois_proxy(&home);
    cmd.args(["example.com", "--port", &port, "--timeout", "2s"]);

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Connection to proxy"))
        .stderr(predicate::str::contains(format!("127.0.0.1:{}", port)));
}

#[test]
fn test_prints_referral_server() {
    let home = TempDir::new().unwrap();
    let (port, stub) = spawn_stub_proxy(REFERRAL_REPLY, 1);
    let mut cmd = whois_proxy(&home);
    cmd.args(["example.com", "--port", &port.to_string()]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("example.com  whois.verisign-grs.com"));

    let requests = stub.join().unwrap();
    assert_eq!(requests, vec!["CONNECT WHOIS.IANA.ORG:43\r\n", "EXAMPLE.COM\r\n"]);
}

#[test]
fn test_no_referral_is_not_an_error() {
    let home = TempDir::new().unwrap();
    let (port, stub) = spawn_stub_proxy(REFERRAL_REPLY, 1);
    let mut cmd = whois_proxy(&home);
    cmd.args([
        "example.com",
        "--port",
        &port.to_string(),
        "--pattern",
        "referral url:",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("example.com  no referral found"));
    stub.join().unwrap();
}

#[test]
fn test_raw_output_with_explicit_server() {
    let home = TempDir::new().unwrap();
    let (port, stub) = spawn_stub_proxy(REFERRAL_REPLY, 1);
    let mut cmd = whois_proxy(&home);
    cmd.args([
        "example.com",
        "--raw",
        "--server",
        "whois.verisign-grs.com",
        "--port",
        &port.to_string(),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("% IANA WHOIS server"))
        .stdout(predicate::str::contains("domain:       COM"));

    let requests = stub.join().unwrap();
    assert_eq!(requests[0], "CONNECT WHOIS.VERISIGN-GRS.COM:43\r\n");
}

#[test]
fn test_json_output_for_several_domains() {
    let home = TempDir::new().unwrap();
    let (port, stub) = spawn_stub_proxy(REFERRAL_REPLY, 2);
    let mut cmd = whois_proxy(&home);
    cmd.args(["example.com", "example.net", "--json", "--port", &port.to_string()]);

    let output = cmd.assert().success().get_output().stdout.clone();
    let records: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let records = records.as_array().unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["domain"], "example.com");
    assert_eq!(records[1]["domain"], "example.net");
    assert_eq!(records[1]["referral"], "whois.verisign-grs.com");

    let requests = stub.join().unwrap();
    assert_eq!(requests[3], "EXAMPLE.NET\r\n");
}

#[test]
fn test_config_file_sets_proxy_and_patterns() {
    let home = TempDir::new().unwrap();
    let (port, stub) = spawn_stub_proxy(REFERRAL_REPLY, 1);
    let config_path = home.path().join("proxy.toml");
    fs::write(
        &config_path,
        format!(
            "[proxy]\nhost = \"127.0.0.1\"\nport = {}\n\n[patterns]\nwhois = [\"domain:\"]\n",
            port
        ),
    )
    .unwrap();

    let mut cmd = whois_proxy(&home);
    cmd.args(["example.com", "--config", config_path.to_str().unwrap()]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("example.com  com"));
    stub.join().unwrap();
}

#[test]
fn test_env_port_is_used() {
    let home = TempDir::new().unwrap();
    let (port, stub) = spawn_stub_proxy(REFERRAL_REPLY, 1);
    let mut cmd = whois_proxy(&home);
    cmd.env("WP_PROXY_PORT", port.to_string()).arg("example.com");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("whois.verisign-grs.com"));
    stub.join().unwrap();
}
