//! The `vessel` binary, as a client of an in-process server and as a server.

use std::fs;
use std::process::{Child, Command, Output, Stdio};
use std::time::Duration;

use tempfile::TempDir;
use vessel_core::{GasState, Limits};
use vessel_rpc::RpcClient;

use crate::common::{Fixture, TIMEOUT, closed_addr};

/// Run the binary with an empty home directory so no user config leaks in.
async fn vessel(args: Vec<String>) -> Output {
    tokio::task::spawn_blocking(move || {
        let home = tempfile::tempdir().unwrap();
        Command::new(env!("CARGO_BIN_EXE_vessel"))
            .args(&args)
            .env("HOME", home.path())
            .env("RUST_LOG", "warn")
            .env_remove("VESSEL_ADDR")
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_prints_pressure_and_phase() {
    let fixture = Fixture::seeded().await;

    let output = vessel(args(&["status", "--address", &fixture.addr])).await;
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pressure: 130.80"), "{stdout}");
    assert!(stdout.contains("phase: stable"), "{stdout}");

    fixture.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_reports_destroyed_container() {
    let fixture = Fixture::start(GasState::at(12.0, 293.0, Limits::DEFAULT)).await;
    fixture.container.tick(&mut || 0.0);

    let output = vessel(args(&["status", "--address", &fixture.addr])).await;
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("phase: destroyed"), "{stdout}");

    fixture.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_reads_address_from_config_file() {
    let fixture = Fixture::seeded().await;
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("vessel.toml");
    fs::write(
        &config,
        format!("[server]\naddress = \"{}\"\n", fixture.addr),
    )
    .unwrap();

    let output = vessel(args(&["--config", config.to_str().unwrap(), "status"])).await;
    assert!(output.status.success(), "{output:?}");

    fixture.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_fails_without_a_server() {
    let addr = closed_addr().await;
    let output = vessel(args(&["status", "--address", &addr])).await;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("connecting to"));
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("vessel.toml");
    fs::write(&config, "[container]\npressure_limit = 500.0\n").unwrap();

    let output = vessel(args(&["--config", config.to_str().unwrap(), "status"])).await;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("pressure_limit"));
}

/// A `vessel server` child process, killed on drop.
struct ServerProcess {
    child: Child,
    _home: TempDir,
}

impl ServerProcess {
    fn spawn(addr: &str, config: &str) -> Self {
        let home = tempfile::tempdir().unwrap();
        let path = home.path().join("vessel.toml");
        fs::write(&path, config).unwrap();
        let child = Command::new(env!("CARGO_BIN_EXE_vessel"))
            .args(["--config", path.to_str().unwrap(), "--address", addr, "server"])
            .env("HOME", home.path())
            .env("RUST_LOG", "warn")
            .env_remove("VESSEL_ADDR")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        Self { child, _home: home }
    }

    /// Dial until the server accepts, failing fast if it exited.
    async fn connect(&mut self, addr: &str) -> RpcClient {
        for _ in 0..250 {
            if let Some(status) = self.child.try_wait().unwrap() {
                panic!("server exited early: {status}");
            }
            if let Ok(client) = RpcClient::connect(addr, TIMEOUT).await {
                return client;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("server never accepted on {addr}");
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_answers_rpc_and_drifts_on_its_own() {
    let addr = closed_addr().await;
    let mut server = ServerProcess::spawn(&addr, "[container]\ntick_period_ms = 20\n");
    let mut client = server.connect(&addr).await;

    // Drift may already have run a few ticks; the call itself must succeed.
    client.is_destroyed().await.unwrap();

    let seed = GasState::default().pressure();
    let mut moved = false;
    for _ in 0..100 {
        if (client.get_pressure().await.unwrap() - seed).abs() > 1e-9 {
            moved = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(moved, "pressure never left the seed value");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_applies_configured_limits() {
    // With the pressure limit raised past the seed pressure (~130.8) the
    // server accepts mass. A slow tick keeps drift from interfering.
    let addr = closed_addr().await;
    let config = "[container]\n\
        tick_period_ms = 60000\n\
        implosion_limit = 10.0\n\
        pressure_limit = 200.0\n\
        upper_pressure_limit = 250.0\n\
        explosion_limit = 300.0\n";
    let mut server = ServerProcess::spawn(&addr, config);
    let mut client = server.connect(&addr).await;

    let before = client.get_pressure().await.unwrap();
    client.increase_mass(1.0).await.unwrap();
    let after = client.get_pressure().await.unwrap();
    assert!((after - before - 293.0 / 22.4).abs() < 1e-9, "{before} -> {after}");
}
