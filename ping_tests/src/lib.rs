//! Shared fixtures for the integration tests.

use std::{
    io::Write,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::Context;
use ping_shared::{
    config::GameConfig,
    ui::{GameView, UiSnapshot},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};
use tracing::debug;

/// Installs a test-friendly tracing subscriber (once per process).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// Binds a local HTTP-ish endpoint that answers every request with `204`.
pub async fn spawn_probe_endpoint() -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind probe endpoint")?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        while let Ok((mut sock, peer)) = listener.accept().await {
            debug!(%peer, "probe endpoint hit");
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                if sock.read(&mut buf).await.is_ok() {
                    let _ = sock.write_all(b"HTTP/1.1 204 No Content\r\n\r\n").await;
                }
            });
        }
    });
    Ok((addr, handle))
}

/// Returns an address nothing is listening on.
pub async fn refused_addr() -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Config with short delays pointing at `probe_addr`.
pub fn fast_config(probe_addr: SocketAddr, data_dir: &Path) -> GameConfig {
    GameConfig {
        probe_addr: probe_addr.to_string(),
        probe_path: "/".to_string(),
        probe_timeout_ms: 2_000,
        intro_delay_ms: 20,
        result_delay_ms: 10,
        data_dir: data_dir.to_string_lossy().into_owned(),
    }
}

/// Fresh, empty scratch directory unique to this process.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ping_tests_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

/// View that keeps every rendered frame.
#[derive(Clone, Default)]
pub struct RecordingView {
    frames: Arc<Mutex<Vec<UiSnapshot>>>,
}

impl RecordingView {
    pub fn frames(&self) -> Vec<UiSnapshot> {
        self.frames
            .lock()
            .map(|frames| frames.clone())
            .unwrap_or_default()
    }
}

impl GameView for RecordingView {
    fn render(&mut self, ui: &UiSnapshot) {
        if let Ok(mut frames) = self.frames.lock() {
            frames.push(ui.clone());
        }
    }
}

/// Cloneable in-memory writer, for inspecting terminal output.
#[derive(Clone, Default)]
pub struct SharedBuf {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    pub fn contents(&self) -> String {
        self.bytes
            .lock()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.bytes.lock() {
            Ok(mut bytes) => {
                bytes.extend_from_slice(buf);
                Ok(buf.len())
            }
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "buffer poisoned",
            )),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
