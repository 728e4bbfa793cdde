//! Latency probing.
//!
//! A probe performs one timed network round trip. [`measure`] turns the
//! outcome into a latency sample and never fails: a probe error is replaced
//! by a pseudo-random fallback so a round always reaches its result.

use std::{
    ops::RangeInclusive,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{bail, Context};
use async_trait::async_trait;
use rand::Rng;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::{self, Instant},
};
use tracing::{debug, warn};

use crate::config::GameConfig;

/// Range of the substitute sample used when a probe fails.
pub const FALLBACK_RANGE_MS: RangeInclusive<u32> = 20..=70;

/// One timed network round trip.
#[async_trait]
pub trait LatencyProbe: Send + Sync {
    /// Returns the elapsed time between dispatch and response.
    async fn probe(&self) -> anyhow::Result<Duration>;
}

/// Probe that sends an HTTP `HEAD` request over a fresh TCP connection and
/// stops the clock at the first response byte.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    addr: String,
    host: String,
    path: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(addr: &str, path: &str, timeout: Duration) -> Self {
        let host = match addr.rsplit_once(':') {
            Some((host, _port)) => host,
            None => addr,
        };
        Self {
            addr: addr.to_string(),
            host: host.to_string(),
            path: path.to_string(),
            timeout,
        }
    }

    pub fn from_config(cfg: &GameConfig) -> Self {
        Self::new(&cfg.probe_addr, &cfg.probe_path, cfg.probe_timeout())
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn request(&self) -> String {
        // Cache-busting query so intermediaries never answer from cache.
        let bust = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!(
            "HEAD {}?t={} HTTP/1.1\r\nHost: {}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
            self.path, bust, self.host
        )
    }

    async fn round_trip(&self) -> anyhow::Result<()> {
        let mut stream = TcpStream::connect(&self.addr)
            .await
            .context("probe connect")?;
        stream
            .write_all(self.request().as_bytes())
            .await
            .context("probe write")?;

        let mut buf = [0u8; 256];
        let n = stream.read(&mut buf).await.context("probe read")?;
        if n == 0 {
            bail!("probe endpoint closed without responding");
        }
        Ok(())
    }
}

#[async_trait]
impl LatencyProbe for HttpProbe {
    async fn probe(&self) -> anyhow::Result<Duration> {
        let start = Instant::now();
        match time::timeout(self.timeout, self.round_trip()).await {
            Ok(result) => result?,
            Err(_) => bail!("probe timed out after {:?}", self.timeout),
        }
        Ok(start.elapsed())
    }
}

/// Converts an elapsed time to whole milliseconds, rounding to nearest.
pub fn duration_to_ms(elapsed: Duration) -> u32 {
    let ms = (elapsed.as_secs_f64() * 1000.0).round();
    if ms >= u32::MAX as f64 {
        u32::MAX
    } else {
        ms.max(0.0) as u32
    }
}

/// Draws a substitute sample from [`FALLBACK_RANGE_MS`].
pub fn fallback_sample<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(FALLBACK_RANGE_MS)
}

/// Runs one probe and returns the latency sample in milliseconds.
pub async fn measure(probe: &dyn LatencyProbe) -> u32 {
    match probe.probe().await {
        Ok(elapsed) => {
            let latency_ms = duration_to_ms(elapsed);
            debug!(latency_ms, "probe completed");
            latency_ms
        }
        Err(err) => {
            let latency_ms = fallback_sample(&mut rand::thread_rng());
            warn!(?err, latency_ms, "probe failed; using fallback sample");
            latency_ms
        }
    }
}
