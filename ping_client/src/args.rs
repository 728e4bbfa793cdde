//! Command-line parsing.
//!
//! `--config <file.json>` is read first; the remaining flags override values
//! from the file.

use anyhow::{bail, Context};
use ping_shared::config::GameConfig;

pub const USAGE: &str = "usage: speed-ping [--config file.json] [--probe-addr host:port] \
[--probe-path /path] [--probe-timeout-ms N] [--data-dir dir]";

/// Builds the game config from arguments (without the program name).
pub fn parse_args(args: &[String]) -> anyhow::Result<GameConfig> {
    let mut cfg = match find_flag(args, "--config") {
        Some(path) => GameConfig::from_json_file(path)?,
        None => GameConfig::default(),
    };

    let mut i = 0;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--config", Some(_)) => i += 2,
            ("--probe-addr", Some(v)) => {
                cfg.probe_addr = v.clone();
                i += 2;
            }
            ("--probe-path", Some(v)) => {
                cfg.probe_path = v.clone();
                i += 2;
            }
            ("--probe-timeout-ms", Some(v)) => {
                cfg.probe_timeout_ms = v
                    .parse()
                    .with_context(|| format!("invalid --probe-timeout-ms {v:?}"))?;
                i += 2;
            }
            ("--data-dir", Some(v)) => {
                cfg.data_dir = v.clone();
                i += 2;
            }
            (flag, None) if flag.starts_with("--") => bail!("missing value for {flag}\n{USAGE}"),
            (other, _) => bail!("unknown argument {other:?}\n{USAGE}"),
        }
    }
    Ok(cfg)
}

fn find_flag<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|pair| pair[0] == flag)
        .map(|pair| pair[1].as_str())
}
