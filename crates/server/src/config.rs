use std::{
    fs, io,
    net::SocketAddr,
    path::Path,
    time::Duration,
};

use anyhow::{anyhow, bail, Context};
use sequencer::{SequencerConfig, Timings};
use serde::Deserialize;
use shared::domain::Round;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub companion_addr: String,
    pub replay_rounds: bool,
    pub start_round: u8,
    pub cube_search_timeout_ms: u64,
    pub warm_up: bool,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            companion_addr: "127.0.0.1:8000".into(),
            replay_rounds: false,
            start_round: 0,
            cube_search_timeout_ms: 10_000,
            warm_up: true,
            log_filter: "info".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    companion_addr: Option<String>,
    replay_rounds: Option<bool>,
    start_round: Option<u8>,
    cube_search_timeout_ms: Option<u64>,
    warm_up: Option<bool>,
    log_filter: Option<String>,
}

/// Defaults, then the TOML file at `path` if there is one, then the
/// environment.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

fn load_settings_with(
    path: &Path,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("invalid settings file '{}'", path.display()))?;
            settings.apply_file(file_cfg);
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            return Err(error)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))
        }
    }

    settings.apply_env(var)?;
    Ok(settings)
}

impl Settings {
    fn apply_file(&mut self, file_cfg: FileSettings) {
        if let Some(v) = file_cfg.companion_addr {
            self.companion_addr = v;
        }
        if let Some(v) = file_cfg.replay_rounds {
            self.replay_rounds = v;
        }
        if let Some(v) = file_cfg.start_round {
            self.start_round = v;
        }
        if let Some(v) = file_cfg.cube_search_timeout_ms {
            self.cube_search_timeout_ms = v;
        }
        if let Some(v) = file_cfg.warm_up {
            self.warm_up = v;
        }
        if let Some(v) = file_cfg.log_filter {
            self.log_filter = v;
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(v) = var("COMPANION_ADDR") {
            self.companion_addr = v;
        }
        if let Some(v) = var("ARKIT__COMPANION_ADDR") {
            self.companion_addr = v;
        }

        if let Some(v) = var("ARKIT__REPLAY_ROUNDS") {
            self.replay_rounds = parse_flag("ARKIT__REPLAY_ROUNDS", &v)?;
        }
        if let Some(v) = var("ARKIT__START_ROUND") {
            self.start_round = v
                .trim()
                .parse()
                .with_context(|| format!("ARKIT__START_ROUND must be a round index, got '{v}'"))?;
        }
        if let Some(v) = var("ARKIT__CUBE_SEARCH_TIMEOUT_MS") {
            self.cube_search_timeout_ms = v.trim().parse().with_context(|| {
                format!("ARKIT__CUBE_SEARCH_TIMEOUT_MS must be milliseconds, got '{v}'")
            })?;
        }
        if let Some(v) = var("ARKIT__WARM_UP") {
            self.warm_up = parse_flag("ARKIT__WARM_UP", &v)?;
        }
        if let Some(v) = var("ARKIT__LOG") {
            self.log_filter = v;
        }

        Ok(())
    }

    pub fn sequencer_config(&self) -> anyhow::Result<SequencerConfig> {
        let start_round = Round::new(self.start_round).context("invalid start_round")?;
        if self.cube_search_timeout_ms == 0 {
            bail!("cube_search_timeout_ms must be greater than zero");
        }

        Ok(SequencerConfig {
            start_round,
            replay_rounds: self.replay_rounds,
            warm_up: self.warm_up,
            timings: Timings {
                cube_search_timeout: Duration::from_millis(self.cube_search_timeout_ms),
                ..Timings::default()
            },
        })
    }
}

fn parse_flag(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("{key} must be a boolean, got '{other}'")),
    }
}

pub async fn resolve_companion(companion_addr: &str) -> anyhow::Result<SocketAddr> {
    tokio::net::lookup_host(companion_addr)
        .await
        .with_context(|| format!("failed to resolve companion address '{companion_addr}'"))?
        .next()
        .ok_or_else(|| anyhow!("companion address '{companion_addr}' resolved to nothing"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
