//! File configuration and its merge with CLI flags and the environment.
//!
//! Precedence: explicit CLI flags, then environment (router and probe only),
//! then the config file, then built-in defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use discography_core::RunOptions;
use discography_core::identity::{DEFAULT_ROTATE_AFTER_DAYS, RotationConfig, RouterSettings};
use serde::Deserialize;

use crate::cli::Args;

const DEFAULT_CATALOG_HELPER: &str = "discography-catalog";
const DEFAULT_FETCHER: &str = "yt-dlp";
const DEFAULT_PROBE_URL: &str = "https://api.ipify.org";
const DEFAULT_ROUTER_USERNAME: &str = "root";
const DEFAULT_ROUTER_INTERFACE: &str = "wan";

/// TOML-backed file configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub output_dir: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub skip_tags: Option<bool>,
    pub include_live: Option<bool>,
    pub pace: Option<bool>,
    pub daily_limit: Option<u32>,
    pub batch_limit: Option<u32>,
    pub track_delay_secs: Option<u64>,
    pub error_cooldown_secs: Option<u64>,
    pub max_run_failures: Option<u32>,
    pub similarity_threshold: Option<f64>,
    pub catalog_helper: Option<String>,
    pub catalog_helper_args: Vec<String>,
    pub fetcher: Option<String>,
    pub rotate_after_days: Option<i64>,
    pub probe_url: Option<String>,
    pub router: RouterSection,
    pub rotation: RotationSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RouterSection {
    pub host: Option<String>,
    pub username: Option<String>,
    pub interface: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RotationSection {
    pub max_cycles: Option<u32>,
    pub max_attempts_per_cycle: Option<u32>,
    pub stabilize_wait_secs: Option<u64>,
    pub cycle_cooldown_secs: Option<u64>,
    pub min_freshness_days: Option<u32>,
}

impl FileConfig {
    /// Validates values that parse but make no sense.
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(threshold) = self.similarity_threshold
            && !(0.0..=1.0).contains(&threshold)
        {
            bail!(
                "Invalid config value for `similarity_threshold`: {threshold}. Expected range: 0.0..=1.0"
            );
        }
        if self.max_run_failures == Some(0) {
            bail!("Invalid config value for `max_run_failures`: 0. Expected at least 1");
        }
        if self.rotation.max_cycles == Some(0) || self.rotation.max_attempts_per_cycle == Some(0) {
            bail!(
                "Invalid config value in [rotation]: cycle and attempt counts must be at least 1"
            );
        }
        Ok(())
    }
}

/// Everything the runtime needs, resolved from all sources.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub options: RunOptions,
    pub db_path: PathBuf,
    pub catalog_helper: String,
    pub catalog_helper_args: Vec<String>,
    pub fetcher: String,
    /// `None` when no router is configured; identity features are then off.
    pub router: Option<RouterSettings>,
    pub probe_url: String,
    pub rotation: RotationConfig,
    pub rotate_after_days: i64,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/discography/config.toml`
/// 2. `$HOME/.config/discography/config.toml`
#[must_use]
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("discography")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("discography")
            .join("config.toml"),
    )
}

fn env_var_non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Loads the config file: `explicit` must exist, the default path may not.
pub(crate) fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("Config file '{}' does not exist", path.display());
            }
            path.to_path_buf()
        }
        None => match resolve_default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(None),
        },
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    let config = parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
    Ok(Some(config))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

/// Merges CLI flags, environment and file config into [`Settings`].
pub(crate) fn resolve_settings(
    args: &Args,
    file: Option<&FileConfig>,
    lookup_env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let file = file.cloned().unwrap_or_default();
    let defaults = RunOptions::default();

    let output_dir = args
        .output_dir
        .clone()
        .or(file.output_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    let db_path = args
        .db
        .clone()
        .or(file.database)
        .unwrap_or_else(|| output_dir.join(".discography").join("catalog.db"));

    let options = RunOptions {
        include_live: args.live || file.include_live.unwrap_or(defaults.include_live),
        skip_tags: args.skip_tags || file.skip_tags.unwrap_or(defaults.skip_tags),
        preload: args.preload,
        daily_limit: args
            .daily_limit
            .or(file.daily_limit)
            .unwrap_or(defaults.daily_limit),
        batch_limit: args
            .batch_limit
            .or(file.batch_limit)
            .unwrap_or(defaults.batch_limit),
        track_delay: file
            .track_delay_secs
            .map_or(defaults.track_delay, Duration::from_secs),
        error_cooldown: file
            .error_cooldown_secs
            .map_or(defaults.error_cooldown, Duration::from_secs),
        pace: args.daemon || (!args.no_delay && file.pace.unwrap_or(defaults.pace)),
        max_run_failures: file.max_run_failures.unwrap_or(defaults.max_run_failures),
        similarity_threshold: file
            .similarity_threshold
            .unwrap_or(defaults.similarity_threshold),
        output_dir,
    };

    let router_host = lookup_env("ROUTER_HOST").or(file.router.host);
    let router = router_host.map(|host| RouterSettings {
        host,
        username: lookup_env("ROUTER_USERNAME")
            .or(file.router.username.clone())
            .unwrap_or_else(|| DEFAULT_ROUTER_USERNAME.to_string()),
        interface: lookup_env("ROUTER_INTERFACE")
            .or(file.router.interface.clone())
            .unwrap_or_else(|| DEFAULT_ROUTER_INTERFACE.to_string()),
    });

    let rotation_defaults = RotationConfig::default();
    let rotation = RotationConfig {
        max_cycles: file
            .rotation
            .max_cycles
            .unwrap_or(rotation_defaults.max_cycles),
        max_attempts_per_cycle: file
            .rotation
            .max_attempts_per_cycle
            .unwrap_or(rotation_defaults.max_attempts_per_cycle),
        stabilize_wait: file
            .rotation
            .stabilize_wait_secs
            .map_or(rotation_defaults.stabilize_wait, Duration::from_secs),
        cycle_cooldown: file
            .rotation
            .cycle_cooldown_secs
            .map_or(rotation_defaults.cycle_cooldown, Duration::from_secs),
        min_freshness_days: file
            .rotation
            .min_freshness_days
            .unwrap_or(rotation_defaults.min_freshness_days),
    };

    Settings {
        options,
        db_path,
        catalog_helper: args
            .catalog_helper
            .clone()
            .or(file.catalog_helper)
            .unwrap_or_else(|| DEFAULT_CATALOG_HELPER.to_string()),
        catalog_helper_args: file.catalog_helper_args,
        fetcher: file
            .fetcher
            .unwrap_or_else(|| DEFAULT_FETCHER.to_string()),
        router,
        probe_url: lookup_env("IP_CHECK_URL")
            .or(file.probe_url)
            .unwrap_or_else(|| DEFAULT_PROBE_URL.to_string()),
        rotation,
        rotate_after_days: file
            .rotate_after_days
            .unwrap_or(DEFAULT_ROTATE_AFTER_DAYS),
    }
}

/// Reads a process environment variable for [`resolve_settings`].
pub(crate) fn process_env(name: &str) -> Option<String> {
    env_var_non_empty(name)
}
