//! Configuration loader: merges config.toml, .env, environment and CLI flags.

use std::path::Path;

use common::config::{PusherConfig, PUSH_DEADLINE_MARGIN};
use common::{Error, Region};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Values given on the command line; they win over everything else.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub region: Option<String>,
    pub influx_addr: Option<String>,
    pub influx_token: Option<String>,
    pub push_interval_secs: Option<u64>,
}

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn validate_config(config: &PusherConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.price_api.base_url.trim().is_empty() {
        issues.push("price_api.base_url must not be empty".into());
    }
    if config.price_api.timeout_secs == 0 {
        issues.push("price_api.timeout_secs must be > 0".into());
    }

    if config.influx.addr.trim().is_empty() {
        issues.push("influx.addr must not be empty".into());
    }
    if config.influx.token.trim().is_empty() {
        issues.push("influx.token must not be empty".into());
    }
    if config.influx.org.trim().is_empty() {
        issues.push("influx.org must not be empty".into());
    }
    if config.influx.bucket.trim().is_empty() {
        issues.push("influx.bucket must not be empty".into());
    }
    if config.influx.timeout_secs == 0 {
        issues.push("influx.timeout_secs must be > 0".into());
    }

    if config.timing.push_interval() <= PUSH_DEADLINE_MARGIN {
        issues.push(format!(
            "timing.push_interval_secs must be longer than {:?}",
            PUSH_DEADLINE_MARGIN
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Apply environment overrides, reading variables through `var`.
fn apply_env(config: &mut PusherConfig, var: impl Fn(&str) -> Option<String>) -> Result<(), Error> {
    if let Some(raw) = var("PRICE_REGION") {
        config.region = raw.parse::<Region>()?;
    }
    if let Some(url) = var("PRICE_API_BASE_URL") {
        config.price_api.base_url = url;
    }
    if let Some(addr) = var("INFLUX_ADDR") {
        config.influx.addr = addr;
    }
    if let Some(token) = var("INFLUX_TOKEN") {
        config.influx.token = token;
    }
    if let Some(org) = var("INFLUX_ORG") {
        config.influx.org = org;
    }
    if let Some(bucket) = var("INFLUX_BUCKET") {
        config.influx.bucket = bucket;
    }
    if let Some(raw) = var("PUSH_INTERVAL_SECS") {
        config.timing.push_interval_secs = parse_positive_u64(&raw, "PUSH_INTERVAL_SECS")?;
    }
    Ok(())
}

fn apply_cli(config: &mut PusherConfig, cli: &CliOverrides) -> Result<(), Error> {
    if let Some(raw) = &cli.region {
        config.region = raw.parse::<Region>()?;
    }
    if let Some(addr) = &cli.influx_addr {
        config.influx.addr = addr.clone();
    }
    if let Some(token) = &cli.influx_token {
        config.influx.token = token.clone();
    }
    if let Some(secs) = cli.push_interval_secs {
        config.timing.push_interval_secs = secs;
    }
    Ok(())
}

fn read_config_file(path: &Path) -> Result<PusherConfig, Error> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Load pusher configuration.
///
/// Lowest to highest priority: defaults, config file, environment (and
/// `.env`), command line. An explicitly named config file must exist;
/// `config.toml` in the working directory is optional.
pub fn load_config(path: Option<&Path>, cli: &CliOverrides) -> Result<PusherConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Defaults, then the config file.
    let mut config = match path {
        Some(p) => read_config_file(p)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                read_config_file(default_path)?
            } else {
                PusherConfig::default()
            }
        }
    };

    // 3. Environment, then flags.
    apply_env(&mut config, |k| std::env::var(k).ok())?;
    apply_cli(&mut config, cli)?;

    validate_config(&config)?;

    Ok(config)
}
