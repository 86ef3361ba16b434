mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./config.toml",
        "./debridflow.toml",
        "~/.config/debridflow/config.toml",
        "/etc/debridflow/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.download.concurrency == 0 {
        anyhow::bail!("Download concurrency cannot be 0");
    }

    if config.download.progress_interval_secs == 0 {
        anyhow::bail!("Download progress interval cannot be 0");
    }

    if config.upload.batch_size == 0 {
        anyhow::bail!("Upload batch size cannot be 0");
    }

    if config.debrid.requests_per_second == 0 {
        anyhow::bail!("Debrid requests_per_second cannot be 0");
    }

    for arr in &config.arrs {
        if arr.enabled && arr.api_key.is_empty() {
            anyhow::bail!("Arr '{}' is enabled but has no API key", arr.name);
        }
    }

    let services = [
        ("bazarr", &config.bazarr),
        ("emby", &config.emby),
        ("jellyseerr", &config.jellyseerr),
    ];
    for (name, service) in services {
        if let Some(service) = service {
            if service.enabled && service.api_key.is_empty() {
                anyhow::bail!("{} is enabled but has no API key", name);
            }
        }
    }

    let polls = [
        ("debrid", &config.polling.debrid),
        ("arr", &config.polling.arr),
        ("emby", &config.polling.emby),
        ("jellyseerr", &config.polling.jellyseerr),
    ];
    for (name, poll) in polls {
        if poll.max_attempts == 0 {
            anyhow::bail!("polling.{}.max_attempts cannot be 0", name);
        }
        if poll.interval_secs == 0 {
            anyhow::bail!("polling.{}.interval_secs cannot be 0", name);
        }
    }

    if !config.handoff.dir.exists() {
        tracing::warn!("Handoff directory does not exist: {:?}", config.handoff.dir);
    }

    Ok(())
}
