//! Configuration loading

use anyhow::Result;
use tracing::info;

use crate::Config;

/// Load configuration from config file or environment variables
///
/// Config file search order:
/// 1. LIVETV_CONFIG_PATH environment variable (explicit path)
/// 2. ./livetv.yaml (current working directory)
/// 3. Fall back to environment variables only
pub fn load_config() -> Result<Config> {
    let config_path = std::env::var("LIVETV_CONFIG_PATH")
        .ok()
        .filter(|p| std::path::Path::new(p).exists())
        .or_else(|| {
            let cwd = "livetv.yaml";
            std::path::Path::new(cwd)
                .exists()
                .then(|| cwd.to_string())
        });

    load_config_from(config_path.as_deref())
}

/// Load from an explicit file (or environment only) and validate
pub fn load_config_from(path: Option<&str>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            eprintln!("Loading config from {path}");
            Config::from_file(path)
                .map_err(|e| anyhow::anyhow!("Failed to load {path}: {e}"))?
        }
        None => {
            eprintln!("No config file found, using environment variables");
            Config::from_env()?
        }
    };

    // Fail fast on misconfigurations
    if let Err(errors) = config.validate() {
        for error in &errors {
            tracing::error!("Config validation error: {}", error);
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }

    info!("Configuration loaded and validated successfully");
    info!("Channel directory: {}", config.sources.channels_url);
    info!("Verification mode: {:?}", config.verification.mode);

    Ok(config)
}
