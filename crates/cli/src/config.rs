use anyhow::{Context, Result};
use hubble_runtime_config::{
    CONFIG_FILE_NAME, HubbleConfig, apply_env_overrides, apply_fallbacks,
};
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.config/hubble/)
pub fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".config").join("hubble"))
}

/// Canonical config file path.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

fn read_config_file(path: &Path) -> Result<HubbleConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    let config = toml::from_str::<HubbleConfig>(&content)
        .with_context(|| format!("Failed to parse config at {}", path.display()))?;
    Ok(config)
}

/// Config exactly as stored on disk (defaults when the file is missing).
fn load_stored_config() -> Result<HubbleConfig> {
    let path = config_path()?;
    let mut config = if path.exists() {
        read_config_file(&path)?
    } else {
        HubbleConfig::default()
    };
    apply_fallbacks(&mut config);
    Ok(config)
}

/// Load the effective config: stored values plus environment overrides.
pub fn load_config() -> Result<HubbleConfig> {
    let mut config = load_stored_config()?;
    if apply_env_overrides(&mut config, |key| std::env::var(key).ok()) {
        tracing::debug!(url = %config.service.url, "service url overridden from environment");
    }
    Ok(config)
}

/// Save config to disk (in `hubble.toml`).
pub fn save_config(config: &HubbleConfig) -> Result<()> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config dir at {}", dir.display()))?;

    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    let path = config_path()?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write config at {}", path.display()))?;
    Ok(())
}

/// Print current config.
pub fn show_config() -> Result<()> {
    let config = load_config()?;
    let path = config_path()?;
    println!("Config file: {}", path.display());
    println!();
    println!("[service]");
    println!("  url                  = {}", config.service.url);
    println!("  connect_timeout_secs = {}", config.service.connect_timeout_secs);
    println!("  request_timeout_secs = {}", config.service.request_timeout_secs);
    println!();
    println!("[output]");
    println!("  download_dir  = {}", config.output.download_dir);
    println!("  download_name = {}", config.output.download_name);
    Ok(())
}

/// Update config with provided values.
pub fn set_config(server_url: Option<String>, download_dir: Option<String>) -> Result<()> {
    let mut config = load_stored_config()?;

    if let Some(url) = server_url {
        config.service.url = url;
    }
    if let Some(dir) = download_dir {
        config.output.download_dir = dir;
    }

    save_config(&config)?;
    println!("Configuration updated.");
    show_config()?;
    Ok(())
}
