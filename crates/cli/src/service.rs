use anyhow::{Context, Result, bail};
use std::path::Path;

use hubble_api_client::hubble_api::RegenerateRequest;
use hubble_core::resolve_ref;

use crate::config::load_config;
use crate::process::client_from_config;

/// Check that the processing service is reachable.
pub async fn run_health() -> Result<()> {
    let config = load_config()?;
    let client = client_from_config(&config)?;

    let health = client
        .health()
        .await
        .with_context(|| format!("Service at {} is unreachable", client.base_url()))?;
    let service = health.service.as_deref().unwrap_or("unknown service");
    println!("{} ({}): {}", client.base_url(), service, health.status);
    if !health.is_healthy() {
        bail!("service reported status '{}'", health.status);
    }
    Ok(())
}

/// Ask the service to rebuild a finished timeline.
pub async fn run_regenerate(session_id: &str, modification: &str) -> Result<()> {
    if modification.trim().is_empty() {
        bail!("Modification must not be empty");
    }
    let config = load_config()?;
    let client = client_from_config(&config)?;

    let resp = client
        .regenerate(&RegenerateRequest {
            session_id: session_id.to_string(),
            modification: modification.trim().to_string(),
        })
        .await
        .context("Regeneration failed")?;

    if let Some(message) = resp.message {
        println!("{message}");
    }
    if let Some(note) = resp.note {
        println!("Note: {note}");
    }
    Ok(())
}

/// Fetch a chart artifact by service-relative path or absolute URL.
pub async fn run_download(reference: &str, dest: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let client = client_from_config(&config)?;

    let url = resolve_ref(client.base_url(), reference);
    let dest = match dest {
        Some(path) => path.to_path_buf(),
        None => Path::new(&config.output.download_dir).join(&config.output.download_name),
    };
    let bytes = client
        .download_artifact(&url, &dest)
        .await
        .with_context(|| format!("Failed to download {url}"))?;
    println!("Saved {} ({} bytes)", dest.display(), bytes);
    Ok(())
}
