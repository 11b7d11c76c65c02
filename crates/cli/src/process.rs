use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::time::Duration;

use hubble_api_client::ApiClient;
use hubble_core::{Attachment, SessionState};
use hubble_runtime_config::HubbleConfig;

use crate::config::load_config;
use crate::render::{TranscriptRenderer, completion_summary};

pub fn client_from_config(config: &HubbleConfig) -> Result<ApiClient> {
    ApiClient::new(
        &config.service.url,
        Duration::from_secs(config.service.connect_timeout_secs),
        Duration::from_secs(config.service.request_timeout_secs),
    )
    .context("Failed to build HTTP client")
}

/// Where `--download` without a path writes the chart.
fn default_download_path(config: &HubbleConfig) -> PathBuf {
    Path::new(&config.output.download_dir).join(&config.output.download_name)
}

/// Send one turn: a document (with optional request text) or plain text.
pub async fn run_process(
    file: Option<&Path>,
    request: &str,
    download: Option<Option<PathBuf>>,
    json: bool,
) -> Result<()> {
    let config = load_config()?;
    let client = client_from_config(&config)?;

    let mut state = SessionState::new();
    state.set_input(request);

    let mut renderer = TranscriptRenderer::new(std::io::stdout());
    if let Some(path) = file {
        let attachment = Attachment::from_path(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if let Err(e) = state.select_attachment(attachment) {
            renderer.finish(&state)?;
            return Err(e.into());
        }
        tracing::info!(server = %client.base_url(), "uploading {}", path.display());
    }

    client.submit(&mut state, &mut renderer).await;
    renderer.finish(&state)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    }

    if let Some(payload) = state.completion() {
        println!();
        println!(
            "{}",
            completion_summary(payload, state.chart_ref(), state.download_ref())
        );
        if let (Some(dest), Some(url)) = (download, state.download_ref()) {
            let dest = dest.unwrap_or_else(|| default_download_path(&config));
            let bytes = client
                .download_artifact(url, &dest)
                .await
                .with_context(|| format!("Failed to download {url}"))?;
            println!("Saved {} ({} bytes)", dest.display(), bytes);
        }
        return Ok(());
    }

    if state.is_streaming() {
        eprintln!("Warning: the service closed the stream before reporting completion.");
        return Ok(());
    }

    if file.is_some() {
        bail!("document processing failed");
    }
    Ok(())
}
