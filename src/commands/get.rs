use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io::Write;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use super::config::Config;
use crate::runtime::Runtime;

/// Fetch `url` with the stored token and write the body to `output` or `out`.
///
/// A token refreshed during the fetch is saved even if the fetch itself
/// fails, since the provider may have rotated the refresh token. The body is
/// written before the token is saved.
#[tracing::instrument(skip(config, cancel, out))]
pub async fn get<R: Runtime, W: Write>(
    config: &Config<R>,
    url: &str,
    output: Option<&Path>,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<()> {
    let store = config.store();
    let mut token = store.load()?;
    let original = token.clone();

    let fetcher = config.fetcher()?;
    let outcome = fetcher
        .fetch_with_cancel(url, &mut token, cancel)
        .await
        .with_context(|| format!("Failed to fetch {}", url))
        .and_then(|body| write_body(config, output, out, &body));

    if token != original {
        info!("Access token was refreshed, saving to {:?}", store.path());
        if let Err(e) = store.save(&token) {
            if outcome.is_ok() {
                return Err(e);
            }
            warn!("Failed to save refreshed token: {:#}", e);
        }
    }

    outcome
}

fn write_body<R: Runtime, W: Write>(
    config: &Config<R>,
    output: Option<&Path>,
    out: &mut W,
    body: &[u8],
) -> Result<()> {
    debug!("Received {} bytes", body.len());
    match output {
        Some(path) => config
            .runtime
            .write(path, body)
            .with_context(|| format!("Failed to write response to {:?}", path)),
        None => out.write_all(body).context("Failed to write response"),
    }
}
