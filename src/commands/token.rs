use anyhow::{Context, Result};
use log::debug;
use std::io::Write;

use super::config::Config;
use crate::auth::{DEFAULT_EXPIRES_IN_SECS, Token, TokenRefresher};
use crate::runtime::Runtime;

/// Print where the token lives, its masked access token and expiry.
#[tracing::instrument(skip(config, out))]
pub fn token_show<R: Runtime, W: Write>(config: &Config<R>, out: &mut W) -> Result<()> {
    let store = config.store();
    let token = store.load()?;

    writeln!(out, "Token file: {}", store.path().display())?;
    writeln!(out, "Access token: {}", token.masked())?;
    writeln!(
        out,
        "Refresh token: {}",
        if token.refresh_token.is_empty() {
            "(none)"
        } else {
            "present"
        }
    )?;
    let state = if token.is_expired() { "expired" } else { "valid" };
    writeln!(out, "Expires: {} ({})", token.expiry.to_rfc3339(), state)?;
    Ok(())
}

/// Exchange the stored refresh token for a new token and save it.
#[tracing::instrument(skip(config, out))]
pub async fn token_refresh<R: Runtime, W: Write>(config: &Config<R>, out: &mut W) -> Result<()> {
    let store = config.store();
    let token = store.load()?;
    let refresher = config.refresher();

    debug!("Forcing refresh of token {}", token.masked());
    let fresh = refresher
        .refresh(&token.refresh_token)
        .await
        .context("Failed to refresh token")?;
    store.save(&fresh)?;

    writeln!(out, "Token refreshed, expires {}", fresh.expiry.to_rfc3339())?;
    Ok(())
}

/// Save a token obtained out of band.
#[tracing::instrument(skip(config, access_token, refresh_token))]
pub fn token_import<R: Runtime>(
    config: &Config<R>,
    access_token: &str,
    refresh_token: &str,
    expires_in: Option<i64>,
) -> Result<()> {
    if access_token.is_empty() {
        anyhow::bail!("Access token must not be empty");
    }

    let token = Token::expiring_in(
        access_token,
        refresh_token,
        expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
    );
    config.store().save(&token)?;
    debug!("Imported token {} into {:?}", token.masked(), config.token_file);
    Ok(())
}
