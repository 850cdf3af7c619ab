//! CLI subcommand implementations.

pub mod events;
pub mod init;
pub mod now;
pub mod schedule;

use anyhow::{Context, Result};
use lr_portal::{Credentials, PortalAuthenticator};

use crate::Config;

/// Logs in to the portal, failing the command once the login budget is spent.
fn authenticate(config: &Config, credentials: &Credentials) -> Result<PortalAuthenticator> {
    let mut auth = lr_portal::connect(&config.portal).context("failed to set up HTTP session")?;
    auth.login(credentials).context("failed to log in to the portal")?;
    Ok(auth)
}
