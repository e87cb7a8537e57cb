//! Loading the server configuration from a TOML file.

use std::fs;
use std::path::Path;

use crate::errors::{Error, Result};
use crate::server::Config;

// -----------------------------------------------------------------------------
// ----- read_server_config ----------------------------------------------------

/// Unmarshal the server config at the given path.
pub(crate) fn read_server_config(path: &Path) -> Result<Config> {
    let abs_path = std::path::absolute(path)
        .map_err(|err| Error::Config(format!("cannot resolve {}: {err}", path.display())))?;

    let raw = fs::read_to_string(&abs_path)
        .map_err(|err| Error::Config(format!("failed to read {}: {err}", abs_path.display())))?;

    toml::from_str(&raw)
        .map_err(|err| Error::Config(format!("invalid {}: {err}", abs_path.display())))
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
