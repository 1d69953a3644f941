//! Where the config file lives, and writing the first one.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use callstream_common::ConfigError;
use tracing::{debug, info};

use super::template::default_config_toml;

const APP_DIR: &str = "callstream";
const CONFIG_FILE: &str = "config.toml";

/// `<platform config dir>/callstream/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(config_dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Write the commented default config to `path`.
///
/// An existing file is never overwritten; if one appears between the
/// caller's existence check and this write, it is left as is.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let io_error = |path: &Path, source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!("config already exists at {}, keeping it", path.display());
            return Ok(());
        }
        Err(e) => return Err(io_error(path, e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(|e| io_error(path, e))?;

    info!("created default config at {}", path.display());
    Ok(())
}
