//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI argument → environment variables → working
//! directory → XDG paths → defaults.

use std::path::{Path, PathBuf};

/// Where a configuration file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in the current working directory.
    WorkingDir,

    /// Found in XDG config directory.
    XdgConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::WorkingDir => write!(f, "working directory"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "DIMORPH_CONFIG";
pub const ENV_CONFIG_DIR: &str = "DIMORPH_CONFIG_DIR";

/// Standard config file name.
pub const CONFIG_FILENAME: &str = "dimorph.toml";

/// Application name for XDG directories.
const APP_NAME: &str = "dimorph";

/// Resolve the configuration file path.
///
/// An explicit CLI path is returned even when it does not exist so that
/// loading reports it instead of silently falling back to defaults.
///
/// Resolution order:
/// 1. Explicit CLI path
/// 2. `DIMORPH_CONFIG`
/// 3. `DIMORPH_CONFIG_DIR` + `dimorph.toml`
/// 4. `./dimorph.toml`
/// 5. XDG config directory (`~/.config/dimorph/dimorph.toml`)
/// 6. Built-in defaults (None)
pub fn resolve_config_path(cli_path: Option<&Path>) -> (Option<PathBuf>, ConfigSource) {
    if let Some(path) = cli_path {
        return (Some(path.to_path_buf()), ConfigSource::CliArgument);
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return (Some(path), ConfigSource::Environment);
        }
    }

    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(CONFIG_FILENAME);
        if path.exists() {
            return (Some(path), ConfigSource::Environment);
        }
    }

    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return (Some(local), ConfigSource::WorkingDir);
    }

    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(CONFIG_FILENAME);
        if path.exists() {
            return (Some(path), ConfigSource::XdgConfig);
        }
    }

    (None, ConfigSource::BuiltinDefault)
}

/// Get the XDG config directory for dimorph.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}
