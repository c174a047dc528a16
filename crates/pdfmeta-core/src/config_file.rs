use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub server: Option<ServerConfig>,
    pub sync: Option<SyncConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: Option<String>,
    pub token: Option<String>,
    pub auth_scheme: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// `merge` or `replace`.
    pub tag_policy: Option<String>,
    pub check_connection: Option<bool>,
}

/// Platform config directory path: `<config_dir>/pdfmeta/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pdfmeta").join("config.toml"))
}

/// Load config by cascading CWD `.pdfmeta.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".pdfmeta.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_server = base.server.unwrap_or_default();
    let overlay_server = overlay.server.unwrap_or_default();
    let base_sync = base.sync.unwrap_or_default();
    let overlay_sync = overlay.sync.unwrap_or_default();

    ConfigFile {
        server: Some(ServerConfig {
            url: overlay_server.url.or(base_server.url),
            token: overlay_server.token.or(base_server.token),
            auth_scheme: overlay_server.auth_scheme.or(base_server.auth_scheme),
            timeout_secs: overlay_server.timeout_secs.or(base_server.timeout_secs),
        }),
        sync: Some(SyncConfig {
            tag_policy: overlay_sync.tag_policy.or(base_sync.tag_policy),
            check_connection: overlay_sync.check_connection.or(base_sync.check_connection),
        }),
    }
}
