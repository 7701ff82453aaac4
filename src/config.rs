use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub rig: RigConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Listen address for the control channel
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Largest accepted request frame (bytes)
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
    /// Per-connection progress output
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RigConfig {
    /// Skeleton definition JSON; the built-in figure is used when unset
    #[serde(default)]
    pub skeleton_path: Option<String>,
    /// Anatomical mapping JSON; the standard anatomy is used when unset
    #[serde(default)]
    pub mapping_path: Option<String>,
}

fn default_listen_addr() -> String { "127.0.0.1:9465".to_string() }
fn default_max_frame_len() -> usize { 64 * 1024 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_frame_len: default_max_frame_len(),
            verbose: false,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Missing or unreadable config falls back to defaults; a malformed file
    /// is reported on stderr rather than silently ignored.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Invalid config {}: {e}", path.as_ref().display());
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1:9465");
        assert_eq!(config.server.max_frame_len, 64 * 1024);
        assert!(!config.server.verbose);
        assert!(config.rig.skeleton_path.is_none());
        assert!(config.rig.mapping_path.is_none());
    }

    #[test]
    fn test_parse_partial() {
        let config: Config = toml::from_str(
            r#"
            [server]
            listen_addr = "0.0.0.0:7000"
            verbose = true
            "#,
        )
        .unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:7000");
        assert!(config.server.verbose);
        // untouched fields keep their defaults
        assert_eq!(config.server.max_frame_len, 64 * 1024);
    }

    #[test]
    fn test_parse_rig_paths() {
        let config: Config = toml::from_str(
            r#"
            [rig]
            skeleton_path = "figure.json"
            mapping_path = "anatomy.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.rig.skeleton_path.as_deref(), Some("figure.json"));
        assert_eq!(config.rig.mapping_path.as_deref(), Some("anatomy.json"));
    }
}
