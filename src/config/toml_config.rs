use crate::domain::model::MirrorTarget;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: Option<AuthConfig>,
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub targets: Vec<MirrorTarget>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub probe_url: Option<String>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    /// Literal token or path to a file holding it.
    pub api_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    pub output_path: String,
    pub concurrent_requests: Option<usize>,
    #[serde(default)]
    pub skip_folders: Vec<String>,
}

impl TomlConfig {
    /// Reads and parses a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| MirrorError::Config {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MirrorError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Keeps only the named targets, in the order they appear in the file.
    pub fn retain_targets(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }

        if let Some(unknown) = names
            .iter()
            .find(|name| !self.targets.iter().any(|t| &t.name == *name))
        {
            return Err(MirrorError::InvalidConfigValue {
                field: "only".to_string(),
                value: unknown.clone(),
                reason: format!(
                    "No such target. Known targets: {}",
                    self.target_names().join(", ")
                ),
            });
        }

        self.targets.retain(|t| names.contains(&t.name));
        Ok(())
    }

    pub fn target_names(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.name.as_str()).collect()
    }
}

impl ConfigProvider for TomlConfig {
    fn targets(&self) -> Vec<MirrorTarget> {
        self.targets.clone()
    }

    fn output_path(&self) -> &str {
        &self.mirror.output_path
    }

    fn concurrent_requests(&self) -> Option<usize> {
        self.mirror.concurrent_requests
    }

    fn skip_folders(&self) -> &[String] {
        &self.mirror.skip_folders
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.server
                .request_timeout_seconds
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        )
    }

    fn probe_url(&self) -> Option<&str> {
        self.server.probe_url.as_deref()
    }

    fn username(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.username.as_str())
    }

    fn api_token(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.api_token.as_str())
    }
}
