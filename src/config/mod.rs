// ABOUTME: Configuration types and parsing for consign.yml.
// ABOUTME: Handles YAML parsing, file discovery, and env var references for secrets.

mod collaborators;
mod env_value;
mod init;
mod server;

pub use collaborators::{
    ClientCredentials, CustodyConfig, CustodyEndpoints, RegistryConfig, SigningConfig,
};
pub use env_value::EnvValue;
pub use init::init_config;
pub use server::{DEFAULT_DATABASE_URL, DEFAULT_LISTEN, DatabaseConfig, ServerConfig};

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "consign.yml";
pub const CONFIG_FILENAME_ALT: &str = "consign.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".consign/config.yml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Upper bound on any single collaborator call.
    #[serde(default = "default_call_timeout", with = "humantime_serde")]
    pub call_timeout: Duration,

    pub custody: CustodyConfig,

    pub signing: SigningConfig,

    pub registry: RegistryConfig,
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if self.call_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "call_timeout must be greater than zero".to_string(),
            ));
        }

        for (section, url) in [
            ("custody", &self.custody.base_url),
            ("signing", &self.signing.base_url),
            ("registry", &self.registry.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::InvalidConfig(format!(
                    "{section}.base_url must be an http(s) URL, got '{url}'"
                )));
            }
        }

        Ok(())
    }

    pub fn template() -> Self {
        Config {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            call_timeout: default_call_timeout(),
            custody: CustodyConfig {
                base_url: "https://custody.example.com".to_string(),
                client_id: EnvValue::FromEnv {
                    var: "CONSIGN_CLIENT_ID".to_string(),
                    default: None,
                },
                client_secret: EnvValue::FromEnv {
                    var: "CONSIGN_CLIENT_SECRET".to_string(),
                    default: None,
                },
                endpoints: CustodyEndpoints::default(),
            },
            signing: SigningConfig {
                base_url: "https://signer.example.com".to_string(),
                sign_endpoint: "/api/sign".to_string(),
            },
            registry: RegistryConfig {
                base_url: "https://registry.example.com".to_string(),
                register_endpoint: "/api/tokens/register".to_string(),
            },
        }
    }
}
