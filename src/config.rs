use crate::product::{Component, ProductVariant};
use anyhow::Result;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;

const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn default_verify_ssl() -> bool {
    true
}

#[derive(Clone, Deserialize)]
pub struct KerioConfig {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub product: ProductVariant,
    #[serde(default)]
    pub client_mode: bool,
    #[serde(default)]
    pub no_tls: bool,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    /// Replaces `<scheme>://<host>:<port>` when set, e.g. for a local proxy.
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl KerioConfig {
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: password.into(),
            product: ProductVariant::default(),
            client_mode: false,
            no_tls: false,
            verify_ssl: true,
            api_url: None,
            timeout_secs: None,
        }
    }

    pub fn component(&self) -> Component {
        if self.client_mode {
            Component::Client
        } else {
            Component::Admin
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

impl fmt::Debug for KerioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KerioConfig")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("product", &self.product)
            .field("client_mode", &self.client_mode)
            .field("no_tls", &self.no_tls)
            .field("verify_ssl", &self.verify_ssl)
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub kerio: KerioConfig,
}

impl Config {
    /// Load `config.toml` from the working directory.
    pub fn new() -> Result<Self> {
        Self::from_path(CONFIG_FILE)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())?;
        let config = Self::parse(&config_str)?;
        info!("Config: {:?}", config);
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self> {
        Ok(toml::from_str(config_str)?)
    }
}

impl From<KerioConfig> for Config {
    fn from(kerio: KerioConfig) -> Self {
        Self { kerio }
    }
}
