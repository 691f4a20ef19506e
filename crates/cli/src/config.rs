//! Layered configuration for the `beacon` binary.
//!
//! Precedence, highest first:
//! 1. Command-line flags (applied by `main`)
//! 2. Environment variables prefixed with `BEACON_`, `__` for nesting
//!    (e.g. `BEACON_DISPATCH__MAX_CONCURRENT=8`)
//! 3. TOML file (`--config`, default `beacon.toml`, optional)
//! 4. Defaults

use beacon_core::error::{BeaconError, BeaconResult};
use beacon_core::DispatchConfig;
use beacon_provider::expo::EXPO_PUSH_URL;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "beacon.toml";

const ACCOUNTS_FILE_NAME: &str = "accounts.json";
const CONTACTS_FILE_NAME: &str = "contacts.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    /// Directory holding `accounts.json` and `contacts.json`.
    pub data_dir: PathBuf,
    pub accounts_path: Option<PathBuf>,
    pub contacts_path: Option<PathBuf>,
    pub gateway: GatewayConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub endpoint: String,
    /// Expo access token, only needed with enhanced push security.
    pub access_token: Option<String>,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            accounts_path: None,
            contacts_path: None,
            gateway: GatewayConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: EXPO_PUSH_URL.to_string(),
            access_token: None,
        }
    }
}

impl BeaconConfig {
    pub fn load(path: &Path) -> BeaconResult<Self> {
        Self::figment(path)
            .extract()
            .map_err(|e| BeaconError::Config(e.to_string()))
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("BEACON_").split("__"))
    }

    pub fn validate(&self) -> BeaconResult<()> {
        self.dispatch.validate()?;
        url::Url::parse(&self.gateway.endpoint).map_err(|e| {
            BeaconError::Config(format!("gateway.endpoint {:?}: {e}", self.gateway.endpoint))
        })?;
        Ok(())
    }

    pub fn accounts_path(&self) -> PathBuf {
        self.accounts_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(ACCOUNTS_FILE_NAME))
    }

    pub fn contacts_path(&self) -> PathBuf {
        self.contacts_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(CONTACTS_FILE_NAME))
    }
}
