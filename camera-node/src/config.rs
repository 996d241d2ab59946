use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::error::{CameraError, Result};

pub const DEFAULT_HTTPS: bool = false;
pub const DEFAULT_CHANNEL: u8 = 0;
pub const ENV_PREFIX: &str = "REOLINK";

const STRING_ATTRIBUTES: [&str; 3] = ["host", "username", "password"];

/// Raw attribute bag as the framework hands it over. Every field is optional
/// here so that a missing required field is reported by validation rather
/// than by the deserializer.
#[derive(Debug, Deserialize, Validate, Default)]
pub struct ReolinkAttributes {
    #[validate(required(message = "'host' is required"), length(min = 1, message = "'host' must not be empty"))]
    pub host: Option<String>,

    #[validate(required(message = "'username' is required"))]
    pub username: Option<String>,

    #[validate(required(message = "'password' is required"))]
    pub password: Option<String>,

    pub https: Option<bool>,

    pub debug: Option<bool>,

    pub channel: Option<u8>,
}

impl ReolinkAttributes {
    pub fn from_map(attributes: &Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(attributes.clone()))
            .map_err(|e| CameraError::InvalidConfig(e.to_string()))
    }
}

/// Validated configuration for one device session.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ReolinkConfig {
    pub host: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub https: bool,
    pub debug: bool,
    pub channel: u8,
}

impl ReolinkConfig {
    pub fn from_attributes(attributes: &Map<String, Value>) -> Result<Self> {
        let raw = ReolinkAttributes::from_map(attributes)?;
        raw.validate()?;

        match (raw.host, raw.username, raw.password) {
            (Some(host), Some(username), Some(password)) => Ok(Self {
                host,
                username,
                password,
                https: raw.https.unwrap_or(DEFAULT_HTTPS),
                debug: raw.debug.unwrap_or(false),
                channel: raw.channel.unwrap_or(DEFAULT_CHANNEL),
            }),
            _ => Err(CameraError::InvalidConfig(
                "Missing required fields in config: 'host', 'username', and 'password' are required"
                    .to_string(),
            )),
        }
    }

    pub fn scheme(&self) -> &'static str {
        if self.https {
            "https"
        } else {
            "http"
        }
    }
}

/// Settings file consumed by the command-line harness.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NodeConfig {
    #[serde(default = "default_node_name")]
    pub name: String,
    pub attributes: Map<String, Value>,
}

impl NodeConfig {
    /// Reads the settings file at `path`, then applies environment overrides
    /// such as `REOLINK_ATTRIBUTES__HTTPS=true` (prefix, `_`, then nested keys
    /// joined with `__`).
    pub fn load(path: &str, env_prefix: &str) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path))
            .add_source(
                ::config::Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("loading {}", path))?;

        let mut node: NodeConfig = settings
            .try_deserialize()
            .with_context(|| format!("parsing {}", path))?;

        // Overrides like REOLINK_ATTRIBUTES__PASSWORD=1234 parse as numbers
        for key in STRING_ATTRIBUTES {
            if let Some(value) = node.attributes.get_mut(key) {
                if matches!(value, Value::Number(_) | Value::Bool(_)) {
                    *value = Value::String(value.to_string());
                }
            }
        }

        Ok(node)
    }
}

fn default_node_name() -> String {
    "reolink".to_string()
}
