//! Backend selection and options loaded from file and environment

use std::fmt;
use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::HttpError;
use crate::options::Options;

/// Prefix of environment overrides, e.g. `HTTP_TRANSPORT_OPTIONS__RETRY_COUNT=2`
pub const ENV_PREFIX: &str = "HTTP_TRANSPORT";

/// HTTP engine behind a [`Client`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// reqwest blocking client
    #[default]
    Reqwest,
    /// ureq agent
    Ureq,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Reqwest => f.write_str("reqwest"),
            Backend::Ureq => f.write_str("ureq"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reqwest" => Ok(Backend::Reqwest),
            "ureq" => Ok(Backend::Ureq),
            _ => Err(format!("Unknown HTTP backend: {}", s)),
        }
    }
}

/// Client settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Engine to build
    pub backend: Backend,
    /// Default options of the built client
    pub options: Options,
}

impl Settings {
    /// Load settings: defaults, then the TOML file if given, then
    /// `HTTP_TRANSPORT_*` environment variables (`__` separates nested keys)
    pub fn load(config_file: Option<&Path>) -> Result<Self, HttpError> {
        Self::load_with_env(config_file, environment())
    }

    fn load_with_env(config_file: Option<&Path>, env: Environment) -> Result<Self, HttpError> {
        let mut builder = Config::builder()
            // use defaults
            .add_source(Config::try_from(&Settings::default())?);

        if let Some(path) = config_file {
            // override with file contents
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        let config = builder.add_source(env).build()?;
        let settings: Settings = config.try_deserialize()?;

        tracing::debug!("Loaded HTTP settings for {} backend", settings.backend);

        Ok(settings)
    }

    /// Build a client for the configured backend
    pub fn build_client(&self) -> Result<Box<dyn Client>, HttpError> {
        match self.backend {
            #[cfg(feature = "reqwest")]
            Backend::Reqwest => Ok(Box::new(crate::ReqwestClient::with_options(
                self.options.clone(),
            )?)),
            #[cfg(feature = "ureq")]
            Backend::Ureq => Ok(Box::new(crate::UreqClient::with_options(
                self.options.clone(),
            )?)),
            #[allow(unreachable_patterns)]
            backend => Err(HttpError::Build(format!(
                "Backend `{}` is not enabled in this build",
                backend
            ))),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
