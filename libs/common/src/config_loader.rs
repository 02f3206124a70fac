//! Configuration loading helper functions
//!
//! Layering, lowest to highest priority:
//! 1. Serialized defaults of the config type
//! 2. Config file (format chosen by extension)
//! 3. Prefixed environment variables (`__` separates nested keys)

use errors::{config_error, VoltageError, VoltageResult};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Build the layered figment for `T`
///
/// Exposed separately so callers can add providers before extracting.
pub fn figment_for<T>(path: Option<&Path>, env_prefix: &str) -> VoltageResult<Figment>
where
    T: Serialize + Default,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));

    if let Some(path) = path {
        if !path.exists() {
            return Err(VoltageError::MissingConfig(format!(
                "config file {}",
                path.display()
            )));
        }
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| config_error!("Config file must have an extension"))?;

        figment = match extension {
            "toml" => figment.merge(Toml::file(path)),
            "yaml" | "yml" => figment.merge(Yaml::file(path)),
            "json" => figment.merge(Json::file(path)),
            other => {
                return Err(VoltageError::InvalidConfig {
                    field: "config_file".to_string(),
                    reason: format!("unsupported extension '{}'", other),
                })
            },
        };
        debug!("Config file: {}", path.display());
    }

    Ok(figment.merge(Env::prefixed(env_prefix).split("__")))
}

/// Load configuration with priority: ENV > file > defaults
pub fn load_config<T>(path: Option<&Path>, env_prefix: &str) -> VoltageResult<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Default,
{
    let config = figment_for::<T>(path, env_prefix)?.extract()?;
    info!(
        "Configuration loaded (file: {}, env prefix: {})",
        path.map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string()),
        env_prefix
    );
    Ok(config)
}
