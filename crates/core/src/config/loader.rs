//! Configuration file loader for the `.screenplay-kit/` directory.
//!
//! The client configuration lives in `.screenplay-kit/config.toml` under a
//! root directory. A missing directory or file is not an error: defaults
//! apply. The `SCREENPLAY_API_URL` environment variable overrides `base_url`.

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::ClientConfig;
use std::path::Path;
use url::Url;

/// Environment variable overriding the configured backend URL.
pub const API_URL_ENV: &str = "SCREENPLAY_API_URL";

/// Loads the client configuration.
///
/// # Arguments
///
/// * `root` - Root directory containing the `.screenplay-kit/` folder
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - `config.toml` exists but cannot be read
/// - `config.toml` is not valid TOML
/// - `base_url` is not an http(s) URL or the timeout is zero
///
/// # Example
///
/// ```rust,no_run
/// use sk_core::config::loader::load_config;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("."))?;
/// println!("Talking to {}", config.base_url);
/// # Ok(())
/// # }
/// ```
pub fn load_config(root: &Path) -> ConfigResult<ClientConfig> {
    let env_url = std::env::var(API_URL_ENV).ok();
    load_config_with_override(root, env_url.as_deref())
}

/// Same as [`load_config`], with the URL override passed explicitly.
pub fn load_config_with_override(
    root: &Path,
    base_url_override: Option<&str>,
) -> ConfigResult<ClientConfig> {
    let config_path = root.join(".screenplay-kit").join("config.toml");

    let mut config = if config_path.exists() {
        let content =
            std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
                path: config_path.clone(),
                source,
            })?;

        toml::from_str::<ClientConfig>(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path.clone(),
            source,
        })?
    } else {
        ClientConfig::default()
    };

    let origin = match base_url_override {
        Some(url) if !url.trim().is_empty() => {
            config.base_url = url.trim().to_string();
            API_URL_ENV.to_string()
        }
        _ => config_path.display().to_string(),
    };

    validate(&config, &origin)?;
    tracing::debug!(base_url = %config.base_url, "loaded client config");

    Ok(config)
}

fn validate(config: &ClientConfig, origin: &str) -> ConfigResult<()> {
    let url = Url::parse(&config.base_url).map_err(|e| ConfigError::InvalidConfig {
        origin: origin.to_string(),
        reason: format!("base_url '{}' is not a valid URL: {e}", config.base_url),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidConfig {
            origin: origin.to_string(),
            reason: format!("base_url must use http or https, got '{}'", url.scheme()),
        });
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::InvalidConfig {
            origin: origin.to_string(),
            reason: "request_timeout_secs must be greater than zero".to_string(),
        });
    }

    Ok(())
}
