//! Configuration management for Warden.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use aegis_common::AegisError;
use aegis_common::constants::{
    DEFAULT_ACTION, DEFAULT_LISTEN_ADDR, DEFAULT_PROVIDER_ENDPOINT,
    DEFAULT_PROVIDER_TIMEOUT_SECS, DEFAULT_REFRESH_INTERVAL_SECS, MAX_REFRESH_INTERVAL_SECS,
    MIN_REFRESH_INTERVAL_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// This instance's unique ID (auto-generated if not set)
    #[serde(default = "generate_instance_id")]
    pub instance_id: String,

    /// Token provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// reCAPTCHA widget configuration
    #[serde(default)]
    pub recaptcha: RecaptchaConfig,
}

/// Token provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Token issuance endpoint URL
    #[serde(default = "default_provider_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_provider_endpoint(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

/// reCAPTCHA-specific configuration.
///
/// Immutable once the daemon is running. The site key may be empty at
/// load time (it is host-supplied); an empty key fails the individual
/// execution instead.
#[derive(Debug, Clone, Deserialize)]
pub struct RecaptchaConfig {
    /// Site key from the reCAPTCHA admin console
    #[serde(default)]
    pub site_key: String,

    /// Action name attached to token requests
    #[serde(default = "default_action")]
    pub action: String,

    /// Renew the token before it expires
    #[serde(default = "default_auto_refresh")]
    pub auto_refresh: bool,

    /// Renewal interval in seconds; tokens expire after 2 minutes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Gate executions behind the validation formula
    #[serde(default)]
    pub custom_validation: bool,

    /// Validation formula, evaluated against the bound field value
    #[serde(default)]
    pub validation_expression: Option<String>,

    /// Expose the /debug/events endpoint
    #[serde(default)]
    pub show_debug_info: bool,
}

impl Default for RecaptchaConfig {
    fn default() -> Self {
        Self {
            site_key: String::new(),
            action: default_action(),
            auto_refresh: default_auto_refresh(),
            refresh_interval_secs: default_refresh_interval(),
            custom_validation: false,
            validation_expression: None,
            show_debug_info: false,
        }
    }
}

impl RecaptchaConfig {
    /// Reject invalid combinations at load time
    pub fn validate(&self) -> Result<(), AegisError> {
        if !(MIN_REFRESH_INTERVAL_SECS..=MAX_REFRESH_INTERVAL_SECS)
            .contains(&self.refresh_interval_secs)
        {
            return Err(AegisError::Config(format!(
                "refresh_interval_secs must be within [{}, {}], got {}",
                MIN_REFRESH_INTERVAL_SECS, MAX_REFRESH_INTERVAL_SECS, self.refresh_interval_secs
            )));
        }

        if self.custom_validation
            && self
                .validation_expression
                .as_deref()
                .is_none_or(|expr| expr.trim().is_empty())
        {
            return Err(AegisError::Config(
                "custom_validation requires a validation_expression".to_string(),
            ));
        }

        Ok(())
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), AegisError> {
        if self.endpoint.trim().is_empty() {
            return Err(AegisError::Config(
                "provider endpoint must not be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(AegisError::Config(
                "provider timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// Default value functions
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_provider_endpoint() -> String { DEFAULT_PROVIDER_ENDPOINT.to_string() }
fn default_provider_timeout() -> u64 { DEFAULT_PROVIDER_TIMEOUT_SECS }
fn default_action() -> String { DEFAULT_ACTION.to_string() }
fn default_auto_refresh() -> bool { true }
fn default_refresh_interval() -> u64 { DEFAULT_REFRESH_INTERVAL_SECS }

fn generate_instance_id() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    format!("warden-{:08x}", rng.random::<u32>())
}

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(ref endpoint) = args.provider_endpoint {
            config.provider.endpoint = endpoint.clone();
        }
        if let Some(ref site_key) = args.site_key {
            config.recaptcha.site_key = site_key.clone();
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate the full configuration
    pub fn validate(&self) -> Result<()> {
        self.provider.validate()?;
        self.recaptcha.validate()?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            instance_id: generate_instance_id(),
            provider: ProviderConfig::default(),
            recaptcha: RecaptchaConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recaptcha.action, "homepage");
        assert!(config.recaptcha.auto_refresh);
        assert_eq!(config.recaptcha.refresh_interval_secs, 110);
        assert!(!config.recaptcha.show_debug_info);
    }

    #[test]
    fn test_refresh_interval_bounds() {
        let mut recaptcha = RecaptchaConfig::default();

        recaptcha.refresh_interval_secs = 59;
        assert!(recaptcha.validate().is_err());

        recaptcha.refresh_interval_secs = 111;
        assert!(recaptcha.validate().is_err());

        recaptcha.refresh_interval_secs = 60;
        assert!(recaptcha.validate().is_ok());

        recaptcha.refresh_interval_secs = 110;
        assert!(recaptcha.validate().is_ok());
    }

    #[test]
    fn test_custom_validation_requires_expression() {
        let mut recaptcha = RecaptchaConfig {
            custom_validation: true,
            ..Default::default()
        };
        assert!(recaptcha.validate().is_err());

        recaptcha.validation_expression = Some("   ".to_string());
        assert!(recaptcha.validate().is_err());

        recaptcha.validation_expression = Some("value".to_string());
        assert!(recaptcha.validate().is_ok());
    }

    #[test]
    fn test_provider_endpoint_required() {
        let provider = ProviderConfig {
            endpoint: String::new(),
            ..Default::default()
        };
        assert!(provider.validate().is_err());
    }
}
