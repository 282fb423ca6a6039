//! Configuration loading from disk, environment, and command line.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `backend.host`.
pub const ENV_BACKEND_HOST: &str = "ORDERENGINE_HOST";
/// Environment variable overriding `backend.port`.
pub const ENV_BACKEND_PORT: &str = "ORDERENGINE_PORT";
/// Environment variable overriding `listener.bind_address`.
pub const ENV_BIND_ADDRESS: &str = "ORDER_GATEWAY_BIND";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, value } => {
                write!(f, "Invalid value '{}' for environment variable {}", value, var)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Values supplied on the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend_host: Option<String>,
    pub backend_port: Option<u16>,
    pub bind_address: Option<String>,
}

impl Overrides {
    fn apply(&self, config: &mut GatewayConfig) {
        if let Some(host) = &self.backend_host {
            config.backend.host = host.clone();
        }
        if let Some(port) = self.backend_port {
            config.backend.port = port;
        }
        if let Some(bind) = &self.bind_address {
            config.listener.bind_address = bind.clone();
        }
    }
}

/// Parse a TOML document into a config, without validation.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

/// Apply environment overrides using `lookup` to resolve variables.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup(ENV_BACKEND_HOST) {
        config.backend.host = host;
    }
    if let Some(port) = lookup(ENV_BACKEND_PORT) {
        config.backend.port = port.trim().parse().map_err(|_| ConfigError::Env {
            var: ENV_BACKEND_PORT,
            value: port.clone(),
        })?;
    }
    if let Some(bind) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = bind;
    }
    Ok(())
}

/// Load, override, and validate configuration.
///
/// Without a path the built-in defaults are the starting point.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            parse_config(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    overrides.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            [backend]
            host = "engine.internal"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.host, "engine.internal");
        assert_eq!(config.backend.port, 50051);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = parse_config("[backend\nport = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn env_overrides_backend_address() {
        let env: HashMap<&str, &str> =
            [(ENV_BACKEND_HOST, "10.0.0.7"), (ENV_BACKEND_PORT, "6000")].into();
        let mut config = GatewayConfig::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.backend.host, "10.0.0.7");
        assert_eq!(config.backend.port, 6000);
    }

    #[test]
    fn env_port_must_be_numeric() {
        let mut config = GatewayConfig::default();
        let err = apply_env_overrides(&mut config, |k| {
            (k == ENV_BACKEND_PORT).then(|| "fifty".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: ENV_BACKEND_PORT, .. }));
    }

    #[test]
    fn command_line_wins() {
        let mut config = GatewayConfig::default();
        config.backend.host = "from-file".into();
        Overrides {
            backend_host: Some("from-cli".into()),
            backend_port: Some(7000),
            bind_address: None,
        }
        .apply(&mut config);
        assert_eq!(config.backend.host, "from-cli");
        assert_eq!(config.backend.port, 7000);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(
            Some(Path::new("/nonexistent/order-gateway.toml")),
            &Overrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
