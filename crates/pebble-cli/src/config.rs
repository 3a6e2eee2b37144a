use pebble_core::Connection;

/// Connection settings, from the environment with command line overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base url of the document server
    pub server: String,
    /// Empty for a guest session
    pub username: String,
    pub password: String,
    /// Display name of the connection node
    pub name: String,
}

/// Values given on the command line; they win over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PEBBLE_SERVER`: server url (required)
    /// - `PEBBLE_USERNAME`, `PEBBLE_PASSWORD`: credentials, guest when unset
    /// - `PEBBLE_CONNECTION_NAME`: display name, defaults to the server url
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Overrides::default())
    }

    pub fn load(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        overrides: Overrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let server = overrides
            .server
            .or_else(|| lookup("PEBBLE_SERVER"))
            .filter(|server| !server.is_empty())
            .ok_or(ConfigError::MissingServer)?;
        let username = overrides
            .username
            .or_else(|| lookup("PEBBLE_USERNAME"))
            .unwrap_or_default();
        let password = overrides
            .password
            .or_else(|| lookup("PEBBLE_PASSWORD"))
            .unwrap_or_default();
        let name = overrides
            .name
            .or_else(|| lookup("PEBBLE_CONNECTION_NAME"))
            .unwrap_or_else(|| server.clone());

        Ok(Self {
            server,
            username,
            password,
            name,
        })
    }

    pub fn connection(&self) -> Connection {
        Connection::new(&self.name, &self.server, &self.username, &self.password)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No server given: set PEBBLE_SERVER or pass --server")]
    MissingServer,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_reads_environment() {
        let config = Config::from_lookup(
            Overrides::default(),
            env(&[
                ("PEBBLE_SERVER", "http://localhost:8080"),
                ("PEBBLE_USERNAME", "admin"),
            ]),
        )
        .unwrap();
        assert_eq!(config.server, "http://localhost:8080");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "");
        assert_eq!(config.name, "http://localhost:8080");
    }

    #[test]
    fn test_overrides_win() {
        let overrides = Overrides {
            server: Some("http://other".to_string()),
            name: Some("other".to_string()),
            ..Overrides::default()
        };
        let config =
            Config::from_lookup(overrides, env(&[("PEBBLE_SERVER", "http://localhost:8080")])).unwrap();
        assert_eq!(config.server, "http://other");
        assert_eq!(config.connection().name, "other");
        assert!(config.connection().is_guest());
    }

    #[test]
    fn test_missing_server() {
        let err = Config::from_lookup(Overrides::default(), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingServer));
    }
}
