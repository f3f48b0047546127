use crate::bangumi::Session;
use crate::bangumi::session;

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Whose collection the shelf shows.
    pub user: String,
    pub endpoint: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Config {
    /// Reads the configuration file, if any, then applies the environment.
    pub async fn load() -> Result<Self, anywho::Error> {
        let mut config = Self::read(&config_path()).await?;

        if let Some(user) = env::var("BANGUMI_USER").ok().filter(|user| !user.is_empty()) {
            config.user = user;
        }

        Ok(config)
    }

    pub fn parse(config: &str) -> Result<Self, anywho::Error> {
        Ok(ron::from_str(config)?)
    }

    pub fn session(&self) -> Result<Session, anywho::Error> {
        Ok(Session::new(
            &self.endpoint,
            &self.user_agent,
            Duration::from_secs(self.timeout_secs),
        )?)
    }

    async fn read(path: &Path) -> Result<Self, anywho::Error> {
        if !fs::try_exists(path).await? {
            log::info!("No configuration found at {}", path.display());

            return Ok(Self::default());
        }

        Self::parse(&fs::read_to_string(path).await?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: "1202652".to_owned(),
            endpoint: session::DEFAULT_ENDPOINT.to_owned(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned(),
            timeout_secs: 10,
        }
    }
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_default()
        .join(env!("CARGO_PKG_NAME"))
        .join("config.ron")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = Config::parse(r#"(user: "sai", timeout_secs: 3)"#).unwrap();

        assert_eq!(config.user, "sai");
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.endpoint, "https://api.bgm.tv");
        assert_eq!(config.user_agent, Config::default().user_agent);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(Config::parse("(user: ").is_err());
    }

    #[tokio::test]
    async fn absent_file_yields_defaults() {
        let directory = tempfile::tempdir().unwrap();

        let config = Config::read(&directory.path().join("config.ron"))
            .await
            .unwrap();

        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn file_is_read_when_present() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("config.ron");
        std::fs::write(&path, r#"(endpoint: "http://localhost:3000")"#).unwrap();

        let config = Config::read(&path).await.unwrap();

        assert_eq!(config.endpoint, "http://localhost:3000");
        assert_eq!(config.user, "1202652");
    }

    #[test]
    fn default_config_builds_a_session() {
        assert!(Config::default().session().is_ok());
    }
}
