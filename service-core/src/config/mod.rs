//! Base settings shared by every service binary. Values come from an
//! optional `configuration.*` file with `APP__*` environment variables
//! layered on top; a local `.env` is honored for development.

use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let settings = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_when_unset() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn explicit_port_is_kept() {
        let cfg: Config = serde_json::from_str(r#"{"port": 3000}"#).unwrap();
        assert_eq!(cfg.port, 3000);
    }
}
