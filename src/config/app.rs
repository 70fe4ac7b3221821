use anyhow::{bail, Result};
use std::env;

use crate::services::SmtpConfig;

pub const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub jwt_secret: String,
    pub smtp: Option<SmtpConfig>,
    pub email_from: String,
    pub media_bucket: Option<String>,
    pub seed_database: bool,
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());

        let smtp = non_empty("SMTP_HOST").map(|host| SmtpConfig {
            host,
            port: env::var("SMTP_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(587),
            username: non_empty("SMTP_USERNAME"),
            password: non_empty("SMTP_PASSWORD"),
        });
        let email_from = env::var("EMAIL_FROM").unwrap_or_else(|_| "Beast Physique <noreply@beastphysique.app>".to_string());

        let media_bucket = non_empty("MEDIA_BUCKET");

        let seed_database = env::var("SEED_DATABASE")
            .map(|value| matches!(value.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(environment == "development");

        let config = AppConfig {
            host,
            port,
            environment,
            log_level,
            jwt_secret,
            smtp,
            email_from,
            media_bucket,
            seed_database,
        };
        config.check()?;

        Ok(config)
    }

    /// Refuses settings that must never reach production.
    pub fn check(&self) -> Result<()> {
        if self.is_production() && self.jwt_secret == DEFAULT_JWT_SECRET {
            bail!("JWT_SECRET must be set in production");
        }
        if self.jwt_secret.len() < 16 && self.is_production() {
            bail!("JWT_SECRET is too short for production");
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn media_enabled(&self) -> bool {
        self.media_bucket.is_some()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(environment: &str, jwt_secret: &str) -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: environment.to_string(),
            log_level: "info".to_string(),
            jwt_secret: jwt_secret.to_string(),
            smtp: None,
            email_from: "noreply@example.com".to_string(),
            media_bucket: None,
            seed_database: false,
        }
    }

    #[test]
    fn test_production_requires_secret() {
        assert!(config("production", DEFAULT_JWT_SECRET).check().is_err());
        assert!(config("production", "short").check().is_err());
        assert!(config("production", "a-long-and-random-production-secret").check().is_ok());
        assert!(config("development", DEFAULT_JWT_SECRET).check().is_ok());
    }

    #[test]
    fn test_server_address() {
        let config = config("development", DEFAULT_JWT_SECRET);
        assert_eq!(config.server_address(), "127.0.0.1:3000");
        assert!(config.is_development());
        assert!(!config.media_enabled());
    }
}
