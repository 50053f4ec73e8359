//! Environment configuration.

use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};

const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 465;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// One account's API key pair.
#[derive(Clone)]
pub struct ApiCredentials {
    pub key: String,
    pub secret: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// SMTP settings for the daily summary.
#[derive(Clone)]
pub struct EmailConfig {
    pub sender: String,
    pub password: String,
    pub receiver: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("sender", &self.sender)
            .field("receiver", &self.receiver)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}

/// Everything read from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub main: ApiCredentials,
    pub sub: ApiCredentials,
    /// Member id of the sub account, used for internal transfers
    pub sub_uid: String,
    /// `None` disables the daily summary email
    pub email: Option<EmailConfig>,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| -> Result<String> {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{name} must be set"))
        };

        let main = ApiCredentials {
            key: required("MAIN_API_KEY")?,
            secret: required("MAIN_API_SECRET")?,
        };
        let sub = ApiCredentials {
            key: required("SUB_API_KEY")?,
            secret: required("SUB_API_SECRET")?,
        };
        let sub_uid = required("SUB_UID")?;

        let email = match (
            lookup("EMAIL_SENDER"),
            lookup("EMAIL_PASSWORD"),
            lookup("EMAIL_RECEIVER"),
        ) {
            (Some(sender), Some(password), Some(receiver)) => {
                let smtp_port = match lookup("SMTP_PORT") {
                    Some(port) => port
                        .parse()
                        .with_context(|| format!("invalid SMTP_PORT: {port}"))?,
                    None => DEFAULT_SMTP_PORT,
                };
                Some(EmailConfig {
                    sender,
                    password,
                    receiver,
                    smtp_host: lookup("SMTP_HOST")
                        .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                    smtp_port,
                })
            }
            _ => None,
        };

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .with_context(|| format!("invalid BIND_ADDR: {bind_addr}"))?;

        Ok(Self {
            main,
            sub,
            sub_uid,
            email,
            bind_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 5] = [
        ("MAIN_API_KEY", "mk"),
        ("MAIN_API_SECRET", "ms"),
        ("SUB_API_KEY", "sk"),
        ("SUB_API_SECRET", "ss"),
        ("SUB_UID", "123456"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(&REQUIRED).unwrap();

        assert_eq!(config.main.key, "mk");
        assert_eq!(config.sub.secret, "ss");
        assert_eq!(config.sub_uid, "123456");
        assert!(config.email.is_none());
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8000");
    }

    #[test]
    fn test_missing_credential_fails() {
        let err = load(&REQUIRED[1..]).unwrap_err();
        assert!(err.to_string().contains("MAIN_API_KEY"));
    }

    #[test]
    fn test_email_needs_all_three() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("EMAIL_SENDER", "bot@example.com"));
        vars.push(("EMAIL_RECEIVER", "me@example.com"));
        assert!(load(&vars).unwrap().email.is_none());

        vars.push(("EMAIL_PASSWORD", "app-password"));
        vars.push(("SMTP_PORT", "587"));
        let email = load(&vars).unwrap().email.unwrap();
        assert_eq!(email.smtp_host, "smtp.gmail.com");
        assert_eq!(email.smtp_port, 587);
    }

    #[test]
    fn test_secrets_are_not_logged() {
        let config = load(&REQUIRED).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("\"ms\""));
        assert!(printed.contains("<redacted>"));
    }
}
