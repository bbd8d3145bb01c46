use crate::GarminError;
use secrecy::SecretString;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "https://connectapi.garmin.com";
pub const DEFAULT_SSO_URL: &str = "https://sso.garmin.com";
const TOKEN_STORE_DIR: &str = ".garminconnect";

#[derive(Clone, Debug)]
pub struct Config {
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub token_store: PathBuf,
    pub api_url: String,
    pub sso_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, GarminError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, GarminError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let username = get("GARMIN_USER").filter(|s| !s.is_empty());
        let password = get("GARMIN_PASSWORD")
            .filter(|s| !s.is_empty())
            .map(|p| SecretString::new(p.into()));
        let token_store = get("GARMINTOKENS")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_token_store);
        let api_url = base_url(get("GARMIN_CONNECT_API_URL"), DEFAULT_API_URL)?;
        let sso_url = base_url(get("GARMIN_SSO_URL"), DEFAULT_SSO_URL)?;
        Ok(Self {
            username,
            password,
            token_store,
            api_url,
            sso_url,
        })
    }
}

fn default_token_store() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(TOKEN_STORE_DIR))
        .unwrap_or_else(|| PathBuf::from(TOKEN_STORE_DIR))
}

fn base_url(value: Option<String>, default: &str) -> Result<String, GarminError> {
    let url = value.unwrap_or_else(|| default.to_string());
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(GarminError::Config(format!(
            "base url must start with http:// or https://, got `{url}`"
        )));
    }
    Ok(url.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn from_env_defaults() {
        let cfg = Config::from_env_with(|_| None).expect("cfg");
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.sso_url, DEFAULT_SSO_URL);
        assert!(cfg.token_store.ends_with(".garminconnect"));
        assert!(cfg.username.is_none());
        assert!(cfg.password.is_none());
    }

    #[test]
    fn from_env_reads_values() {
        let get = |k: &str| match k {
            "GARMIN_USER" => Some("runner@example.com".into()),
            "GARMIN_PASSWORD" => Some("sekrit".into()),
            "GARMINTOKENS" => Some("/tmp/tokens".into()),
            "GARMIN_CONNECT_API_URL" => Some("http://localhost:8080/".into()),
            _ => None,
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.token_store, PathBuf::from("/tmp/tokens"));
        assert_eq!(cfg.api_url, "http://localhost:8080");
        assert_eq!(cfg.username.as_deref(), Some("runner@example.com"));
        assert_eq!(
            cfg.password.as_ref().map(|p| p.expose_secret()),
            Some("sekrit")
        );
    }

    #[test]
    fn from_env_rejects_bad_url() {
        let get = |k: &str| match k {
            "GARMIN_SSO_URL" => Some("sso.garmin.com".into()),
            _ => None,
        };
        assert!(matches!(
            Config::from_env_with(get),
            Err(GarminError::Config(_))
        ));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let get = |k: &str| match k {
            "GARMIN_USER" => Some("runner@example.com".into()),
            "GARMIN_PASSWORD" => Some(String::new()),
            "GARMINTOKENS" => Some(String::new()),
            _ => None,
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.username.as_deref(), Some("runner@example.com"));
        assert!(cfg.password.is_none());
        assert!(cfg.token_store.ends_with(".garminconnect"));
    }
}
