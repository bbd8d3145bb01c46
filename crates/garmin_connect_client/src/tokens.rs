//! OAuth token files kept between runs.
//!
//! The directory layout matches the one written by the Python `garth`
//! library (`oauth1_token.json` + `oauth2_token.json`), so an existing cache
//! from that tool keeps working.

use crate::GarminError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const OAUTH1_FILE: &str = "oauth1_token.json";
pub const OAUTH2_FILE: &str = "oauth2_token.json";

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuth1Token {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    #[serde(default)]
    pub mfa_token: Option<String>,
    #[serde(default)]
    pub mfa_expiration_timestamp: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuth2Token {
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub jti: String,
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: i64,
    #[serde(default)]
    pub refresh_token_expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token_expires_at: Option<i64>,
}

impl OAuth2Token {
    /// Fill the absolute expiry timestamps from the relative ones, as the
    /// exchange endpoint only returns `expires_in`.
    pub fn stamped(mut self, now: i64) -> Self {
        if self.expires_at == 0 {
            self.expires_at = now + self.expires_in;
        }
        if self.refresh_token_expires_at.is_none() {
            self.refresh_token_expires_at = self.refresh_token_expires_in.map(|secs| now + secs);
        }
        self
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

// Tokens are credentials; keep them out of debug output.
impl std::fmt::Debug for OAuth1Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth1Token").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for OAuth2Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Token")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct TokenSet {
    pub oauth1: Option<OAuth1Token>,
    pub oauth2: OAuth2Token,
}

/// Read the cached tokens. The OAuth2 file is required; the OAuth1 file is
/// only needed to mint a new OAuth2 token once the current one expires.
pub async fn load(dir: &Path) -> Result<TokenSet, GarminError> {
    let oauth2_raw = tokio::fs::read(dir.join(OAUTH2_FILE)).await?;
    let oauth2: OAuth2Token = serde_json::from_slice(&oauth2_raw)?;
    let oauth1 = match tokio::fs::read(dir.join(OAUTH1_FILE)).await {
        Ok(raw) => Some(serde_json::from_slice(&raw)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };
    Ok(TokenSet { oauth1, oauth2 })
}

pub async fn save(dir: &Path, tokens: &TokenSet) -> Result<(), GarminError> {
    tokio::fs::create_dir_all(dir).await?;
    if let Some(oauth1) = &tokens.oauth1 {
        tokio::fs::write(dir.join(OAUTH1_FILE), serde_json::to_vec_pretty(oauth1)?).await?;
    }
    tokio::fs::write(
        dir.join(OAUTH2_FILE),
        serde_json::to_vec_pretty(&tokens.oauth2)?,
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oauth2(expires_in: i64) -> OAuth2Token {
        OAuth2Token {
            scope: "CONNECT_READ".into(),
            jti: "jti".into(),
            token_type: "Bearer".into(),
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_in,
            expires_at: 0,
            refresh_token_expires_in: Some(7200),
            refresh_token_expires_at: None,
        }
    }

    #[test]
    fn stamped_sets_absolute_expiry_once() {
        let token = oauth2(3600).stamped(1_000);
        assert_eq!(token.expires_at, 4_600);
        assert_eq!(token.refresh_token_expires_at, Some(8_200));
        assert!(!token.is_expired_at(4_599));
        assert!(token.is_expired_at(4_600));
        assert_eq!(token.stamped(9_999).expires_at, 4_600);
    }

    #[test]
    fn debug_does_not_leak_tokens() {
        let rendered = format!("{:?}", oauth2(1));
        assert!(!rendered.contains("access"));
    }

    #[tokio::test]
    async fn save_then_load_without_oauth1() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = dir.path().join("tokens");
        let set = TokenSet {
            oauth1: None,
            oauth2: oauth2(60).stamped(10),
        };
        save(&store, &set).await.expect("save");
        assert!(!store.join(OAUTH1_FILE).exists());
        let loaded = load(&store).await.expect("load");
        assert!(loaded.oauth1.is_none());
        assert_eq!(loaded.oauth2.expires_at, 70);
    }

    #[tokio::test]
    async fn load_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let res = load(&dir.path().join("absent")).await;
        assert!(matches!(res, Err(GarminError::Io(_))));
    }

    #[tokio::test]
    async fn load_reads_garth_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(OAUTH1_FILE),
            r#"{"oauth_token": "t", "oauth_token_secret": "s", "mfa_token": null, "mfa_expiration_timestamp": null, "domain": "garmin.com"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join(OAUTH2_FILE),
            r#"{"scope": "x", "jti": "j", "token_type": "Bearer", "access_token": "a", "refresh_token": "r", "expires_in": 3600, "expires_at": 1700000000, "refresh_token_expires_in": 7200, "refresh_token_expires_at": 1700003600}"#,
        )
        .unwrap();
        let loaded = load(dir.path()).await.expect("load");
        assert_eq!(loaded.oauth1.expect("oauth1").oauth_token, "t");
        assert_eq!(loaded.oauth2.expires_at, 1_700_000_000);
    }
}
