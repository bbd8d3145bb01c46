//! Session setup: cached tokens first, credentials as the single fallback.

use garmin_connect_client::{Credentials, GarminClient, Login};
use secrecy::SecretString;
use std::path::Path;
use tracing::{error, info, warn};

use crate::error::{BackupError, BackupResult};

/// Source for credentials that were not given on the command line or in the
/// environment.
pub trait CredentialPrompt {
    fn username(&self) -> BackupResult<String>;
    fn password(&self, username: &str) -> BackupResult<SecretString>;
}

/// Asks on the terminal.
pub struct TerminalPrompt;

impl CredentialPrompt for TerminalPrompt {
    fn username(&self) -> BackupResult<String> {
        inquire::Text::new("Garmin Connect username:")
            .prompt()
            .map_err(|e| BackupError::Prompt(e.to_string()))
    }

    fn password(&self, username: &str) -> BackupResult<SecretString> {
        inquire::Password::new(&format!("Password for {username}:"))
            .without_confirmation()
            .prompt()
            .map(SecretString::from)
            .map_err(|e| BackupError::Prompt(e.to_string()))
    }
}

/// Log `client` in.
///
/// The token store is tried first. Any failure there (missing files, expired
/// or revoked tokens, network trouble) leads to exactly one credential login,
/// asking `prompt` for whatever part of the credentials is missing. On success
/// the session is written back to the token store; failing to write it is
/// only a warning.
pub async fn init_api(
    client: &dyn GarminClient,
    token_store: &Path,
    username: Option<String>,
    password: Option<SecretString>,
    prompt: &dyn CredentialPrompt,
) -> BackupResult<()> {
    match client.login(Login::TokenStore(token_store)).await {
        Ok(()) => {
            info!(token_store = %token_store.display(), "resumed saved session");
        }
        Err(e) => {
            info!(
                token_store = %token_store.display(),
                "no usable saved session ({e}); logging in with credentials"
            );
            let username = match username.filter(|u| !u.trim().is_empty()) {
                Some(u) => u,
                None => prompt.username()?,
            };
            let password = match password {
                Some(p) => p,
                None => prompt.password(&username)?,
            };
            let credentials = Credentials::new(username, password);
            if let Err(e) = client.login(Login::Credentials(&credentials)).await {
                error!(username = %credentials.username, "login failed: {e}");
                return Err(BackupError::LoginFailed(e));
            }
        }
    }

    if let Err(e) = client.save_session(token_store).await {
        warn!(
            token_store = %token_store.display(),
            "could not save session tokens: {e}"
        );
    }
    Ok(())
}
