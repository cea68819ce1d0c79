use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::AuthError;

/// On-disk form of the token file
#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenFile {
    token: Option<String>,
}

/// The dashboard's single session token
///
/// This is the only place the token lives. It is loaded from the token file
/// at startup, written through to it on login and logout, and published on a
/// watch channel for anyone that needs to react to sign-in state. Route
/// guards compare the token the browser presents against [`AuthGate::token`].
///
/// Credentials are not verified: any non-empty username and password sign in.
pub struct AuthGate {
    storage: Option<PathBuf>,
    token: watch::Sender<Option<String>>,
}

impl AuthGate {
    /// Gate persisted to `path`; a missing or unreadable file starts signed out
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let token = match read_token(&path) {
            Ok(token) => token,
            Err(e) => {
                log::warn!("Ignoring token file {}: {}", path.display(), e);
                None
            }
        };
        if token.is_some() {
            log::info!("Restored session token from {}", path.display());
        }
        let (sender, _) = watch::channel(token);
        AuthGate {
            storage: Some(path),
            token: sender,
        }
    }

    /// Gate without persistence
    pub fn in_memory() -> Self {
        let (sender, _) = watch::channel(None);
        AuthGate {
            storage: None,
            token: sender,
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.borrow().is_some()
    }

    /// Whether a token presented by a client matches the current one
    pub fn is_authorized(&self, presented: Option<&str>) -> bool {
        match (self.token.borrow().as_deref(), presented) {
            (Some(current), Some(presented)) => current == presented,
            _ => false,
        }
    }

    /// Sign in with any non-empty username and password
    ///
    /// # Returns
    /// * `Ok(token)` - The freshly issued token
    ///
    /// # Errors
    /// * `AuthError::MissingCredentials` if either field is blank
    pub fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let token = Uuid::new_v4().to_string();
        self.set(Some(token.clone()));
        log::info!("User {} signed in", username.trim());
        Ok(token)
    }

    pub fn logout(&self) {
        self.set(None);
        log::info!("Signed out");
    }

    /// Follow sign-in state changes
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.token.subscribe()
    }

    fn set(&self, token: Option<String>) {
        if let Some(path) = &self.storage {
            // The in-memory value stays authoritative if the disk write fails
            if let Err(e) = write_token(path, token.as_deref()) {
                log::error!("Failed to persist token to {}: {}", path.display(), e);
            }
        }
        self.token.send_replace(token);
    }
}

fn read_token(path: &Path) -> Result<Option<String>, AuthError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    let file: TokenFile = serde_json::from_str(&contents)?;
    Ok(file.token.filter(|token| !token.is_empty()))
}

fn write_token(path: &Path, token: Option<&str>) -> Result<(), AuthError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            create_dir_all(dir)?;
        }
    }
    let file = TokenFile {
        token: token.map(str::to_string),
    };
    fs::write(path, serde_json::to_string_pretty(&file)?)?;
    Ok(())
}
