//! Authenticated context and credential material.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of token characters safe to show in logs.
const TOKEN_PREVIEW_LEN: usize = 20;

/// Application credentials for the market-data login.
///
/// Zeroized on drop; `Debug` never prints the secret.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    app_key: String,
    secret_key: String,
    source: String,
}

impl Credentials {
    pub fn new(
        app_key: impl Into<String>,
        secret_key: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            app_key: app_key.into(),
            secret_key: secret_key.into(),
            source: source.into(),
        }
    }

    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// Login source tag (e.g. `WEBAPI`).
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_key", &self.app_key)
            .field("secret_key", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Authenticated session.
///
/// A value object: logging in produces a new `Session` rather than mutating
/// a shared client. Read-only once obtained.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    user_id: String,
}

impl Session {
    /// Session before login. Every retrieval against it fails fast.
    pub fn anonymous() -> Self {
        Self {
            token: String::new(),
            user_id: String::new(),
        }
    }

    /// Session produced by a successful login.
    pub fn authenticated(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// First characters of the token followed by `...`, for logs.
    pub fn token_preview(&self) -> String {
        let prefix: String = self.token.chars().take(TOKEN_PREVIEW_LEN).collect();
        format!("{prefix}...")
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("token", &self.token_preview())
            .finish()
    }
}
