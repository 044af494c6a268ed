//! Bearer credential providers.
//!
//! The HTTP backend is handed a `CredentialProvider` at construction and asks
//! it for a token on every request. When the backend sees 401/403 it calls
//! `invalidate` with the token that was rejected, which is the only way a
//! fetch reaches outside the list controller.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretBox};

/// A bearer token that is redacted when formatted.
pub type Token = SecretBox<String>;

pub fn token_from(value: impl Into<String>) -> Token {
    SecretBox::new(Box::new(value.into()))
}

pub trait CredentialProvider: Send + Sync {
    /// The token to attach to the next request, if any.
    fn token(&self) -> Option<Token>;

    /// Drop the stored token if it is the one the backend rejected.
    ///
    /// `rejected` is the token the failed request carried. A token stored
    /// after that request went out must survive.
    fn invalidate(&self, rejected: Option<&Token>);
}

/// No authentication; requests go out without an `Authorization` header.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn token(&self) -> Option<Token> {
        None
    }

    fn invalidate(&self, _rejected: Option<&Token>) {}
}

/// An in-memory token slot, replaceable after re-authentication.
#[derive(Default)]
pub struct MemoryCredentials {
    token: RwLock<Option<Token>>,
    invalidations: AtomicUsize,
}

impl MemoryCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.is_empty()).map(token_from)),
            invalidations: AtomicUsize::new(0),
        }
    }

    /// Store a fresh token, e.g. after the user logs in again.
    pub fn set(&self, token: impl Into<String>) {
        *self.token.write() = Some(token_from(token));
    }

    pub fn is_present(&self) -> bool {
        self.token.read().is_some()
    }

    /// How many times a stored token has been cleared.
    pub fn invalidation_count(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for MemoryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCredentials")
            .field("token", &self.is_present().then_some("[REDACTED]"))
            .field("invalidations", &self.invalidation_count())
            .finish()
    }
}

impl CredentialProvider for MemoryCredentials {
    fn token(&self) -> Option<Token> {
        self.token
            .read()
            .as_ref()
            .map(|t| token_from(t.expose_secret().clone()))
    }

    fn invalidate(&self, rejected: Option<&Token>) {
        let mut stored = self.token.write();
        let matches = match (stored.as_ref(), rejected) {
            (Some(current), Some(rejected)) => current.expose_secret() == rejected.expose_secret(),
            _ => false,
        };
        if !matches {
            tracing::debug!("rejected credential already replaced, keeping stored token");
            return;
        }
        *stored = None;
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        tracing::warn!("stored credential rejected by backend, cleared");
    }
}
