//! Credential storage for the FinTrack client.
//!
//! The executor reads the current bearer token from a [`CredentialStore`]
//! on every attempt. Storage is pure: no network access and no persistence.
//! Durable stores (keychain, browser storage) implement the trait outside
//! this crate.

use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::fmt;

/// A bearer token, or its absence.
#[derive(Clone, Default)]
pub enum Credential {
    /// No token is stored; requests go out unauthenticated.
    #[default]
    Absent,
    /// A bearer token.
    Bearer(SecretString),
}

impl Credential {
    /// Creates a bearer credential. A blank token yields [`Credential::Absent`].
    pub fn bearer(token: impl Into<String>) -> Self {
        let token = token.into();
        if token.trim().is_empty() {
            Credential::Absent
        } else {
            Credential::Bearer(SecretString::new(token))
        }
    }

    /// Returns true if a token is present.
    pub fn is_present(&self) -> bool {
        matches!(self, Credential::Bearer(_))
    }

    /// Returns the raw token.
    pub fn expose(&self) -> Option<&str> {
        match self {
            Credential::Absent => None,
            Credential::Bearer(token) => Some(token.expose_secret().as_str()),
        }
    }

    /// Gets a hint of the token for debugging (last 4 characters).
    pub fn hint(&self) -> Option<String> {
        self.expose().map(|token| {
            let chars: Vec<char> = token.chars().collect();
            if chars.len() > 4 {
                format!("...{}", chars[chars.len() - 4..].iter().collect::<String>())
            } else {
                "****".to_string()
            }
        })
    }

    /// Apply the credential to request headers. Absent credentials add nothing.
    pub fn apply_auth(&self, headers: &mut HashMap<String, String>) {
        if let Some(token) = self.expose() {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for Credential {}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Absent => f.write_str("Absent"),
            Credential::Bearer(_) => f
                .debug_struct("Bearer")
                .field("token", &"[REDACTED]")
                .field("hint", &self.hint())
                .finish(),
        }
    }
}

/// Holds the current credential.
///
/// `get` must return immediately and never fail. Implementations must be
/// safe to read from many concurrent requests.
pub trait CredentialStore: Send + Sync {
    /// Returns the current credential.
    fn get(&self) -> Credential;

    /// Replaces the current credential.
    fn set(&self, credential: Credential);

    /// Removes the current credential.
    fn clear(&self) {
        self.set(Credential::Absent);
    }
}

/// Process-local credential store.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    credential: RwLock<Credential>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `credential`.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: RwLock::new(credential),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self) -> Credential {
        self.credential.read().clone()
    }

    fn set(&self, credential: Credential) {
        tracing::debug!(present = credential.is_present(), "Credential updated");
        *self.credential.write() = credential;
    }
}

impl fmt::Debug for InMemoryCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryCredentialStore")
            .field("credential", &*self.credential.read())
            .finish()
    }
}
