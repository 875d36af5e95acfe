//! Authentication types.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

/// Username and password sent to `/login` and `/register`.
#[derive(Clone, Serialize)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Account password.
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
}

impl Credentials {
    /// Creates a credentials payload.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// `/login` response.
#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    /// Signed access token.
    pub token: SecretString,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// `/register` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterResponse {
    /// Confirmation message.
    pub message: String,
}
