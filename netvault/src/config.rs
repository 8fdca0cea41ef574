//! Shared device credentials.

use secrecy::{ExposeSecret, SecretString};

/// Environment variable holding the device login name.
pub const USER_ENV: &str = "DEVICE_BACKUP_USER";

/// Environment variable holding the device login password.
pub const PASSWORD_ENV: &str = "DEVICE_BACKUP_PASSWORD";

/// The single username/password pair used to log in to every device.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Whether a non-empty password is set.
    pub fn has_password(&self) -> bool {
        !self.password.expose_secret().is_empty()
    }
}
