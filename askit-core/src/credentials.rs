//! API key storage.
//!
//! Two implementations of the [`CredentialStore`] trait:
//! - `KeyringCredentialStore`: the OS keychain (macOS Keychain, Windows
//!   Credential Manager, Linux Secret Service), service `askit-cli`.
//! - `InMemoryCredentialStore`: in-memory store for testing.

use crate::paths::APP_NAME;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Keychain account holding the provider API key.
pub const API_KEY_ACCOUNT: &str = "api_key";

/// Errors from credential storage operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Credential not found for {service}:{account}")]
    NotFound { service: String, account: String },

    #[error("Failed to store credential: {message}")]
    StoreFailed { message: String },

    #[error("Failed to delete credential: {message}")]
    DeleteFailed { message: String },

    #[error("Keyring backend not available: {message}")]
    BackendUnavailable { message: String },

    #[error(
        "API key not found. Run `askit-cli config` and use `set api_key`, or set the {env_var} environment variable."
    )]
    ApiKeyMissing { env_var: String },
}

/// Trait for credential storage backends.
pub trait CredentialStore: Send + Sync {
    fn store_key(&self, account: &str, secret: &str) -> Result<(), CredentialError>;

    fn get_key(&self, account: &str) -> Result<String, CredentialError>;

    fn delete_key(&self, account: &str) -> Result<(), CredentialError>;

    fn has_key(&self, account: &str) -> bool {
        self.get_key(account).is_ok()
    }
}

/// OS-native credential store using the `keyring` crate.
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self {
            service: APP_NAME.to_string(),
        }
    }

    fn entry(&self, account: &str) -> Result<keyring::Entry, CredentialError> {
        keyring::Entry::new(&self.service, account).map_err(|e| {
            CredentialError::BackendUnavailable {
                message: e.to_string(),
            }
        })
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn store_key(&self, account: &str, secret: &str) -> Result<(), CredentialError> {
        self.entry(account)?
            .set_password(secret)
            .map_err(|e| CredentialError::StoreFailed {
                message: e.to_string(),
            })
    }

    fn get_key(&self, account: &str) -> Result<String, CredentialError> {
        self.entry(account)?.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => CredentialError::NotFound {
                service: self.service.clone(),
                account: account.to_string(),
            },
            other => CredentialError::BackendUnavailable {
                message: other.to_string(),
            },
        })
    }

    fn delete_key(&self, account: &str) -> Result<(), CredentialError> {
        self.entry(account)?
            .delete_credential()
            .map_err(|e| CredentialError::DeleteFailed {
                message: e.to_string(),
            })
    }
}

/// In-memory credential store for testing.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    store: Mutex<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn store_key(&self, account: &str, secret: &str) -> Result<(), CredentialError> {
        self.store
            .lock()
            .unwrap()
            .insert(account.to_string(), secret.to_string());
        Ok(())
    }

    fn get_key(&self, account: &str) -> Result<String, CredentialError> {
        self.store
            .lock()
            .unwrap()
            .get(account)
            .cloned()
            .ok_or_else(|| CredentialError::NotFound {
                service: APP_NAME.to_string(),
                account: account.to_string(),
            })
    }

    fn delete_key(&self, account: &str) -> Result<(), CredentialError> {
        self.store.lock().unwrap().remove(account);
        Ok(())
    }
}

/// Resolve the API key, preferring the keychain over the environment.
pub fn resolve_api_key(
    store: &dyn CredentialStore,
    env_var: &str,
) -> Result<String, CredentialError> {
    resolve_api_key_with(store, env_var, |name| std::env::var(name).ok())
}

/// [`resolve_api_key`] with an injectable environment lookup.
pub fn resolve_api_key_with(
    store: &dyn CredentialStore,
    env_var: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, CredentialError> {
    match store.get_key(API_KEY_ACCOUNT) {
        Ok(key) if !key.trim().is_empty() => return Ok(key),
        Ok(_) => debug!("Keychain API key is blank"),
        Err(e) => debug!(error = %e, "No keychain API key"),
    }
    lookup(env_var)
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| CredentialError::ApiKeyMissing {
            env_var: env_var.to_string(),
        })
}
