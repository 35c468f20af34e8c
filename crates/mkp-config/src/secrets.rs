//! Runtime secret resolution.
//!
//! Config holds env var NAMES (`/storage/database_url_env`). Binaries call
//! [`resolve_secrets`] once at startup and pass the result to constructors.
//! Errors name the variable, never its value, and `Debug` redacts.

use anyhow::{bail, Result};

use crate::{EngineSettings, StorageBackend};

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// `None` if the named env var is unset or blank.
    pub database_url: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// The postgres backend requires the database URL; the memory backend
/// treats it as optional.
pub fn resolve_secrets(settings: &EngineSettings) -> Result<ResolvedSecrets> {
    let var = &settings.storage.database_url_env;
    let database_url = resolve_env(var);

    if settings.storage.backend == StorageBackend::Postgres && database_url.is_none() {
        bail!(
            "SECRETS_MISSING backend=postgres: required env var '{}' is not set or empty",
            var
        );
    }

    Ok(ResolvedSecrets { database_url })
}
