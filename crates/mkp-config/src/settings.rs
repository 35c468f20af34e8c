//! Typed engine settings read from the merged config JSON.
//!
//! Every key is optional; an absent key takes the default shipped in
//! `config/defaults/base.yaml`. A present key with a bad value is an error
//! naming the pointer.

use anyhow::{bail, Result};
use mkp_orders::{
    DeliveryEstimates, ItemDeletePolicy, LedgerSettings, LifecyclePolicy, DEFAULT_PHONE_DIGITS,
    MAX_ESTIMATE_HOURS,
};
use serde_json::Value;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8899";
pub const DEFAULT_DATABASE_URL_ENV: &str = "MKP_DATABASE_URL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres => "postgres",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Name of the env var holding the connection string. Never the URL.
    pub database_url_env: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            database_url_env: DEFAULT_DATABASE_URL_ENV.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub bind_addr: String,
    pub delete_policy: ItemDeletePolicy,
    pub lifecycle_policy: LifecyclePolicy,
    pub ledger: LedgerSettings,
    pub storage: StorageSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            delete_policy: ItemDeletePolicy::default(),
            lifecycle_policy: LifecyclePolicy::default(),
            ledger: LedgerSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl EngineSettings {
    pub fn from_config_json(config: &Value) -> Result<Self> {
        let defaults = Self::default();

        let bind_addr = read_str(config, "/daemon/bind_addr")?.unwrap_or(defaults.bind_addr);

        let delete_policy = match read_str(config, "/catalog/delete_policy")? {
            None => defaults.delete_policy,
            Some(s) => match ItemDeletePolicy::parse(&s) {
                Some(p) => p,
                None => bail!(
                    "CONFIG_INVALID /catalog/delete_policy={s:?}: \
                     expected permissive | reject_pending_orders"
                ),
            },
        };

        let lifecycle_policy = match read_str(config, "/orders/lifecycle_policy")? {
            None => defaults.lifecycle_policy,
            Some(s) => match LifecyclePolicy::parse(&s) {
                Some(p) => p,
                None => bail!(
                    "CONFIG_INVALID /orders/lifecycle_policy={s:?}: \
                     expected permissive | forward_only"
                ),
            },
        };

        let phone_digits = match read_non_negative(config, "/orders/phone_digits")? {
            None => DEFAULT_PHONE_DIGITS,
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
        };

        let est = DeliveryEstimates::default();
        let pending_hours = read_hours(config, "/orders/delivery_estimate/pending_hours")?
            .unwrap_or(est.pending_hours);
        let shipped_hours = read_hours(config, "/orders/delivery_estimate/shipped_hours")?
            .unwrap_or(est.shipped_hours);

        let backend = match read_str(config, "/storage/backend")?.as_deref() {
            None | Some("memory") => StorageBackend::Memory,
            Some("postgres") => StorageBackend::Postgres,
            Some(other) => bail!(
                "CONFIG_INVALID /storage/backend={other:?}: expected memory | postgres"
            ),
        };
        let database_url_env = read_str(config, "/storage/database_url_env")?
            .unwrap_or_else(|| DEFAULT_DATABASE_URL_ENV.to_string());

        Ok(Self {
            bind_addr,
            delete_policy,
            lifecycle_policy,
            ledger: LedgerSettings {
                phone_digits,
                delivery: DeliveryEstimates {
                    pending_hours,
                    shipped_hours,
                },
            },
            storage: StorageSettings {
                backend,
                database_url_env,
            },
        })
    }
}

/// Absent or null → `None`; present but not a non-blank string → error.
fn read_str(config: &Value, pointer: &str) -> Result<Option<String>> {
    match config.pointer(pointer) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.trim().to_string())),
        Some(other) => bail!("CONFIG_INVALID {pointer}={other}: expected a non-empty string"),
    }
}

fn read_non_negative(config: &Value, pointer: &str) -> Result<Option<i64>> {
    match config.pointer(pointer) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_i64() {
            Some(n) if n >= 0 => Ok(Some(n)),
            _ => bail!("CONFIG_INVALID {pointer}={v}: expected an integer >= 0"),
        },
    }
}

fn read_hours(config: &Value, pointer: &str) -> Result<Option<i64>> {
    let hours = read_non_negative(config, pointer)?;
    if let Some(h) = hours {
        if h > MAX_ESTIMATE_HOURS {
            bail!("CONFIG_INVALID {pointer}={h}: expected at most {MAX_ESTIMATE_HOURS} hours");
        }
    }
    Ok(hours)
}
