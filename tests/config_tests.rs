use std::{collections::HashMap, env};

use serial_test::serial;
use users_api::config::{AppConfig, ConfigError};

const KEYS: [&str; 5] = [
    "DATABASE_URL",
    "HOST",
    "PORT",
    "PAGE_SIZE",
    "DATABASE_MAX_CONNECTIONS",
];

#[derive(Default)]
struct EnvGuard {
    original: HashMap<String, Option<String>>,
}

impl EnvGuard {
    fn set(&mut self, key: &str, value: impl Into<String>) {
        self.original
            .entry(key.to_string())
            .or_insert_with(|| env::var(key).ok());
        env::set_var(key, value.into());
    }

    fn remove(&mut self, key: &str) {
        self.original
            .entry(key.to_string())
            .or_insert_with(|| env::var(key).ok());
        env::remove_var(key);
    }

    fn cleared() -> Self {
        let mut guard = Self::default();
        for key in KEYS {
            guard.remove(key);
        }
        guard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.original.drain() {
            match value {
                Some(v) => env::set_var(&key, v),
                None => env::remove_var(&key),
            }
        }
    }
}

#[test]
#[serial]
fn defaults_apply_when_unset() {
    let _guard = EnvGuard::cleared();

    let config = AppConfig::from_env().unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.database_url, "sqlite://data/users.db");
    assert_eq!(config.page_size, 10);
    assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8000");
}

#[test]
#[serial]
fn reads_overrides() {
    let mut guard = EnvGuard::cleared();
    guard.set("DATABASE_URL", "sqlite::memory:");
    guard.set("HOST", "0.0.0.0");
    guard.set("PORT", "9090");
    guard.set("PAGE_SIZE", " 25 ");
    guard.set("DATABASE_MAX_CONNECTIONS", "2");

    let config = AppConfig::from_env().unwrap();
    assert_eq!(config.database_url, "sqlite::memory:");
    assert_eq!(config.page_size, 25);
    assert_eq!(config.max_connections, 2);
    assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:9090");
}

#[test]
#[serial]
fn rejects_invalid_values() {
    let mut guard = EnvGuard::cleared();

    guard.set("PORT", "eighty");
    assert!(matches!(
        AppConfig::from_env(),
        Err(ConfigError::InvalidValue { key: "PORT", .. })
    ));
    guard.remove("PORT");

    guard.set("PAGE_SIZE", "0");
    assert!(matches!(
        AppConfig::from_env(),
        Err(ConfigError::InvalidValue { key: "PAGE_SIZE", .. })
    ));
    guard.remove("PAGE_SIZE");

    guard.set("DATABASE_MAX_CONNECTIONS", "0");
    assert!(matches!(
        AppConfig::from_env(),
        Err(ConfigError::InvalidValue {
            key: "DATABASE_MAX_CONNECTIONS",
            ..
        })
    ));
    guard.remove("DATABASE_MAX_CONNECTIONS");

    guard.set("HOST", "not a host");
    let config = AppConfig::from_env().unwrap();
    assert!(matches!(
        config.socket_addr(),
        Err(ConfigError::InvalidValue { key: "HOST", .. })
    ));
}
