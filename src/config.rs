use std::env;

use tracing::info;

use crate::error::{EtlError, Result};

/// Required environment keys, validated together so one failure reports the
/// whole set of missing values.
pub const REQUIRED_KEYS: [&str; 8] = [
    "BUCKET_NAME",
    "STORAGE_ACCESS_KEY_ID",
    "STORAGE_SECRET_ACCESS_KEY",
    "STORAGE_REGION",
    "STORAGE_ENDPOINT_URL",
    "STORAGE_BUCKET_NAME",
    "KAGGLE_USERNAME",
    "KAGGLE_KEY",
];

/// Runtime configuration, built once at startup and passed by parameter into
/// every stage that needs it. Values are opaque text: no defaulting, no
/// coercion.
#[derive(Debug, Clone)]
pub struct Config {
    pub bucket_name: String,
    pub storage_access_key_id: String,
    pub storage_secret_access_key: String,
    pub storage_region: String,
    pub storage_endpoint_url: String,
    pub storage_bucket_name: String,
    pub kaggle_username: String,
    pub kaggle_key: String,
}

impl Config {
    /// Read every required key from the environment (honoring `.env` if one
    /// exists). An empty value counts as missing.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut missing = Vec::new();
        let mut get = |key: &'static str| match env::var(key) {
            Ok(v) if !v.trim().is_empty() => v,
            _ => {
                missing.push(key.to_string());
                String::new()
            }
        };

        let config = Config {
            bucket_name: get("BUCKET_NAME"),
            storage_access_key_id: get("STORAGE_ACCESS_KEY_ID"),
            storage_secret_access_key: get("STORAGE_SECRET_ACCESS_KEY"),
            storage_region: get("STORAGE_REGION"),
            storage_endpoint_url: get("STORAGE_ENDPOINT_URL"),
            storage_bucket_name: get("STORAGE_BUCKET_NAME"),
            kaggle_username: get("KAGGLE_USERNAME"),
            kaggle_key: get("KAGGLE_KEY"),
        };

        if !missing.is_empty() {
            return Err(EtlError::Configuration { missing });
        }

        info!("all required environment variables are set");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests touching them.
    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    fn set_all() {
        for key in REQUIRED_KEYS {
            env::set_var(key, "value");
        }
    }

    fn clear_all() {
        for key in REQUIRED_KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn from_env_succeeds_when_all_keys_present() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_all();
        env::set_var("STORAGE_REGION", "ap-southeast-1");

        let config = Config::from_env().unwrap();
        assert_eq!(config.storage_region, "ap-southeast-1");
        assert_eq!(config.bucket_name, "value");

        clear_all();
    }

    #[test]
    fn from_env_names_exactly_the_missing_key() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_all();
        env::remove_var("KAGGLE_KEY");

        let err = Config::from_env().unwrap_err();
        match err {
            EtlError::Configuration { missing } => {
                assert_eq!(missing, vec!["KAGGLE_KEY".to_string()]);
            }
            other => panic!("expected Configuration error, got {other:?}"),
        }

        clear_all();
    }

    #[test]
    fn from_env_treats_empty_values_as_missing() {
        let _guard = ENV_LOCK.lock().unwrap();
        set_all();
        env::set_var("BUCKET_NAME", "  ");
        env::remove_var("KAGGLE_USERNAME");

        let err = Config::from_env().unwrap_err();
        match err {
            EtlError::Configuration { missing } => {
                assert_eq!(
                    missing,
                    vec!["BUCKET_NAME".to_string(), "KAGGLE_USERNAME".to_string()]
                );
            }
            other => panic!("expected Configuration error, got {other:?}"),
        }

        clear_all();
    }
}
