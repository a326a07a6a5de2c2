use ::config::{Config, Environment};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// 設定読み込みのエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("{name} must be a positive integer")]
    NotPositive { name: &'static str },
}

/// 環境変数から読み込むアプリケーション設定
///
/// 変数名は接頭辞なしの大文字（`DATABASE_URL` など）。未設定の項目は既定値。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// `DATABASE_URL`
    #[serde(default = "Settings::default_database_url")]
    pub database_url: String,
    /// `DB_MAX_CONNECTIONS`
    #[serde(
        rename = "db_max_connections",
        default = "Settings::default_max_connections"
    )]
    pub max_connections: u32,
    /// `DB_ACQUIRE_TIMEOUT_SECS` - プールから接続を得るまでの上限
    #[serde(
        rename = "db_acquire_timeout_secs",
        default = "Settings::default_acquire_timeout_secs"
    )]
    pub acquire_timeout_secs: u64,
    /// `LENDING_OPERATION_TIMEOUT_SECS` - 貸出・返却1回あたりの上限
    #[serde(
        rename = "lending_operation_timeout_secs",
        default = "Settings::default_operation_timeout_secs"
    )]
    pub operation_timeout_secs: u64,
}

impl Settings {
    fn default_database_url() -> String {
        "postgres://localhost/library".to_string()
    }

    fn default_max_connections() -> u32 {
        5
    }

    fn default_acquire_timeout_secs() -> u64 {
        5
    }

    fn default_operation_timeout_secs() -> u64 {
        10
    }

    /// プロセスの環境変数から読み込む
    ///
    /// `.env` の読み込み（dotenvy）は呼び出し側で先に済ませておく。
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::default())
    }

    /// 与えた変数だけから読み込む（プロセスの環境変数は参照しない）
    pub fn from_vars(vars: &[(&str, &str)]) -> Result<Self, ConfigError> {
        let vars: ::config::Map<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Self::from_environment(Environment::default().source(Some(vars)))
    }

    fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// 0 は型としては読めるが設定値としては無効
    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("DB_MAX_CONNECTIONS", u64::from(self.max_connections)),
            ("DB_ACQUIRE_TIMEOUT_SECS", self.acquire_timeout_secs),
            ("LENDING_OPERATION_TIMEOUT_SECS", self.operation_timeout_secs),
        ];
        match checks.into_iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ConfigError::NotPositive { name }),
            None => Ok(()),
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: Self::default_database_url(),
            max_connections: Self::default_max_connections(),
            acquire_timeout_secs: Self::default_acquire_timeout_secs(),
            operation_timeout_secs: Self::default_operation_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_vars(&[]).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.operation_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_reads_overrides() {
        let settings = Settings::from_vars(&[
            ("DATABASE_URL", "postgres://db/lending"),
            ("DB_MAX_CONNECTIONS", "12"),
            ("DB_ACQUIRE_TIMEOUT_SECS", "2"),
            ("LENDING_OPERATION_TIMEOUT_SECS", "30"),
        ])
        .unwrap();

        assert_eq!(settings.database_url, "postgres://db/lending");
        assert_eq!(settings.max_connections, 12);
        assert_eq!(settings.acquire_timeout(), Duration::from_secs(2));
        assert_eq!(settings.operation_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_ignores_unrelated_variables() {
        let settings =
            Settings::from_vars(&[("HOME", "/root"), ("RUST_LOG", "debug")]).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_rejects_zero() {
        let err = Settings::from_vars(&[("DB_MAX_CONNECTIONS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NotPositive {
                name: "DB_MAX_CONNECTIONS"
            }
        ));

        let err = Settings::from_vars(&[("DB_ACQUIRE_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NotPositive {
                name: "DB_ACQUIRE_TIMEOUT_SECS"
            }
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = Settings::from_vars(&[("LENDING_OPERATION_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
