use crate::adapter::database_config::{parse_var, var_or, ConfigError};
use std::time::Duration;

/// 永続化の実装
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    MySql,
    /// プロセス内メモリ（開発・テスト用）
    Memory,
}

impl StorageBackend {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(StorageBackend::MySql),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::InvalidValue(format!(
                "Invalid STORAGE_BACKEND: {} (expected mysql or memory)",
                other
            ))),
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub storage_backend: StorageBackend,
    /// ストア呼び出し1回あたりの制限時間
    pub store_timeout: Duration,
}

impl AppConfig {
    /// 環境変数から設定を読み取る
    ///
    /// * `SERVER_PORT` - 既定 3000
    /// * `STORAGE_BACKEND` - `mysql`（既定）または `memory`
    /// * `STORE_TIMEOUT_MS` - 既定 5000、0は不可
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_port = parse_var("SERVER_PORT", 3000u16)?;
        let storage_backend = StorageBackend::parse(&var_or("STORAGE_BACKEND", "mysql"))?;

        let timeout_ms = parse_var("STORE_TIMEOUT_MS", 5000u64)?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "Invalid STORE_TIMEOUT_MS: must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            server_port,
            storage_backend,
            store_timeout: Duration::from_millis(timeout_ms),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.server_port)
    }
}
