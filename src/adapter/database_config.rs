use sqlx::mysql::MySqlPoolOptions;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// データベース接続設定を管理する構造体
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
}

/// 設定エラー
/// 環境変数の値が解釈できない場合に返す
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// 環境変数を読み取る。未設定なら既定値
pub(crate) fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// 環境変数を型に変換して読み取る。未設定なら既定値
pub(crate) fn parse_var<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

impl DatabaseConfig {
    /// 環境変数から設定を読み取る
    /// 環境変数が設定されていない場合はデフォルト値を使用
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_connections = parse_var("DATABASE_MAX_CONNECTIONS", 10u32)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "Invalid DATABASE_MAX_CONNECTIONS: must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            host: var_or("DATABASE_HOST", "localhost"),
            port: parse_var("DATABASE_PORT", 3306u16)?,
            database: var_or("DATABASE_NAME", "club_booking_db"),
            username: var_or("DATABASE_USER", "club_booking_user"),
            password: var_or("DATABASE_PASSWORD", "club_booking_password"),
            max_connections,
        })
    }

    /// MySQL接続文字列を生成
    /// パスワードを含むためログには出さない
    pub fn connection_string(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    /// 接続プールの設定
    /// 接続の取得待ちもストア呼び出しの制限時間に合わせる
    pub fn pool_options(&self, acquire_timeout: Duration) -> MySqlPoolOptions {
        MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(acquire_timeout)
    }
}
