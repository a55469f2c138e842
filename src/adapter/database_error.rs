use crate::domain::port::RepositoryError;

/// MySQLのデッドロック検出
const ER_LOCK_DEADLOCK: u16 = 1213;
/// MySQLのロック待ちタイムアウト
const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;
/// 直列化失敗
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";
/// 一意制約違反
const ER_DUP_ENTRY: u16 = 1062;
/// 参照先の行が存在しない
const ER_NO_REFERENCED_ROW_2: u16 = 1452;

/// MySQLのエラー番号から分類する
fn classify_mysql_code(code: u16, message: String) -> Option<DatabaseError> {
    match code {
        ER_LOCK_DEADLOCK => Some(DatabaseError::Conflict(message)),
        ER_LOCK_WAIT_TIMEOUT => Some(DatabaseError::Timeout(message)),
        ER_DUP_ENTRY | ER_NO_REFERENCED_ROW_2 => Some(DatabaseError::ConstraintViolation(message)),
        _ => None,
    }
}

/// データベースエラー型
/// データベース操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseError {
    /// データベース接続エラー
    ConnectionError(String),
    /// SQLクエリエラー
    QueryError(String),
    /// マイグレーションエラー
    MigrationError(String),
    /// 接続取得やロック待ちのタイムアウト
    Timeout(String),
    /// デッドロック・直列化失敗でトランザクションが中断された
    Conflict(String),
    /// 保存されている値がドメインの型に復元できない
    DecodeError(String),
    /// 一意制約・外部キー制約違反
    ConstraintViolation(String),
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseError::ConnectionError(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::QueryError(msg) => write!(f, "Database query error: {}", msg),
            DatabaseError::MigrationError(msg) => write!(f, "Migration error: {}", msg),
            DatabaseError::Timeout(msg) => write!(f, "Database timeout: {}", msg),
            DatabaseError::Conflict(msg) => write!(f, "Transaction conflict: {}", msg),
            DatabaseError::DecodeError(msg) => write!(f, "Stored data could not be decoded: {}", msg),
            DatabaseError::ConstraintViolation(msg) => write!(f, "Constraint violation: {}", msg),
        }
    }
}

impl std::error::Error for DatabaseError {}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => DatabaseError::Timeout(err.to_string()),
            sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::Tls(_) => {
                DatabaseError::ConnectionError(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_) => DatabaseError::DecodeError(err.to_string()),
            sqlx::Error::Database(db_err) => {
                let mysql_code = db_err
                    .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                    .map(|e| e.number());
                if let Some(classified) =
                    mysql_code.and_then(|code| classify_mysql_code(code, err.to_string()))
                {
                    classified
                } else if db_err.code().as_deref() == Some(SQLSTATE_SERIALIZATION_FAILURE) {
                    DatabaseError::Conflict(err.to_string())
                } else {
                    DatabaseError::QueryError(err.to_string())
                }
            }
            _ => DatabaseError::QueryError(err.to_string()),
        }
    }
}

/// DatabaseErrorからRepositoryErrorへの変換
impl From<DatabaseError> for RepositoryError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConnectionError(msg) => RepositoryError::ConnectionFailed(msg),
            DatabaseError::QueryError(msg) => RepositoryError::OperationFailed(msg),
            DatabaseError::MigrationError(msg) => RepositoryError::OperationFailed(msg),
            DatabaseError::Timeout(msg) => RepositoryError::Timeout(msg),
            DatabaseError::Conflict(msg) => RepositoryError::Conflict(msg),
            DatabaseError::DecodeError(msg) => RepositoryError::FetchFailed(msg),
            DatabaseError::ConstraintViolation(msg) => RepositoryError::ConstraintViolation(msg),
        }
    }
}

/// sqlxのエラーを直接リポジトリエラーに変換する
pub(crate) fn repository_error(err: sqlx::Error) -> RepositoryError {
    RepositoryError::from(DatabaseError::from(err))
}
