use crate::domain::error::DomainError;
use crate::domain::port::RepositoryError;

/// 呼び出し側に返すエラー種別
/// HTTP層はこの種別でステータスコードを決める
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 不正な入力（過去の開始時刻、0時間など）
    InvalidArgument,
    /// 参照先（クラブ・座席・予約）が存在しない
    NotFound,
    /// 現在の状態ではビジネスルール上実行できない
    FailedPrecondition,
    /// 予約の所有者ではない
    PermissionDenied,
    /// ストアの一時的な障害（タイムアウトを含む）。再試行可能
    Unavailable,
    /// 同時実行の競合でコミットが中断された。再試行可能
    Aborted,
    /// 保存データの破損など
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::FailedPrecondition => "FAILED_PRECONDITION",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::Unavailable => "UNAVAILABLE",
            ErrorKind::Aborted => "ABORTED",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// アプリケーション層のエラー型
/// ドメインエラーとリポジトリエラーをラップする
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    /// ドメインエラー（ビジネスルール違反）
    #[error("Domain error: {0}")]
    DomainError(DomainError),
    /// リポジトリエラー（永続化の失敗）
    #[error("Repository error: {0}")]
    RepositoryError(RepositoryError),
    /// エンティティが見つからない
    #[error("Not found: {0}")]
    NotFound(String),
    /// ストア呼び出しが制限時間内に完了しなかった
    #[error("Store call timed out: {0}")]
    Timeout(String),
}

impl ApplicationError {
    /// エラー種別を判定する
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::DomainError(err) => match err {
                DomainError::InvalidValue(_)
                | DomainError::InvalidSeatNumber
                | DomainError::InvalidHours
                | DomainError::StartTimeNotInFuture => ErrorKind::InvalidArgument,
                DomainError::SeatUnavailable
                | DomainError::OverlappingReservation
                | DomainError::ReservationNotActive(_)
                | DomainError::CancellationWindowClosed
                | DomainError::ActiveReservationsExist(_) => ErrorKind::FailedPrecondition,
                DomainError::NotReservationOwner => ErrorKind::PermissionDenied,
            },
            ApplicationError::RepositoryError(err) => match err {
                RepositoryError::ConnectionFailed(_)
                | RepositoryError::OperationFailed(_)
                | RepositoryError::Timeout(_) => ErrorKind::Unavailable,
                RepositoryError::Conflict(_) => ErrorKind::Aborted,
                RepositoryError::ConstraintViolation(_) => ErrorKind::FailedPrecondition,
                RepositoryError::FetchFailed(_) => ErrorKind::Internal,
            },
            ApplicationError::NotFound(_) => ErrorKind::NotFound,
            ApplicationError::Timeout(_) => ErrorKind::Unavailable,
        }
    }

    /// 最初からやり直せば成功する可能性があるか
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unavailable | ErrorKind::Aborted)
    }
}

// From実装でエラー変換を簡潔に
impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        ApplicationError::DomainError(err)
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        ApplicationError::RepositoryError(err)
    }
}
