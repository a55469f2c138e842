use crate::domain::model::{ReservationStatus, MAX_BOOKING_HOURS};

/// ドメイン層のエラー型
/// ビジネスルール違反を表現する
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 無効な値（例: 空のクラブ名、0以下の時間料金）
    InvalidValue(String),
    /// 無効な座席番号（0は使用できない）
    InvalidSeatNumber,
    /// 無効な予約時間数（0時間、または上限超過）
    InvalidHours,
    /// 開始時刻が現在時刻より後でない
    StartTimeNotInFuture,
    /// 座席が利用不可としてマークされている
    SeatUnavailable,
    /// 要求された時間帯に有効な予約が既に存在する
    OverlappingReservation,
    /// 予約がActive状態でない（キャンセル済み・利用完了）
    ReservationNotActive(ReservationStatus),
    /// キャンセル受付期限を過ぎている
    CancellationWindowClosed,
    /// 予約の所有者ではない
    NotReservationOwner,
    /// 終了前の有効な予約が残っている（座席・クラブの削除時）
    ActiveReservationsExist(u64),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
            DomainError::InvalidSeatNumber => write!(f, "Seat number must be positive"),
            DomainError::InvalidHours => write!(f, "Booking hours must be between 1 and {}", MAX_BOOKING_HOURS),
            DomainError::StartTimeNotInFuture => write!(f, "Start time must be in the future"),
            DomainError::SeatUnavailable => write!(f, "Seat is already booked"),
            DomainError::OverlappingReservation => {
                write!(f, "Seat is booked for the requested time")
            }
            DomainError::ReservationNotActive(status) => {
                write!(f, "Reservation is already {}", status)
            }
            DomainError::CancellationWindowClosed => write!(
                f,
                "Reservations can only be cancelled more than 1 hour before start time"
            ),
            DomainError::NotReservationOwner => {
                write!(f, "Cannot cancel someone else's reservation")
            }
            DomainError::ActiveReservationsExist(count) => {
                write!(f, "{} active reservation(s) have not ended yet", count)
            }
        }
    }
}

impl std::error::Error for DomainError {}
