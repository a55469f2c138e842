use crate::domain::error::DomainError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// クラブの識別子
/// 外部のクラブ管理から払い出される不透明な文字列
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClubId(String);

impl ClubId {
    /// 文字列からClubIdを作成
    /// 空白のみの文字列は受け付けない
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::InvalidValue(
                "クラブIDは空にできません".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// 新しい一意のClubIdを生成
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 利用者の識別子
/// 認証済みの利用者ID（認証基盤が発行したUID）をそのまま保持する
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// 文字列からUserIdを作成
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::InvalidValue(
                "利用者IDは空にできません".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 座席（PC）の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatId(Uuid);

impl SeatId {
    /// 新しい一意のSeatIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// 文字列からSeatIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for SeatId {
    fn default() -> Self {
        Self::new()
    }
}

/// 予約の一意識別子
/// 作成時に払い出され、再利用されない
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(Uuid);

impl ReservationId {
    /// 新しい一意のReservationIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから ReservationId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からReservationIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

/// クラブ内の座席番号（1始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatNumber(u32);

impl SeatNumber {
    /// 座席番号を作成
    /// 0は無効
    pub fn new(value: u32) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::InvalidSeatNumber);
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// 次の座席番号
    /// 上限を超える場合はエラー
    pub fn next(&self) -> Result<Self, DomainError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or(DomainError::InvalidSeatNumber)
    }
}

impl fmt::Display for SeatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 1回の予約で指定できる最大時間数
pub const MAX_BOOKING_HOURS: u32 = 24;

/// 予約時間数（1時間単位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingHours(u32);

impl BookingHours {
    /// 予約時間数を作成
    /// 1以上 `MAX_BOOKING_HOURS` 以下である必要がある
    pub fn new(hours: u32) -> Result<Self, DomainError> {
        if hours == 0 || hours > MAX_BOOKING_HOURS {
            return Err(DomainError::InvalidHours);
        }
        Ok(Self(hours))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// 時間数を期間に変換
    pub fn as_duration(&self) -> Duration {
        Duration::hours(i64::from(self.0))
    }
}

/// 金額を表す値オブジェクト
/// 通貨の最小単位（セント等）の整数で保持する
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
}

impl Money {
    /// 最小単位の金額から作成
    pub fn new(amount: i64) -> Self {
        Self { amount }
    }

    /// 正の金額のみ受け付ける（時間料金など）
    pub fn positive(amount: i64) -> Result<Self, DomainError> {
        if amount <= 0 {
            return Err(DomainError::InvalidValue(format!(
                "金額は正の値である必要があります: {}",
                amount
            )));
        }
        Ok(Self { amount })
    }

    /// 金額を取得
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// 金額を乗算
    /// オーバーフローする場合はエラー
    pub fn multiply(&self, factor: u32) -> Result<Money, DomainError> {
        self.amount
            .checked_mul(i64::from(factor))
            .map(Money::new)
            .ok_or_else(|| {
                DomainError::InvalidValue(format!(
                    "金額の計算がオーバーフローしました: {} x {}",
                    self.amount, factor
                ))
            })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.amount)
    }
}

/// 予約時間帯 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// 開始・終了時刻から作成
    /// 終了時刻は開始時刻より後である必要がある
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, DomainError> {
        if end <= start {
            return Err(DomainError::InvalidValue(format!(
                "終了時刻は開始時刻より後である必要があります: {} - {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// 開始時刻と時間数から作成
    /// 終了時刻が表現可能な範囲を超える場合はエラー
    pub fn starting_at(start: DateTime<Utc>, hours: BookingHours) -> Result<Self, DomainError> {
        let end = start
            .checked_add_signed(hours.as_duration())
            .ok_or_else(|| {
                DomainError::InvalidValue(format!("終了時刻を計算できません: {}", start))
            })?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// 2つの時間帯が重なるかを判定する
    /// `[s1,e1)` と `[s2,e2)` は `s1 < e2 && s2 < e1` のとき重なる
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// 終了時刻を過ぎているか
    pub fn has_ended_at(&self, now: DateTime<Utc>) -> bool {
        self.end <= now
    }
}

/// 予約のステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// 有効（作成直後）
    Active,
    /// キャンセル済み
    Cancelled,
    /// 利用完了（終了時刻経過、読み取り時に導出）
    Completed,
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status_str = match self {
            ReservationStatus::Active => "Active",
            ReservationStatus::Cancelled => "Cancelled",
            ReservationStatus::Completed => "Completed",
        };
        write!(f, "{}", status_str)
    }
}

impl ReservationStatus {
    /// 文字列からReservationStatusを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "Active" => Ok(ReservationStatus::Active),
            "Cancelled" => Ok(ReservationStatus::Cancelled),
            "Completed" => Ok(ReservationStatus::Completed),
            _ => Err(DomainError::InvalidValue(format!(
                "無効な予約ステータス: {}",
                s
            ))),
        }
    }

    /// 現在時刻を踏まえた実効ステータス
    /// 終了時刻を過ぎたActiveはCompletedとして扱う。永続化はしない
    pub fn effective_at(self, end_time: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        match self {
            ReservationStatus::Active if end_time <= now => ReservationStatus::Completed,
            other => other,
        }
    }

    /// 終端状態か
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Cancelled | ReservationStatus::Completed
        )
    }
}
