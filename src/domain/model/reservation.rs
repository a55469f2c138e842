use crate::domain::error::DomainError;
use crate::domain::model::{
    BookingHours, ClubId, Money, ReservationId, ReservationStatus, SeatNumber, TimeWindow, UserId,
};
use chrono::{DateTime, Duration, Utc};

/// キャンセル受付期限（開始時刻の何時間前まで）
pub const CANCELLATION_GRACE_HOURS: i64 = 1;

/// キャンセル受付期限を期間として取得
pub fn cancellation_grace_period() -> Duration {
    Duration::hours(CANCELLATION_GRACE_HOURS)
}

/// Reservation集約
/// 1つの座席に対する時間帯付きの利用権を表す
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    id: ReservationId,
    club_id: ClubId,
    seat_number: SeatNumber,
    user_id: UserId,
    window: TimeWindow,
    total_price: Money,
    status: ReservationStatus,
    created_at: DateTime<Utc>,
}

impl Reservation {
    /// 新しい予約を作成
    /// 終了時刻と合計金額はここで確定し、以後クラブの料金が変わっても変化しない
    ///
    /// # Arguments
    /// * `id` - 予約ID
    /// * `club_id` - クラブID
    /// * `seat_number` - 座席番号
    /// * `user_id` - 予約者
    /// * `start_time` - 開始時刻
    /// * `hours` - 予約時間数
    /// * `price_per_hour` - 予約時点の時間料金
    /// * `now` - 現在時刻（作成日時になる）
    ///
    /// # Returns
    /// * `Ok(Reservation)` - Active状態の予約
    /// * `Err(DomainError::StartTimeNotInFuture)` - 開始時刻が過去または現在
    #[allow(clippy::too_many_arguments)]
    pub fn book(
        id: ReservationId,
        club_id: ClubId,
        seat_number: SeatNumber,
        user_id: UserId,
        start_time: DateTime<Utc>,
        hours: BookingHours,
        price_per_hour: Money,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if start_time <= now {
            return Err(DomainError::StartTimeNotInFuture);
        }

        let window = TimeWindow::starting_at(start_time, hours)?;
        let total_price = price_per_hour.multiply(hours.value())?;

        Ok(Self {
            id,
            club_id,
            seat_number,
            user_id,
            window,
            total_price,
            status: ReservationStatus::Active,
            created_at: now,
        })
    }

    /// データベースから取得したデータで予約を再構築
    /// リポジトリでの使用を想定
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: ReservationId,
        club_id: ClubId,
        seat_number: SeatNumber,
        user_id: UserId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        total_price: Money,
        status: ReservationStatus,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let window = TimeWindow::new(start_time, end_time)?;
        Ok(Self {
            id,
            club_id,
            seat_number,
            user_id,
            window,
            total_price,
            status,
            created_at,
        })
    }

    pub fn id(&self) -> ReservationId {
        self.id
    }

    pub fn club_id(&self) -> &ClubId {
        &self.club_id
    }

    pub fn seat_number(&self) -> SeatNumber {
        self.seat_number
    }

    /// 予約者を取得
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.window.start()
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.window.end()
    }

    /// 予約時点で確定した合計金額
    pub fn total_price(&self) -> Money {
        self.total_price
    }

    /// 保存されているステータス
    /// 表示や判定には `effective_status` を使う
    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 現在時刻での実効ステータス
    pub fn effective_status(&self, now: DateTime<Utc>) -> ReservationStatus {
        self.status.effective_at(self.window.end(), now)
    }

    /// 指定された座席・時間帯と競合するか
    /// Activeかつ終了時刻が現在より後で、時間帯が重なるものが競合となる
    pub fn conflicts_with(
        &self,
        club_id: &ClubId,
        seat_number: SeatNumber,
        window: &TimeWindow,
        now: DateTime<Utc>,
    ) -> bool {
        self.status == ReservationStatus::Active
            && self.window.end() > now
            && &self.club_id == club_id
            && self.seat_number == seat_number
            && self.window.overlaps(window)
    }

    /// キャンセル可能か検証する
    /// 検証順: 所有者 → ステータス → 受付期限
    ///
    /// # Returns
    /// * `Ok(())` - キャンセル可能
    /// * `Err(DomainError::NotReservationOwner)` - 予約者以外からの要求
    /// * `Err(DomainError::ReservationNotActive)` - キャンセル済みまたは利用完了
    /// * `Err(DomainError::CancellationWindowClosed)` - 開始1時間前を過ぎている
    pub fn ensure_cancellable(
        &self,
        requester: &UserId,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if &self.user_id != requester {
            return Err(DomainError::NotReservationOwner);
        }

        let status = self.effective_status(now);
        if status.is_terminal() {
            return Err(DomainError::ReservationNotActive(status));
        }

        // ちょうど1時間前は受付不可
        if self.window.start() - now <= cancellation_grace_period() {
            return Err(DomainError::CancellationWindowClosed);
        }

        Ok(())
    }

    /// 予約をキャンセル
    pub fn cancel(&mut self, requester: &UserId, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_cancellable(requester, now)?;
        self.status = ReservationStatus::Cancelled;
        Ok(())
    }
}
