pub mod club_query_service;
pub mod reservation_query_service;

pub use club_query_service::ClubQueryService;
pub use reservation_query_service::{ReservationQueryService, ReservationView};

use crate::application::{ApplicationError, ErrorKind};
use crate::domain::error::DomainError;
use crate::domain::model::{
    BookingHours, Club, ClubId, Money, Reservation, ReservationId, ReservationStatus, Seat,
    SeatId, SeatNumber, UserId,
};
use crate::domain::port::{
    Clock, ClubRepository, ClubTransaction, ClubTransactionManager, PricingLookup,
    RepositoryError, ReservationRepository, SeatRepository, SeatTransaction,
    SeatTransactionManager,
};
use crate::domain::service::BookingPolicy;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// ストア呼び出し1回あたりの既定の制限時間
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(5000);

/// 1回の座席追加で作成できる座席数の上限
pub const MAX_SEATS_PER_REQUEST: u32 = 100;

/// ストア呼び出しを制限時間付きで実行する
/// 時間切れは `ApplicationError::Timeout`、ストアのエラーはそのまま変換して返す
pub(crate) async fn within_timeout<T, F>(
    limit: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, ApplicationError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            tracing::warn!(operation, error = %err, "store call failed");
            Err(ApplicationError::from(err))
        }
        Err(_elapsed) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "store call timed out");
            Err(ApplicationError::Timeout(operation.to_string()))
        }
    }
}

/// 予約リクエスト
#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub club_id: ClubId,
    pub seat_number: SeatNumber,
    pub user_id: UserId,
    pub start_time: DateTime<Utc>,
    pub hours: BookingHours,
}

/// 予約アプリケーションサービス（予約エンジン）
///
/// 受付判定・料金計算・予約と座席フラグの同時確定、およびキャンセル時の取り消しを担う。
/// 同じ座席への確定処理は座席トランザクションで直列化される
pub struct ReservationApplicationService {
    pricing: Arc<dyn PricingLookup>,
    seat_repository: Arc<dyn SeatRepository>,
    reservation_repository: Arc<dyn ReservationRepository>,
    transactions: Arc<dyn SeatTransactionManager>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl ReservationApplicationService {
    /// 新しい予約アプリケーションサービスを作成
    ///
    /// # Arguments
    /// * `pricing` - 料金参照
    /// * `seat_repository` - 座席リポジトリ
    /// * `reservation_repository` - 予約リポジトリ
    /// * `transactions` - 座席トランザクションの開始口
    /// * `clock` - 時刻の供給源
    pub fn new(
        pricing: Arc<dyn PricingLookup>,
        seat_repository: Arc<dyn SeatRepository>,
        reservation_repository: Arc<dyn ReservationRepository>,
        transactions: Arc<dyn SeatTransactionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pricing,
            seat_repository,
            reservation_repository,
            transactions,
            clock,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// ストア呼び出しの制限時間を変更する
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, ApplicationError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        within_timeout(self.store_timeout, operation, call).await
    }

    /// 座席を予約する
    ///
    /// 判定順:
    /// 1. 開始時刻が現在より後
    /// 2. クラブの時間料金が解決できる
    /// 3. 座席が存在する
    /// 4. 座席の利用可能フラグ（高速チェック）
    /// 5. 座席トランザクション内で重複する有効な予約がない
    ///
    /// # Returns
    /// * `Ok(Reservation)` - 作成された予約
    /// * `Err(ApplicationError)` - 受付不可またはストア障害
    pub async fn reserve(&self, request: ReservationRequest) -> Result<Reservation, ApplicationError> {
        let now = self.clock.now();

        BookingPolicy::ensure_starts_in_future(request.start_time, now)
            .map_err(|err| rejected(err, &request.club_id, request.seat_number))?;

        let price_per_hour = self
            .bounded("club_rate", self.pricing.club_rate(&request.club_id))
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("クラブが見つかりません: {}", request.club_id))
            })?;

        let seat = self
            .bounded(
                "find_seat",
                self.seat_repository
                    .find_by_club_and_number(&request.club_id, request.seat_number),
            )
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!(
                    "座席が見つかりません: {} / {}",
                    request.club_id, request.seat_number
                ))
            })?;

        seat.ensure_available()
            .map_err(|err| rejected(err, &request.club_id, request.seat_number))?;

        let reservation = Reservation::book(
            ReservationId::new(),
            request.club_id.clone(),
            request.seat_number,
            request.user_id.clone(),
            request.start_time,
            request.hours,
            price_per_hour,
            now,
        )?;

        let mut tx = self
            .bounded("begin_seat_transaction", self.transactions.begin(seat.id()))
            .await?;

        let staged = self
            .stage_reservation(tx.as_mut(), &reservation, seat.id(), now)
            .await;
        if let Err(err) = staged {
            self.discard(tx).await;
            return Err(err);
        }

        // コミットは制限時間で打ち切らない。打ち切ると反映済みの予約を失敗として返しうる
        if let Err(err) = tx.commit().await {
            self.confirm_commit(err, reservation.id(), ReservationStatus::Active)
                .await?;
        }

        tracing::info!(
            reservation_id = %reservation.id(),
            club_id = %reservation.club_id(),
            seat_number = %reservation.seat_number(),
            user_id = %reservation.user_id(),
            total_price = reservation.total_price().amount(),
            "reservation committed"
        );
        Ok(reservation)
    }

    /// 座席ロック取得後の重複判定と書き込み
    async fn stage_reservation(
        &self,
        tx: &mut dyn SeatTransaction,
        reservation: &Reservation,
        seat_id: SeatId,
        now: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        let window = reservation.window();
        let candidates = self
            .bounded(
                "find_active_overlap",
                tx.find_active_overlap(
                    reservation.club_id(),
                    reservation.seat_number(),
                    &window,
                    now,
                ),
            )
            .await?;

        if let Err(err) = BookingPolicy::ensure_no_conflict(&candidates, &window, now) {
            tracing::info!(
                club_id = %reservation.club_id(),
                seat_number = %reservation.seat_number(),
                conflicting = ?BookingPolicy::conflicting_ids(&candidates),
                "reservation rejected: overlapping booking"
            );
            return Err(err.into());
        }

        self.bounded("insert_reservation", tx.insert_reservation(reservation))
            .await?;
        self.bounded("set_seat_availability", tx.set_seat_availability(seat_id, false))
            .await?;
        Ok(())
    }

    /// 予約をキャンセルする
    ///
    /// 判定順: 存在 → 所有者 → ステータス → 受付期限（開始1時間前より前）
    /// 座席トランザクション内で予約を読み直して同じ判定をもう一度行うため、
    /// 競合した2回目のキャンセルは `FailedPrecondition` になる
    ///
    /// # Arguments
    /// * `reservation_id` - 予約ID
    /// * `requester` - 要求者
    pub async fn cancel(
        &self,
        reservation_id: ReservationId,
        requester: &UserId,
    ) -> Result<(), ApplicationError> {
        let reservation = self
            .bounded(
                "find_reservation",
                self.reservation_repository.find_by_id(reservation_id),
            )
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("予約が見つかりません: {}", reservation_id))
            })?;

        reservation
            .ensure_cancellable(requester, self.clock.now())
            .map_err(|err| rejected(err, reservation.club_id(), reservation.seat_number()))?;

        let seat = self
            .bounded(
                "find_seat",
                self.seat_repository
                    .find_by_club_and_number(reservation.club_id(), reservation.seat_number()),
            )
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!(
                    "座席が見つかりません: {} / {}",
                    reservation.club_id(),
                    reservation.seat_number()
                ))
            })?;

        let mut tx = self
            .bounded("begin_seat_transaction", self.transactions.begin(seat.id()))
            .await?;

        let staged = self
            .stage_cancellation(tx.as_mut(), reservation_id, requester, seat.id())
            .await;
        if let Err(err) = staged {
            self.discard(tx).await;
            return Err(err);
        }

        if let Err(err) = tx.commit().await {
            self.confirm_commit(err, reservation_id, ReservationStatus::Cancelled)
                .await?;
        }

        tracing::info!(
            reservation_id = %reservation_id,
            club_id = %reservation.club_id(),
            seat_number = %reservation.seat_number(),
            "reservation cancelled"
        );
        Ok(())
    }

    async fn stage_cancellation(
        &self,
        tx: &mut dyn SeatTransaction,
        reservation_id: ReservationId,
        requester: &UserId,
        seat_id: SeatId,
    ) -> Result<(), ApplicationError> {
        let mut current = self
            .bounded("reload_reservation", tx.find_reservation(reservation_id))
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("予約が見つかりません: {}", reservation_id))
            })?;

        current
            .cancel(requester, self.clock.now())
            .map_err(|err| rejected(err, current.club_id(), current.seat_number()))?;

        self.bounded(
            "set_reservation_status",
            tx.set_reservation_status(reservation_id, current.status()),
        )
        .await?;
        self.bounded("set_seat_availability", tx.set_seat_availability(seat_id, true))
            .await?;
        Ok(())
    }

    /// コミットが接続断などで結果不明のまま失敗した場合、予約を読み直して
    /// 書き込みが反映済みなら成功として扱う
    async fn confirm_commit(
        &self,
        err: RepositoryError,
        reservation_id: ReservationId,
        expected: ReservationStatus,
    ) -> Result<(), ApplicationError> {
        let err = ApplicationError::from(err);
        if err.kind() != ErrorKind::Unavailable {
            return Err(err);
        }

        match self
            .bounded(
                "confirm_commit",
                self.reservation_repository.find_by_id(reservation_id),
            )
            .await
        {
            Ok(Some(stored)) if stored.status() == expected => {
                tracing::warn!(%reservation_id, error = %err, "commit reported failure but was applied");
                Ok(())
            }
            Ok(_) => Err(err),
            Err(recheck) => {
                tracing::warn!(%reservation_id, error = %recheck, "could not confirm commit outcome");
                Err(err)
            }
        }
    }

    /// 未確定のトランザクションを破棄する
    /// ロールバック自体の失敗は元のエラーを優先してログのみ残す
    async fn discard(&self, tx: Box<dyn SeatTransaction>) {
        match tokio::time::timeout(self.store_timeout, tx.rollback()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::error!(error = %err, "rollback failed"),
            Err(_elapsed) => tracing::error!("rollback timed out"),
        }
    }
}

fn rejected(err: DomainError, club_id: &ClubId, seat_number: SeatNumber) -> ApplicationError {
    tracing::info!(%club_id, %seat_number, reason = %err, "request rejected");
    ApplicationError::from(err)
}

/// クラブ・座席管理サービス
/// 予約エンジンが書き換えるフィールド以外を管理する。
/// 座席の追加や削除はクラブトランザクション内で行い、同じクラブへの変更と予約確定を直列化する
pub struct ClubApplicationService {
    club_repository: Arc<dyn ClubRepository>,
    seat_repository: Arc<dyn SeatRepository>,
    transactions: Arc<dyn ClubTransactionManager>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl ClubApplicationService {
    /// 新しいクラブアプリケーションサービスを作成
    ///
    /// # Arguments
    /// * `club_repository` - クラブリポジトリ
    /// * `seat_repository` - 座席リポジトリ
    /// * `transactions` - クラブトランザクションの開始口
    /// * `clock` - 削除可否の判定に使う時刻の供給源
    pub fn new(
        club_repository: Arc<dyn ClubRepository>,
        seat_repository: Arc<dyn SeatRepository>,
        transactions: Arc<dyn ClubTransactionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            club_repository,
            seat_repository,
            transactions,
            clock,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, ApplicationError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        within_timeout(self.store_timeout, operation, call).await
    }

    /// クラブを登録する
    ///
    /// # Arguments
    /// * `name` - クラブ名
    /// * `address` - 住所
    /// * `price_per_hour` - 時間料金
    ///
    /// # Returns
    /// * `Ok(Club)` - 登録されたクラブ
    /// * `Err(ApplicationError)` - 入力不正または保存失敗
    pub async fn register_club(
        &self,
        name: String,
        address: String,
        price_per_hour: Money,
    ) -> Result<Club, ApplicationError> {
        let club = Club::new(ClubId::generate(), name, address, price_per_hour)?;
        self.bounded("insert_club", self.club_repository.insert(&club))
            .await?;
        tracing::info!(club_id = %club.id(), name = club.name(), "club registered");
        Ok(club)
    }

    /// クラブの名前・住所・時間料金を更新する
    /// 既存の予約の料金は作成時に確定しているため変わらない
    pub async fn update_club(
        &self,
        club_id: &ClubId,
        name: String,
        address: String,
        price_per_hour: Money,
    ) -> Result<Club, ApplicationError> {
        let mut tx = self.begin(club_id).await?;
        let staged = self
            .stage_club_update(tx.as_mut(), name, address, price_per_hour)
            .await;
        let club = self.finish(tx, staged).await?;

        tracing::info!(%club_id, price_per_hour = club.price_per_hour().amount(), "club updated");
        Ok(club)
    }

    /// クラブとその座席を削除する
    /// 終了していない有効な予約が残っている間は `FailedPrecondition`。予約履歴は残る
    pub async fn delete_club(&self, club_id: &ClubId) -> Result<(), ApplicationError> {
        let now = self.clock.now();
        let mut tx = self.begin(club_id).await?;
        let staged = self.stage_club_removal(tx.as_mut(), club_id, now).await;
        self.finish(tx, staged).await?;

        tracing::info!(%club_id, "club deleted");
        Ok(())
    }

    async fn stage_club_update(
        &self,
        tx: &mut dyn ClubTransaction,
        name: String,
        address: String,
        price_per_hour: Money,
    ) -> Result<Club, ApplicationError> {
        let mut club = self.bounded("lock_club", tx.club()).await?;
        club.update_details(name, address, price_per_hour)?;
        self.bounded("save_club", tx.save_club(&club)).await?;
        Ok(club)
    }

    async fn stage_club_removal(
        &self,
        tx: &mut dyn ClubTransaction,
        club_id: &ClubId,
        now: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        let active = self
            .bounded("count_active_reservations", tx.count_active_reservations(None, now))
            .await?;
        if active > 0 {
            tracing::info!(%club_id, active, "club deletion refused");
            return Err(DomainError::ActiveReservationsExist(active).into());
        }
        self.bounded("delete_club", tx.delete_club()).await
    }

    /// クラブに座席を追加する
    /// 新しい座席は現在の最大番号の次から連番で採番され、利用可能な状態で作成される。
    /// 採番から保存までクラブトランザクション内で行うため、同時に追加しても番号は重複しない
    ///
    /// # Arguments
    /// * `club_id` - クラブID
    /// * `count` - 追加する座席数（1以上 `MAX_SEATS_PER_REQUEST` 以下）
    /// * `description` - 座席の説明
    ///
    /// # Returns
    /// * `Ok(Vec<Seat>)` - 追加された座席
    /// * `Err(ApplicationError)` - クラブが存在しない、入力不正、保存失敗
    pub async fn add_seats(
        &self,
        club_id: &ClubId,
        count: u32,
        description: String,
    ) -> Result<Vec<Seat>, ApplicationError> {
        if count == 0 || count > MAX_SEATS_PER_REQUEST {
            return Err(DomainError::InvalidValue(format!(
                "追加する座席数は1以上{}以下である必要があります: {}",
                MAX_SEATS_PER_REQUEST, count
            ))
            .into());
        }

        let mut tx = self.begin(club_id).await?;
        let staged = self
            .stage_seats(tx.as_mut(), club_id, count, &description)
            .await;
        let added = self.finish(tx, staged).await?;

        tracing::info!(%club_id, added = added.len(), "seats added");
        Ok(added)
    }

    async fn stage_seats(
        &self,
        tx: &mut dyn ClubTransaction,
        club_id: &ClubId,
        count: u32,
        description: &str,
    ) -> Result<Vec<Seat>, ApplicationError> {
        let mut club = self.bounded("lock_club", tx.club()).await?;
        let existing = self.bounded("find_seats", tx.seats()).await?;

        let mut number = match existing.iter().map(Seat::seat_number).max() {
            Some(highest) => highest.next()?,
            None => SeatNumber::new(1)?,
        };

        let mut added = Vec::new();
        for index in 0..count {
            if index > 0 {
                number = number.next()?;
            }
            added.push(Seat::new(
                SeatId::new(),
                club_id.clone(),
                number,
                description.to_string(),
            ));
        }
        self.bounded("insert_seats", tx.insert_seats(&added)).await?;

        let available = existing
            .iter()
            .chain(added.iter())
            .filter(|seat| seat.is_available())
            .count() as u32;
        club.set_available_seat_count(available);
        self.bounded("save_club", tx.save_club(&club)).await?;
        Ok(added)
    }

    /// 座席の説明を更新する
    /// 利用可能フラグは予約エンジンだけが書き換えるため、ここでは変更しない
    pub async fn update_seat(
        &self,
        seat_id: SeatId,
        description: String,
    ) -> Result<Seat, ApplicationError> {
        let not_found = || ApplicationError::NotFound(format!("座席が見つかりません: {}", seat_id));

        self.bounded("find_seat", self.seat_repository.find_by_id(seat_id))
            .await?
            .ok_or_else(not_found)?;
        self.bounded(
            "update_seat_description",
            self.seat_repository.update_description(seat_id, &description),
        )
        .await?;

        // 同時に削除された場合は NotFound
        let seat = self
            .bounded("find_seat", self.seat_repository.find_by_id(seat_id))
            .await?
            .ok_or_else(not_found)?;
        tracing::info!(%seat_id, "seat updated");
        Ok(seat)
    }

    /// 座席を削除する
    /// その座席に終了していない有効な予約がある間は `FailedPrecondition`
    pub async fn delete_seat(&self, seat_id: SeatId) -> Result<(), ApplicationError> {
        let seat = self
            .bounded("find_seat", self.seat_repository.find_by_id(seat_id))
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("座席が見つかりません: {}", seat_id)))?;

        let now = self.clock.now();
        let mut tx = self.begin(seat.club_id()).await?;
        let staged = self.stage_seat_removal(tx.as_mut(), seat_id, now).await;
        self.finish(tx, staged).await?;

        tracing::info!(%seat_id, club_id = %seat.club_id(), seat_number = %seat.seat_number(), "seat deleted");
        Ok(())
    }

    async fn stage_seat_removal(
        &self,
        tx: &mut dyn ClubTransaction,
        seat_id: SeatId,
        now: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        let seats = self.bounded("find_seats", tx.seats()).await?;
        let seat = seats
            .iter()
            .find(|seat| seat.id() == seat_id)
            .ok_or_else(|| ApplicationError::NotFound(format!("座席が見つかりません: {}", seat_id)))?;

        let active = self
            .bounded(
                "count_active_reservations",
                tx.count_active_reservations(Some(seat.seat_number()), now),
            )
            .await?;
        if active > 0 {
            tracing::info!(%seat_id, active, "seat deletion refused");
            return Err(DomainError::ActiveReservationsExist(active).into());
        }

        self.bounded("delete_seat", tx.delete_seat(seat_id)).await?;

        let mut club = self.bounded("lock_club", tx.club()).await?;
        let available = seats
            .iter()
            .filter(|other| other.id() != seat_id && other.is_available())
            .count() as u32;
        club.set_available_seat_count(available);
        self.bounded("save_club", tx.save_club(&club)).await
    }

    async fn begin(&self, club_id: &ClubId) -> Result<Box<dyn ClubTransaction>, ApplicationError> {
        self.bounded("begin_club_transaction", self.transactions.begin_club(club_id))
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("クラブが見つかりません: {}", club_id)))
    }

    /// 準備が成功していればコミット、失敗していればロールバックする
    /// コミットは予約の確定と同じく制限時間で打ち切らない
    async fn finish<T>(
        &self,
        tx: Box<dyn ClubTransaction>,
        staged: Result<T, ApplicationError>,
    ) -> Result<T, ApplicationError> {
        match staged {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                match tokio::time::timeout(self.store_timeout, tx.rollback()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(rollback)) => tracing::error!(error = %rollback, "rollback failed"),
                    Err(_elapsed) => tracing::error!("rollback timed out"),
                }
                Err(err)
            }
        }
    }
}
