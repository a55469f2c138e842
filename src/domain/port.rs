// 出力ポート
// ドメイン層が外部に依存する機能をトレイトとして定義
// アダプター層でこれらのトレイトを実装する

use crate::domain::model::{
    Club, ClubId, Money, Reservation, ReservationId, ReservationStatus, Seat, SeatId, SeatNumber,
    TimeWindow, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// リポジトリエラー型
/// リポジトリ操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    /// データベース接続に失敗
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// 操作に失敗
    #[error("Operation failed: {0}")]
    OperationFailed(String),
    /// データの取得に失敗（保存データの復元に失敗した場合を含む）
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
    /// 時間内に完了しなかった（ロック待ちを含む）
    #[error("Timed out: {0}")]
    Timeout(String),
    /// 同時実行による競合でトランザクションが中断された
    #[error("Transaction conflict: {0}")]
    Conflict(String),
    /// 一意制約違反や対象行の欠落など、再試行しても成功しない失敗
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// 時刻の供給源
pub trait Clock: Send + Sync {
    /// 現在時刻を返す
    fn now(&self) -> DateTime<Utc>;
}

/// 料金参照トレイト
/// クラブの時間料金を解決する
#[async_trait]
pub trait PricingLookup: Send + Sync {
    /// クラブの時間料金を取得する
    ///
    /// # Returns
    /// * `Ok(Some(Money))` - 時間料金
    /// * `Ok(None)` - クラブが存在しない
    /// * `Err(RepositoryError)` - 取得失敗
    async fn club_rate(&self, club_id: &ClubId) -> Result<Option<Money>, RepositoryError>;
}

/// クラブリポジトリトレイト
#[async_trait]
pub trait ClubRepository: Send + Sync {
    /// 新しいクラブを登録する
    /// 既存のクラブの変更は `ClubTransaction` 経由で行う
    async fn insert(&self, club: &Club) -> Result<(), RepositoryError>;

    /// クラブIDでクラブを検索する
    async fn find_by_id(&self, club_id: &ClubId) -> Result<Option<Club>, RepositoryError>;

    /// すべてのクラブを取得する
    /// 名前の昇順で並べて返す
    async fn find_all(&self) -> Result<Vec<Club>, RepositoryError>;
}

/// 座席リポジトリトレイト
/// 座席の追加・削除は `ClubTransaction`、`available` の書き換えは `SeatTransaction` 経由でのみ行う
#[async_trait]
pub trait SeatRepository: Send + Sync {
    /// 座席IDで座席を検索する
    async fn find_by_id(&self, seat_id: SeatId) -> Result<Option<Seat>, RepositoryError>;

    /// すべての座席を取得する
    /// クラブID・座席番号の昇順で並べて返す
    async fn find_all(&self) -> Result<Vec<Seat>, RepositoryError>;

    /// 座席の説明を更新する
    /// 利用可能フラグには触れない
    async fn update_description(
        &self,
        seat_id: SeatId,
        description: &str,
    ) -> Result<(), RepositoryError>;

    /// クラブIDと座席番号で座席を検索する
    ///
    /// # Returns
    /// * `Ok(Some(Seat))` - 座席が見つかった
    /// * `Ok(None)` - 座席が見つからなかった
    /// * `Err(RepositoryError)` - 検索失敗
    async fn find_by_club_and_number(
        &self,
        club_id: &ClubId,
        seat_number: SeatNumber,
    ) -> Result<Option<Seat>, RepositoryError>;

    /// クラブの全座席を取得する
    /// 座席番号の昇順で並べて返す
    async fn find_by_club(&self, club_id: &ClubId) -> Result<Vec<Seat>, RepositoryError>;
}

/// 予約リポジトリトレイト（読み取り）
/// 書き込みは `SeatTransaction` 経由でのみ行う
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// 予約IDで予約を検索する
    async fn find_by_id(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Option<Reservation>, RepositoryError>;

    /// 利用者の全予約を取得する
    /// 開始時刻の昇順で並べて返す
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Reservation>, RepositoryError>;
}

/// 座席単位のトランザクション
/// 予約の挿入・ステータス更新と座席の利用可能フラグ更新を1つの単位で確定する。
/// コミットせずに破棄した場合はロールバックされる
#[async_trait]
pub trait SeatTransaction: Send {
    /// 指定座席・時間帯と重なる有効な予約を取得する
    /// 対象: 同じクラブ・座席番号、ステータスActive、終了時刻 > `now`、時間帯が重なる
    async fn find_active_overlap(
        &mut self,
        club_id: &ClubId,
        seat_number: SeatNumber,
        window: &TimeWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, RepositoryError>;

    /// トランザクション内で予約を再読み込みする
    async fn find_reservation(
        &mut self,
        reservation_id: ReservationId,
    ) -> Result<Option<Reservation>, RepositoryError>;

    /// 予約を挿入する
    async fn insert_reservation(&mut self, reservation: &Reservation)
        -> Result<(), RepositoryError>;

    /// 予約のステータスを更新する
    async fn set_reservation_status(
        &mut self,
        reservation_id: ReservationId,
        status: ReservationStatus,
    ) -> Result<(), RepositoryError>;

    /// 座席の利用可能フラグを更新する
    async fn set_seat_availability(
        &mut self,
        seat_id: SeatId,
        available: bool,
    ) -> Result<(), RepositoryError>;

    /// 変更を確定する
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;

    /// 変更を破棄する
    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// 座席トランザクションの開始口
#[async_trait]
pub trait SeatTransactionManager: Send + Sync {
    /// 座席の排他ロックを取得してトランザクションを開始する
    /// 同じ座席に対するトランザクションは直列化され、異なる座席同士は互いを待たない
    async fn begin(&self, seat_id: SeatId) -> Result<Box<dyn SeatTransaction>, RepositoryError>;
}

/// クラブ単位のトランザクション
/// クラブ行と所属する全座席の排他ロックを保持し、座席の追加・削除とクラブの更新・削除を
/// 1つの単位で確定する。コミットせずに破棄した場合はロールバックされる
#[async_trait]
pub trait ClubTransaction: Send {
    /// ロック中のクラブを読み込む
    async fn club(&mut self) -> Result<Club, RepositoryError>;

    /// クラブの全座席を取得する（座席番号の昇順）
    async fn seats(&mut self) -> Result<Vec<Seat>, RepositoryError>;

    /// 終了前のActiveな予約を数える
    /// `seat_number` が `None` の場合はクラブ全体が対象
    async fn count_active_reservations(
        &mut self,
        seat_number: Option<SeatNumber>,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;

    /// 新しい座席を挿入する。座席番号の重複は `ConstraintViolation`
    async fn insert_seats(&mut self, seats: &[Seat]) -> Result<(), RepositoryError>;

    /// 座席を削除する
    async fn delete_seat(&mut self, seat_id: SeatId) -> Result<(), RepositoryError>;

    /// クラブの属性（名前・住所・時間料金・表示用座席数）を保存する
    async fn save_club(&mut self, club: &Club) -> Result<(), RepositoryError>;

    /// クラブと全座席を削除する。予約履歴は残す
    async fn delete_club(&mut self) -> Result<(), RepositoryError>;

    /// 変更を確定する
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;

    /// 変更を破棄する
    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// クラブトランザクションの開始口
#[async_trait]
pub trait ClubTransactionManager: Send + Sync {
    /// クラブと全座席の排他ロックを取得してトランザクションを開始する
    /// 同じクラブに対するトランザクションは直列化され、座席トランザクションとも排他になる
    ///
    /// # Returns
    /// * `Ok(Some(tx))` - ロック取得済みのトランザクション
    /// * `Ok(None)` - クラブが存在しない
    async fn begin_club(
        &self,
        club_id: &ClubId,
    ) -> Result<Option<Box<dyn ClubTransaction>>, RepositoryError>;
}
