use crate::adapter::database_error::repository_error;
use crate::domain::model::{
    ClubId, Money, Reservation, ReservationId, ReservationStatus, SeatNumber, UserId,
};
use crate::domain::port::{RepositoryError, ReservationRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};

pub(crate) const RESERVATION_COLUMNS: &str =
    "id, club_id, seat_number, user_id, start_time, end_time, total_price, status, created_at";

/// MySQL予約リポジトリ（読み取り）
/// 書き込みは座席トランザクションが行う
#[derive(Clone)]
pub struct MySqlReservationRepository {
    pool: Pool<MySql>,
}

impl MySqlReservationRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

fn corrupt(field: &str, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::FetchFailed(format!("{}の解析に失敗しました: {}", field, err))
}

/// 行から予約を復元する
/// 保存値がドメインの制約を満たさない場合は `FetchFailed`
pub(crate) fn reservation_from_row(row: &MySqlRow) -> Result<Reservation, RepositoryError> {
    let id: String = row.try_get("id").map_err(repository_error)?;
    let club_id: String = row.try_get("club_id").map_err(repository_error)?;
    let seat_number: u32 = row.try_get("seat_number").map_err(repository_error)?;
    let user_id: String = row.try_get("user_id").map_err(repository_error)?;
    let start_time: DateTime<Utc> = row.try_get("start_time").map_err(repository_error)?;
    let end_time: DateTime<Utc> = row.try_get("end_time").map_err(repository_error)?;
    let total_price: i64 = row.try_get("total_price").map_err(repository_error)?;
    let status: String = row.try_get("status").map_err(repository_error)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(repository_error)?;

    Reservation::reconstruct(
        ReservationId::from_string(&id).map_err(|e| corrupt("予約ID", e))?,
        ClubId::new(club_id).map_err(|e| corrupt("クラブID", e))?,
        SeatNumber::new(seat_number).map_err(|e| corrupt("座席番号", e))?,
        UserId::new(user_id).map_err(|e| corrupt("利用者ID", e))?,
        start_time,
        end_time,
        Money::new(total_price),
        ReservationStatus::from_string(&status).map_err(|e| corrupt("ステータス", e))?,
        created_at,
    )
    .map_err(|e| corrupt("予約時間帯", e))
}

#[async_trait]
impl ReservationRepository for MySqlReservationRepository {
    async fn find_by_id(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Option<Reservation>, RepositoryError> {
        let sql = format!("SELECT {} FROM reservations WHERE id = ?", RESERVATION_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(reservation_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(repository_error)?;

        row.as_ref().map(reservation_from_row).transpose()
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Reservation>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM reservations WHERE user_id = ? ORDER BY start_time ASC",
            RESERVATION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(repository_error)?;

        rows.iter().map(reservation_from_row).collect()
    }
}
