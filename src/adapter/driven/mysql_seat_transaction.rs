use crate::adapter::database_error::repository_error;
use crate::adapter::driven::mysql_reservation_repository::{
    reservation_from_row, RESERVATION_COLUMNS,
};
use crate::domain::model::{
    ClubId, Reservation, ReservationId, ReservationStatus, SeatId, SeatNumber, TimeWindow,
};
use crate::domain::port::{RepositoryError, SeatTransaction, SeatTransactionManager};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, Pool, Transaction};

/// MySQL座席トランザクションの開始口
/// 座席行を `SELECT ... FOR UPDATE` でロックしてから処理を始める
#[derive(Clone)]
pub struct MySqlSeatTransactionManager {
    pool: Pool<MySql>,
}

impl MySqlSeatTransactionManager {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SeatTransactionManager for MySqlSeatTransactionManager {
    async fn begin(&self, seat_id: SeatId) -> Result<Box<dyn SeatTransaction>, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(repository_error)?;

        let locked: Option<String> = sqlx::query_scalar("SELECT id FROM seats WHERE id = ? FOR UPDATE")
            .bind(seat_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(repository_error)?;

        if locked.is_none() {
            // txはここで破棄されロールバックされる
            return Err(RepositoryError::ConstraintViolation(format!(
                "ロック対象の座席が存在しません: {}",
                seat_id
            )));
        }

        tracing::debug!(%seat_id, "seat row locked");
        Ok(Box::new(MySqlSeatTransaction { tx }))
    }
}

/// 座席行ロックを保持したMySQLトランザクション
/// コミットせずに破棄した場合はsqlxがロールバックする
pub struct MySqlSeatTransaction {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl SeatTransaction for MySqlSeatTransaction {
    async fn find_active_overlap(
        &mut self,
        club_id: &ClubId,
        seat_number: SeatNumber,
        window: &TimeWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {} FROM reservations
            WHERE club_id = ? AND seat_number = ? AND status = ?
              AND end_time > ?
              AND start_time < ? AND end_time > ?
            "#,
            RESERVATION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(club_id.as_str())
            .bind(seat_number.value())
            .bind(ReservationStatus::Active.to_string())
            .bind(now)
            .bind(window.end())
            .bind(window.start())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(repository_error)?;

        rows.iter().map(reservation_from_row).collect()
    }

    async fn find_reservation(
        &mut self,
        reservation_id: ReservationId,
    ) -> Result<Option<Reservation>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM reservations WHERE id = ? FOR UPDATE",
            RESERVATION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(reservation_id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(repository_error)?;

        row.as_ref().map(reservation_from_row).transpose()
    }

    async fn insert_reservation(
        &mut self,
        reservation: &Reservation,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO reservations
                (id, club_id, seat_number, user_id, start_time, end_time, total_price, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(reservation.id().to_string())
        .bind(reservation.club_id().as_str())
        .bind(reservation.seat_number().value())
        .bind(reservation.user_id().as_str())
        .bind(reservation.start_time())
        .bind(reservation.end_time())
        .bind(reservation.total_price().amount())
        .bind(reservation.status().to_string())
        .bind(reservation.created_at())
        .execute(&mut *self.tx)
        .await
        .map_err(repository_error)?;

        Ok(())
    }

    async fn set_reservation_status(
        &mut self,
        reservation_id: ReservationId,
        status: ReservationStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE reservations SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(reservation_id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(repository_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::ConstraintViolation(format!(
                "更新対象の予約が存在しません: {}",
                reservation_id
            )));
        }
        Ok(())
    }

    async fn set_seat_availability(
        &mut self,
        seat_id: SeatId,
        available: bool,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE seats SET available = ? WHERE id = ?")
            .bind(available)
            .bind(seat_id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(repository_error)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await.map_err(repository_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.rollback().await.map_err(repository_error)
    }
}
