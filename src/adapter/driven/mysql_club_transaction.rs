use crate::adapter::database_error::repository_error;
use crate::adapter::driven::mysql_club_repository::{club_from_row, CLUB_COLUMNS};
use crate::adapter::driven::mysql_seat_repository::{seat_from_row, SEAT_COLUMNS};
use crate::domain::model::{Club, ClubId, ReservationStatus, Seat, SeatId, SeatNumber};
use crate::domain::port::{ClubTransaction, ClubTransactionManager, RepositoryError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, Pool, Transaction};

/// MySQLクラブトランザクションの開始口
/// クラブ行と全座席行を `SELECT ... FOR UPDATE` でロックしてから処理を始める
#[derive(Clone)]
pub struct MySqlClubTransactionManager {
    pool: Pool<MySql>,
}

impl MySqlClubTransactionManager {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClubTransactionManager for MySqlClubTransactionManager {
    async fn begin_club(
        &self,
        club_id: &ClubId,
    ) -> Result<Option<Box<dyn ClubTransaction>>, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(repository_error)?;

        let locked: Option<String> =
            sqlx::query_scalar("SELECT id FROM clubs WHERE id = ? FOR UPDATE")
                .bind(club_id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(repository_error)?;
        if locked.is_none() {
            return Ok(None);
        }

        // 座席行もロックし、進行中の座席トランザクションの確定を待つ
        let seat_ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM seats WHERE club_id = ? ORDER BY seat_number ASC FOR UPDATE",
        )
        .bind(club_id.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(repository_error)?;

        tracing::debug!(%club_id, seats = seat_ids.len(), "club and seat rows locked");
        Ok(Some(Box::new(MySqlClubTransaction {
            club_id: club_id.clone(),
            tx,
        })))
    }
}

/// クラブ行と座席行のロックを保持したMySQLトランザクション
pub struct MySqlClubTransaction {
    club_id: ClubId,
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl ClubTransaction for MySqlClubTransaction {
    async fn club(&mut self) -> Result<Club, RepositoryError> {
        let sql = format!("SELECT {} FROM clubs WHERE id = ?", CLUB_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(self.club_id.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(repository_error)?;

        club_from_row(&row)
    }

    async fn seats(&mut self) -> Result<Vec<Seat>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM seats WHERE club_id = ? ORDER BY seat_number ASC",
            SEAT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(self.club_id.as_str())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(repository_error)?;

        rows.iter().map(seat_from_row).collect()
    }

    async fn count_active_reservations(
        &mut self,
        seat_number: Option<SeatNumber>,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        // 共有ロック付きの読み取りで、直前に確定した予約も確実に数える
        let count: i64 = match seat_number {
            Some(seat_number) => sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM reservations
                WHERE club_id = ? AND seat_number = ? AND status = ? AND end_time > ?
                LOCK IN SHARE MODE
                "#,
            )
            .bind(self.club_id.as_str())
            .bind(seat_number.value())
            .bind(ReservationStatus::Active.to_string())
            .bind(now)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(repository_error)?,
            None => sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM reservations
                WHERE club_id = ? AND status = ? AND end_time > ?
                LOCK IN SHARE MODE
                "#,
            )
            .bind(self.club_id.as_str())
            .bind(ReservationStatus::Active.to_string())
            .bind(now)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(repository_error)?,
        };

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn insert_seats(&mut self, seats: &[Seat]) -> Result<(), RepositoryError> {
        for seat in seats {
            sqlx::query(
                r#"
                INSERT INTO seats (id, club_id, seat_number, description, available)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(seat.id().to_string())
            .bind(seat.club_id().as_str())
            .bind(seat.seat_number().value())
            .bind(seat.description())
            .bind(seat.is_available())
            .execute(&mut *self.tx)
            .await
            .map_err(repository_error)?;
        }
        Ok(())
    }

    async fn delete_seat(&mut self, seat_id: SeatId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM seats WHERE id = ? AND club_id = ?")
            .bind(seat_id.to_string())
            .bind(self.club_id.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(repository_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::ConstraintViolation(format!(
                "削除対象の座席が存在しません: {}",
                seat_id
            )));
        }
        Ok(())
    }

    async fn save_club(&mut self, club: &Club) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE clubs
            SET name = ?, address = ?, price_per_hour = ?, available_seat_count = ?
            WHERE id = ?
            "#,
        )
        .bind(club.name())
        .bind(club.address())
        .bind(club.price_per_hour().amount())
        .bind(club.available_seat_count())
        .bind(self.club_id.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(repository_error)?;

        Ok(())
    }

    async fn delete_club(&mut self) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM seats WHERE club_id = ?")
            .bind(self.club_id.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(repository_error)?;
        sqlx::query("DELETE FROM clubs WHERE id = ?")
            .bind(self.club_id.as_str())
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
