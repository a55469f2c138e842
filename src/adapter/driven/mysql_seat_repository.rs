use crate::adapter::database_error::repository_error;
use crate::domain::model::{ClubId, Seat, SeatId, SeatNumber};
use crate::domain::port::{RepositoryError, SeatRepository};
use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};

pub(crate) const SEAT_COLUMNS: &str = "id, club_id, seat_number, description, available";

/// MySQL座席リポジトリ
#[derive(Clone)]
pub struct MySqlSeatRepository {
    pool: Pool<MySql>,
}

impl MySqlSeatRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

pub(crate) fn seat_from_row(row: &MySqlRow) -> Result<Seat, RepositoryError> {
    let id: String = row.try_get("id").map_err(repository_error)?;
    let seat_id = SeatId::from_string(&id)
        .map_err(|e| RepositoryError::FetchFailed(format!("座席IDの解析に失敗しました: {}", e)))?;
    let club_id = ClubId::new(row.try_get::<String, _>("club_id").map_err(repository_error)?)
        .map_err(|e| RepositoryError::FetchFailed(e.to_string()))?;
    let seat_number = SeatNumber::new(row.try_get::<u32, _>("seat_number").map_err(repository_error)?)
        .map_err(|e| RepositoryError::FetchFailed(e.to_string()))?;

    Ok(Seat::reconstruct(
        seat_id,
        club_id,
        seat_number,
        row.try_get("description").map_err(repository_error)?,
        row.try_get("available").map_err(repository_error)?,
    ))
}

#[async_trait]
impl SeatRepository for MySqlSeatRepository {
    async fn find_by_id(&self, seat_id: SeatId) -> Result<Option<Seat>, RepositoryError> {
        let sql = format!("SELECT {} FROM seats WHERE id = ?", SEAT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(seat_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(repository_error)?;

        row.as_ref().map(seat_from_row).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Seat>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM seats ORDER BY club_id ASC, seat_number ASC",
            SEAT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(repository_error)?;

        rows.iter().map(seat_from_row).collect()
    }

    async fn update_description(
        &self,
        seat_id: SeatId,
        description: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE seats SET description = ? WHERE id = ?")
            .bind(description)
            .bind(seat_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(repository_error)?;

        Ok(())
    }

    async fn find_by_club_and_number(
        &self,
        club_id: &ClubId,
        seat_number: SeatNumber,
    ) -> Result<Option<Seat>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM seats WHERE club_id = ? AND seat_number = ?",
            SEAT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(club_id.as_str())
            .bind(seat_number.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(repository_error)?;

        row.as_ref().map(seat_from_row).transpose()
    }

    async fn find_by_club(&self, club_id: &ClubId) -> Result<Vec<Seat>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM seats WHERE club_id = ? ORDER BY seat_number ASC",
            SEAT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(club_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(repository_error)?;

        rows.iter().map(seat_from_row).collect()
    }
}
