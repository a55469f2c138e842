use crate::adapter::database_error::repository_error;
use crate::domain::model::{Club, ClubId, Money};
use crate::domain::port::{ClubRepository, PricingLookup, RepositoryError};
use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};

pub(crate) const CLUB_COLUMNS: &str = "id, name, address, price_per_hour, available_seat_count";

/// MySQLクラブリポジトリ
/// クラブの永続化と時間料金の参照を担う
#[derive(Clone)]
pub struct MySqlClubRepository {
    pool: Pool<MySql>,
}

impl MySqlClubRepository {
    /// 新しいMySQLクラブリポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

pub(crate) fn club_from_row(row: &MySqlRow) -> Result<Club, RepositoryError> {
    let id: String = row.try_get("id").map_err(repository_error)?;
    let club_id = ClubId::new(id)
        .map_err(|e| RepositoryError::FetchFailed(format!("クラブIDの解析に失敗しました: {}", e)))?;

    Ok(Club::reconstruct(
        club_id,
        row.try_get("name").map_err(repository_error)?,
        row.try_get("address").map_err(repository_error)?,
        Money::new(row.try_get::<i64, _>("price_per_hour").map_err(repository_error)?),
        row.try_get::<u32, _>("available_seat_count")
            .map_err(repository_error)?,
    ))
}

#[async_trait]
impl ClubRepository for MySqlClubRepository {
    async fn insert(&self, club: &Club) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO clubs (id, name, address, price_per_hour, available_seat_count)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(club.id().as_str())
        .bind(club.name())
        .bind(club.address())
        .bind(club.price_per_hour().amount())
        .bind(club.available_seat_count())
        .execute(&self.pool)
        .await
        .map_err(repository_error)?;

        Ok(())
    }

    async fn find_by_id(&self, club_id: &ClubId) -> Result<Option<Club>, RepositoryError> {
        let sql = format!("SELECT {} FROM clubs WHERE id = ?", CLUB_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(club_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(repository_error)?;

        row.as_ref().map(club_from_row).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Club>, RepositoryError> {
        let sql = format!("SELECT {} FROM clubs ORDER BY name ASC, id ASC", CLUB_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(repository_error)?;

        rows.iter().map(club_from_row).collect()
    }
}

#[async_trait]
impl PricingLookup for MySqlClubRepository {
    async fn club_rate(&self, club_id: &ClubId) -> Result<Option<Money>, RepositoryError> {
        let rate: Option<i64> =
            sqlx::query_scalar("SELECT price_per_hour FROM clubs WHERE id = ?")
                .bind(club_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(repository_error)?;

        Ok(rate.map(Money::new))
    }
}
