use crate::adapter::database_error::DatabaseError;
use sqlx::{MySql, Pool};

/// 適用順に並べたマイグレーション
const MIGRATIONS: [(&str, &str); 3] = [
    (
        "001_create_clubs_table",
        include_str!("../../migrations/001_create_clubs_table.sql"),
    ),
    (
        "002_create_seats_table",
        include_str!("../../migrations/002_create_seats_table.sql"),
    ),
    (
        "003_create_reservations_table",
        include_str!("../../migrations/003_create_reservations_table.sql"),
    ),
];

/// データベースマイグレーションを管理する構造体
pub struct DatabaseMigration {
    pool: Pool<MySql>,
}

impl DatabaseMigration {
    /// 新しいDatabaseMigrationインスタンスを作成
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// マイグレーションを実行
    /// べき等性を保証（CREATE TABLE IF NOT EXISTS）
    pub async fn run(&self) -> Result<(), DatabaseError> {
        for (name, migration_sql) in MIGRATIONS.iter() {
            tracing::debug!(migration = name, "running migration");
            sqlx::query(migration_sql)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::MigrationError(format!("{} failed: {}", name, e)))?;
        }

        tracing::info!(count = MIGRATIONS.len(), "migrations applied");
        Ok(())
    }
}
