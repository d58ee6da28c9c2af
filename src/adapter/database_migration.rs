use crate::adapter::database_error::DatabaseError;
use sqlx::{MySql, Pool};

/// 適用順に並べたマイグレーション
const MIGRATIONS: [(&str, &str); 4] = [
    (
        "001_create_raffles_table",
        include_str!("../../migrations/001_create_raffles_table.sql"),
    ),
    (
        "002_create_raffle_numbers_table",
        include_str!("../../migrations/002_create_raffle_numbers_table.sql"),
    ),
    (
        "003_create_raffle_number_overrides_table",
        include_str!("../../migrations/003_create_raffle_number_overrides_table.sql"),
    ),
    (
        "004_create_payment_settlements_table",
        include_str!("../../migrations/004_create_payment_settlements_table.sql"),
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
        for (name, migration_sql) in MIGRATIONS {
            tracing::info!(migration = name, "マイグレーションを実行します");
            sqlx::query(migration_sql)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::MigrationError(format!("{} failed: {}", name, e)))?;
        }

        tracing::info!(count = MIGRATIONS.len(), "すべてのマイグレーションが完了しました");
        Ok(())
    }
}
