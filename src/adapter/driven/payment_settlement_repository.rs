use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{RaffleId, TicketId};
use crate::domain::port::{PaymentSettlementRepository, RepositoryError};
use async_trait::async_trait;
use sqlx::{MySql, Pool, Row};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// MySQL決済取引台帳
#[derive(Clone)]
pub struct MySqlPaymentSettlementRepository {
    pool: Pool<MySql>,
}

impl MySqlPaymentSettlementRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentSettlementRepository for MySqlPaymentSettlementRepository {
    async fn find_ticket(&self, transaction_id: &str) -> Result<Option<TicketId>, RepositoryError> {
        let row = sqlx::query("SELECT ticket_id FROM payment_settlements WHERE transaction_id = ?")
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("決済取引の取得に失敗しました: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let ticket: String = row
            .try_get("ticket_id")
            .map_err(|e| RepositoryError::FetchFailed(format!("決済取引の復元に失敗しました: {}", e)))?;
        TicketId::from_string(&ticket)
            .map(Some)
            .map_err(|e| RepositoryError::FetchFailed(format!("無効なチケットID {}: {}", ticket, e)))
    }

    async fn claim_ticket(
        &self,
        transaction_id: &str,
        raffle_id: RaffleId,
        ticket: TicketId,
    ) -> Result<TicketId, RepositoryError> {
        // 同じ取引が先に登録されていれば、そちらのチケットを使う
        sqlx::query(
            "INSERT IGNORE INTO payment_settlements (transaction_id, raffle_id, ticket_id) VALUES (?, ?, ?)",
        )
        .bind(transaction_id)
        .bind(raffle_id.to_string())
        .bind(ticket.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("決済取引の登録に失敗しました: {}", e)))?;

        self.find_ticket(transaction_id).await?.ok_or_else(|| {
            RepositoryError::OperationFailed(format!(
                "登録した決済取引が見つかりません: {}",
                transaction_id
            ))
        })
    }
}

/// インメモリ決済取引台帳
#[derive(Default)]
pub struct InMemoryPaymentSettlementRepository {
    tickets: Mutex<HashMap<String, (RaffleId, TicketId)>>,
}

impl InMemoryPaymentSettlementRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentSettlementRepository for InMemoryPaymentSettlementRepository {
    async fn find_ticket(&self, transaction_id: &str) -> Result<Option<TicketId>, RepositoryError> {
        Ok(self
            .tickets
            .lock()
            .await
            .get(transaction_id)
            .map(|(_, ticket)| *ticket))
    }

    async fn claim_ticket(
        &self,
        transaction_id: &str,
        raffle_id: RaffleId,
        ticket: TicketId,
    ) -> Result<TicketId, RepositoryError> {
        let mut tickets = self.tickets.lock().await;
        let (_, claimed) = tickets
            .entry(transaction_id.to_string())
            .or_insert((raffle_id, ticket));
        Ok(*claimed)
    }
}
