use crate::domain::model::{RaffleId, TicketId, UserId};
use crate::domain::port::{TicketMinter, TicketMintingError};
use async_trait::async_trait;

/// UUIDチケット発行者
/// チケット管理を持たない構成で、決済ごとに新しいチケットIDを払い出す
pub struct UuidTicketMinter;

impl UuidTicketMinter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UuidTicketMinter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketMinter for UuidTicketMinter {
    async fn mint_ticket(
        &self,
        raffle_id: RaffleId,
        buyer: Option<UserId>,
    ) -> Result<TicketId, TicketMintingError> {
        let ticket = TicketId::new();
        tracing::debug!(
            raffle_id = %raffle_id,
            buyer = %buyer.map(|b| b.to_string()).unwrap_or_default(),
            ticket = %ticket,
            "チケットを発行しました"
        );
        Ok(ticket)
    }
}
