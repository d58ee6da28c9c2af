// ドメインモデル（エンティティと値オブジェクト）

mod value_objects;
mod raffle_number;
mod raffle;
mod force_sale;

pub use value_objects::{
    RaffleId, RaffleNumberId, UserId, TicketId,
    Actor, SystemPrincipal,
    NumberStatus, NumberSelection, NumberCounts,
    HoldTtl,
};

pub use raffle_number::{AuditStamp, RaffleNumber};
pub use raffle::RaffleInfo;
pub use force_sale::{
    ForceSaleAudit, ForceSaleReason, ForceSaleResult, OverriddenNumber, MAX_SOURCE_EVENT_ID_LEN,
};
