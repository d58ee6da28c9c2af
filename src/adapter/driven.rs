// 駆動される側アダプター（リポジトリ実装など）

mod clock;
mod event_publisher;
mod in_memory_raffle_number_repository;
mod payment_settlement_repository;
mod raffle_lookup;
mod raffle_number_repository;
mod ticket_minter;
mod tracing_logger;

pub use clock::{ManualClock, SystemClock};
pub use event_publisher::TracingEventPublisher;
pub use in_memory_raffle_number_repository::{InMemoryRaffleNumberRepository, OverrideRecord};
pub use payment_settlement_repository::{
    InMemoryPaymentSettlementRepository, MySqlPaymentSettlementRepository,
};
pub use raffle_lookup::{InMemoryRaffleLookup, MySqlRaffleLookup};
pub use raffle_number_repository::MySqlRaffleNumberRepository;
pub use ticket_minter::UuidTicketMinter;
pub use tracing_logger::{format_context, TracingLogger};
