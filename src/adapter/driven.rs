// 駆動される側アダプター（リポジトリ実装など）

mod clock;
mod in_memory_store;
mod mysql_club_repository;
mod mysql_club_transaction;
mod mysql_reservation_repository;
mod mysql_seat_repository;
mod mysql_seat_transaction;

pub use clock::{FixedClock, SystemClock};
pub use in_memory_store::{InMemoryClubTransaction, InMemorySeatTransaction, InMemoryStore};
pub use mysql_club_repository::MySqlClubRepository;
pub use mysql_club_transaction::{MySqlClubTransaction, MySqlClubTransactionManager};
pub use mysql_reservation_repository::MySqlReservationRepository;
pub use mysql_seat_repository::MySqlSeatRepository;
pub use mysql_seat_transaction::{MySqlSeatTransaction, MySqlSeatTransactionManager};
