pub mod app_config;
pub mod database;
pub mod error;
pub mod flight_repo;
pub mod booking_repo;
pub mod memory;
pub mod redis_repo;
pub mod mailer;
pub mod queue;
#[cfg(feature = "kafka")]
pub mod events;

pub use database::DbClient;
pub use error::StoreError;
pub use flight_repo::PostgresFlightRepository;
pub use booking_repo::PostgresBookingRepository;
pub use memory::MemoryStore;
pub use redis_repo::RedisClient;
pub use mailer::{ConsoleMailer, SmtpMailer};
pub use queue::LocalReportQueue;
#[cfg(feature = "kafka")]
pub use events::EventProducer;
