pub mod database;
pub mod service_repository;
pub mod subscription_repository;

pub use database::Database;
pub use service_repository::ServiceRepository;
pub use subscription_repository::SubscriptionRepository;

/// Shared handle to the domain store.
pub type DbPool = Database;
