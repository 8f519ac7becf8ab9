pub mod service;
pub mod subscription;
pub mod summary;

pub use service::{Service, ServiceName};
pub use subscription::Subscription;
pub use summary::{DiscountDetail, SubscriptionDetail, SubscriptionSummary};
