pub mod catalog_service;
pub mod discount_service;
pub mod subscription_service;

pub use catalog_service::CatalogService;
pub use discount_service::DiscountService;
pub use subscription_service::SubscriptionService;
