use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalogue names that discount rules refer to.
pub struct ServiceName;

impl ServiceName {
    pub const ELEARNING_PORTAL: &'static str = "eLearning Portal";
    pub const HEALTH_AND_LIFESTYLE: &'static str = "Health&Lifestyle";
    pub const GAMING_CATALOGUE: &'static str = "Gaming+ Catalogue";
    pub const MAGAZINES_AND_NEWS: &'static str = "Magazines and News";
}

/// A subscribable service with a fixed monthly price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: i32,
    pub name: String,
    pub monthly_price: Decimal,
}

impl Service {
    pub fn new(id: i32, name: impl Into<String>, monthly_price: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            monthly_price,
        }
    }

    /// Price of `months` months of this service.
    pub fn cost_for(&self, months: i32) -> Decimal {
        self.monthly_price * Decimal::from(months)
    }

    /// The catalogue every fresh store starts with.
    pub fn seed_catalogue() -> Vec<Service> {
        vec![
            Service::new(1, ServiceName::ELEARNING_PORTAL, Decimal::new(10, 0)),
            Service::new(2, ServiceName::HEALTH_AND_LIFESTYLE, Decimal::new(12, 0)),
            Service::new(3, ServiceName::GAMING_CATALOGUE, Decimal::new(15, 0)),
            Service::new(4, ServiceName::MAGAZINES_AND_NEWS, Decimal::new(8, 0)),
        ]
    }
}
