use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Service;

/// A customer's subscription to one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: i32,
    pub customer_phone_number: String,
    pub service_id: i32,
    pub service: Option<Service>,
    pub duration_months: i32,
    pub subscription_date: DateTime<Utc>,
}

impl Subscription {
    /// Creates an unsaved subscription; the store assigns `id`.
    pub fn new(customer_phone_number: impl Into<String>, service: Service, duration_months: i32) -> Self {
        Self {
            id: 0,
            customer_phone_number: customer_phone_number.into(),
            service_id: service.id,
            service: Some(service),
            duration_months,
            subscription_date: Utc::now(),
        }
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service.as_ref().map(|s| s.name.as_str())
    }

    pub fn belongs_to(&self, customer_phone_number: &str, service_id: i32) -> bool {
        self.customer_phone_number == customer_phone_number && self.service_id == service_id
    }
}
