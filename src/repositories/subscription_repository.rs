use crate::error::{AppError, Result};
use crate::models::Subscription;
use crate::repositories::Database;

/// Repository for customer subscriptions.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    db: Database,
}

impl SubscriptionRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts a subscription unless the customer already holds one for the
    /// same service. The check and the insert happen under one write lock.
    pub async fn insert_unique(&self, mut subscription: Subscription) -> Result<Subscription> {
        let mut tables = self.db.write().await;

        let exists = tables
            .subscriptions
            .iter()
            .any(|s| s.belongs_to(&subscription.customer_phone_number, subscription.service_id));
        if exists {
            let service_name = subscription
                .service_name()
                .map(str::to_string)
                .unwrap_or_else(|| subscription.service_id.to_string());
            return Err(AppError::DuplicateSubscription {
                customer_phone_number: subscription.customer_phone_number,
                service_name,
            });
        }

        subscription.id = tables.next_subscription_id();
        tables.subscriptions.push(subscription.clone());

        Ok(subscription)
    }

    /// Lists a customer's subscriptions with their services attached.
    pub async fn find_by_customer(&self, customer_phone_number: &str) -> Result<Vec<Subscription>> {
        let tables = self.db.read().await;
        Ok(tables
            .subscriptions
            .iter()
            .filter(|s| s.customer_phone_number == customer_phone_number)
            .map(|s| {
                let mut subscription = s.clone();
                subscription.service = tables.services.get(&s.service_id).cloned();
                subscription
            })
            .collect())
    }

    /// Removes a subscription. Returns false if none matched.
    pub async fn delete(&self, customer_phone_number: &str, service_id: i32) -> Result<bool> {
        let mut tables = self.db.write().await;
        let before = tables.subscriptions.len();
        tables
            .subscriptions
            .retain(|s| !s.belongs_to(customer_phone_number, service_id));
        Ok(tables.subscriptions.len() < before)
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.db.read().await.subscriptions.len())
    }
}
