use rust_decimal::Decimal;

use crate::error::{AppError, Result};
use crate::models::{Subscription, SubscriptionDetail, SubscriptionSummary};
use crate::observability::{get_metrics, mask_sensitive};
use crate::repositories::{DbPool, ServiceRepository, SubscriptionRepository};
use crate::services::DiscountService;

/// Subscription lifecycle and billing summaries.
#[derive(Debug, Clone)]
pub struct SubscriptionService {
    service_repo: ServiceRepository,
    subscription_repo: SubscriptionRepository,
    discounts: DiscountService,
}

impl SubscriptionService {
    pub fn new(pool: DbPool) -> Self {
        Self {
            service_repo: ServiceRepository::new(pool.clone()),
            subscription_repo: SubscriptionRepository::new(pool),
            discounts: DiscountService::new(),
        }
    }

    /// Subscribes a customer to a service.
    pub async fn subscribe(
        &self,
        customer_phone_number: &str,
        service_id: i32,
        duration_months: i32,
    ) -> Result<Subscription> {
        let service = self
            .service_repo
            .find_by_id(service_id)
            .await?
            .ok_or(AppError::ServiceNotFound(service_id))?;
        let service_name = service.name.clone();

        let subscription = self
            .subscription_repo
            .insert_unique(Subscription::new(customer_phone_number, service, duration_months))
            .await?;

        tracing::info!(
            subscription_id = subscription.id,
            customer = %mask_sensitive(customer_phone_number, 3),
            service = %service_name,
            "Subscription created"
        );
        let metrics = get_metrics();
        metrics.record_subscription_created(&service_name);
        metrics.set_active_subscriptions(self.subscription_repo.count().await?);

        Ok(subscription)
    }

    /// Removes a customer's subscription to a service.
    pub async fn unsubscribe(&self, customer_phone_number: &str, service_id: i32) -> Result<()> {
        let service = self
            .service_repo
            .find_by_id(service_id)
            .await?
            .ok_or(AppError::ServiceNotFound(service_id))?;

        if !self
            .subscription_repo
            .delete(customer_phone_number, service_id)
            .await?
        {
            return Err(AppError::SubscriptionNotFound {
                customer_phone_number: customer_phone_number.to_string(),
                service_name: service.name,
            });
        }

        tracing::info!(
            customer = %mask_sensitive(customer_phone_number, 3),
            service = %service.name,
            "Subscription removed"
        );
        let metrics = get_metrics();
        metrics.record_subscription_removed(&service.name);
        metrics.set_active_subscriptions(self.subscription_repo.count().await?);

        Ok(())
    }

    /// Builds the billing summary for a customer, discounts applied.
    pub async fn summary(&self, customer_phone_number: &str) -> Result<SubscriptionSummary> {
        let subscriptions = self
            .subscription_repo
            .find_by_customer(customer_phone_number)
            .await?;

        let details: Vec<SubscriptionDetail> = subscriptions
            .iter()
            .filter_map(|s| {
                s.service.as_ref().map(|service| SubscriptionDetail {
                    service_name: service.name.clone(),
                    duration_months: s.duration_months,
                    monthly_price: service.monthly_price,
                })
            })
            .collect();

        let total_cost_before_discounts: Decimal = details
            .iter()
            .map(|d| d.monthly_price * Decimal::from(d.duration_months))
            .sum();

        let applied_discounts = self.discounts.calculate(&subscriptions);
        let total_discounts: Decimal = applied_discounts.iter().map(|d| d.amount).sum();

        let metrics = get_metrics();
        for discount in &applied_discounts {
            metrics.record_discount_applied(&discount.discount_name);
        }

        Ok(SubscriptionSummary {
            customer_phone_number: customer_phone_number.to_string(),
            subscriptions: details,
            total_cost_before_discounts,
            total_discounts,
            final_cost: total_cost_before_discounts - total_discounts,
            applied_discounts,
        })
    }
}
