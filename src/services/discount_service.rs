use rust_decimal::Decimal;

use crate::models::{DiscountDetail, ServiceName, Service, Subscription};

pub const SERVICE_PAIR_DISCOUNT: &str = "Service Pair Promotion (Health&Lifestyle + Magazines)";
pub const QUANTITY_DISCOUNT: &str = "Quantity-Based Discount (10% off for 3+ services)";
pub const BUNDLE_DISCOUNT: &str = "Bundle Discount (Gaming+ + eLearning)";

const QUANTITY_THRESHOLD: usize = 3;
const UPFRONT_MONTHS_THRESHOLD: i32 = 5;

/// Computes promotional discounts over one customer's subscriptions.
///
/// Rules are evaluated in a fixed order and each applicable rule yields one
/// [`DiscountDetail`]; the upfront bonus yields one per qualifying service.
/// Subscriptions without a resolved service are ignored.
#[derive(Debug, Clone, Default)]
pub struct DiscountService;

impl DiscountService {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(&self, subscriptions: &[Subscription]) -> Vec<DiscountDetail> {
        let priced: Vec<(&Subscription, &Service)> = subscriptions
            .iter()
            .filter_map(|s| s.service.as_ref().map(|service| (s, service)))
            .collect();

        let mut discounts = Vec::new();
        if priced.is_empty() {
            return discounts;
        }

        let find = |name: &str| priced.iter().find(|(_, service)| service.name == name);

        if let (Some((_, health)), Some(_)) = (
            find(ServiceName::HEALTH_AND_LIFESTYLE),
            find(ServiceName::MAGAZINES_AND_NEWS),
        ) {
            discounts.push(DiscountDetail::new(SERVICE_PAIR_DISCOUNT, health.monthly_price));
        }

        if priced.len() >= QUANTITY_THRESHOLD {
            let total_cost: Decimal = priced
                .iter()
                .map(|(s, service)| service.cost_for(s.duration_months))
                .sum();
            let amount = (total_cost * Decimal::new(10, 2)).round_dp(2);
            discounts.push(DiscountDetail::new(QUANTITY_DISCOUNT, amount));
        }

        if find(ServiceName::GAMING_CATALOGUE).is_some() && find(ServiceName::ELEARNING_PORTAL).is_some() {
            discounts.push(DiscountDetail::new(BUNDLE_DISCOUNT, Decimal::new(500, 2)));
        }

        for (_, service) in priced
            .iter()
            .filter(|(s, _)| s.duration_months >= UPFRONT_MONTHS_THRESHOLD)
        {
            discounts.push(DiscountDetail::new(
                format!("Upfront Subscription Bonus ({})", service.name),
                service.monthly_price,
            ));
        }

        discounts
    }
}
