use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Billing overview of a customer's subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub customer_phone_number: String,
    pub subscriptions: Vec<SubscriptionDetail>,
    pub total_cost_before_discounts: Decimal,
    pub total_discounts: Decimal,
    pub final_cost: Decimal,
    pub applied_discounts: Vec<DiscountDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDetail {
    pub service_name: String,
    pub duration_months: i32,
    pub monthly_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountDetail {
    pub discount_name: String,
    pub amount: Decimal,
}

impl DiscountDetail {
    pub fn new(discount_name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            discount_name: discount_name.into(),
            amount,
        }
    }
}
