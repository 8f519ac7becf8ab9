use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::api::responses::ValidationErrorDetail;

/// E.164 phone number: a leading `+` and up to fifteen digits.
pub static E164_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("E.164 pattern is valid"));

/// Request to subscribe a customer to a service.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    #[validate(regex(path = "E164_PHONE", message = "Phone number must be in E.164 format"))]
    pub customer_phone_number: String,
    #[validate(range(min = 1, message = "Service ID must be greater than 0"))]
    pub service_id: i32,
    #[validate(range(min = 1, max = 12, message = "Duration must be between 1 and 12 months"))]
    pub duration_months: i32,
}

/// Request to cancel a subscription.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeRequest {
    #[validate(regex(path = "E164_PHONE", message = "Phone number must be in E.164 format"))]
    pub customer_phone_number: String,
    #[validate(range(min = 1, message = "Service ID must be greater than 0"))]
    pub service_id: i32,
}

/// Query parameters for the subscription summary.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    #[validate(regex(path = "E164_PHONE", message = "Phone number must be in E.164 format"))]
    pub customer_phone_number: String,
}

/// Flattens validator output into response details, ordered by field.
pub fn validation_details(errors: &ValidationErrors) -> Vec<ValidationErrorDetail> {
    let mut details: Vec<ValidationErrorDetail> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: camel_case(field),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", camel_case(field))),
            })
        })
        .collect();
    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn is_e164(phone: &str) -> bool {
    E164_PHONE.is_match(phone)
}
