//! Display-only derivations. Nothing here is stored on the wizard.

use serde::Serialize;

use crate::models::EnquiryResponse;
use crate::normalize::{amount_to_f64, parse_amount};

const ERROR_WORDS: [&str; 9] = [
    "inactive", "blacklist", "blocked", "closed", "fail", "error", "invalid", "reject", "expired",
];
const PENDING_WORDS: [&str; 4] = ["pending", "processing", "progress", "await"];
const SUCCESS_WORDS: [&str; 6] = ["active", "success", "paid", "approved", "completed", "valid"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTone {
    Success,
    Pending,
    Error,
    Info,
}

impl StatusTone {
    /// Classifies a status text by keyword. Error words win so that
    /// "Inactive" is never read as "active".
    pub fn classify(status: &str) -> Self {
        let lowered = status.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lowered.contains(w));

        if has(&ERROR_WORDS) {
            StatusTone::Error
        } else if has(&PENDING_WORDS) {
            StatusTone::Pending
        } else if has(&SUCCESS_WORDS) {
            StatusTone::Success
        } else {
            StatusTone::Info
        }
    }
}

/// `available / limit * 100`, clamped to `[0, 100]`; 0 when either side is
/// missing or not finite, or the limit is not positive.
pub fn balance_utilization(available: Option<f64>, limit: Option<f64>) -> f64 {
    match (available, limit) {
        (Some(a), Some(l)) if a.is_finite() && l.is_finite() && l > 0.0 => {
            (a / l * 100.0).clamp(0.0, 100.0)
        }
        _ => 0.0,
    }
}

/// Status text of an enquiry, used for the tone badge.
pub fn enquiry_status(enquiry: &EnquiryResponse) -> Option<&str> {
    enquiry.policy_status.as_deref()
}

/// First detail value whose label contains `needle` (case-insensitive).
fn detail_amount(enquiry: &EnquiryResponse, needle: &str) -> Option<f64> {
    [&enquiry.additional_details, &enquiry.bill_details]
        .into_iter()
        .flatten()
        .flat_map(|details| details.iter())
        .find(|(label, value)| label.to_lowercase().contains(needle) && !value.trim().is_empty())
        .and_then(|(_, value)| amount_to_f64(&parse_amount(value)))
}

pub fn available_balance(enquiry: &EnquiryResponse) -> Option<f64> {
    detail_amount(enquiry, "balance")
}

pub fn recharge_limit(enquiry: &EnquiryResponse) -> Option<f64> {
    detail_amount(enquiry, "limit")
}

pub fn enquiry_utilization(enquiry: &EnquiryResponse) -> f64 {
    balance_utilization(available_balance(enquiry), recharge_limit(enquiry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::collections::BTreeMap;

    #[test]
    fn test_tone_keywords() {
        assert_eq!(StatusTone::classify("ACTIVE"), StatusTone::Success);
        assert_eq!(StatusTone::classify("Inactive"), StatusTone::Error);
        assert_eq!(StatusTone::classify("Tag Blacklisted"), StatusTone::Error);
        assert_eq!(StatusTone::classify("Payment Pending"), StatusTone::Pending);
        assert_eq!(StatusTone::classify("Low balance"), StatusTone::Info);
        assert_eq!(StatusTone::classify(""), StatusTone::Info);
    }

    #[test]
    fn test_utilization_bounds() {
        assert_eq!(balance_utilization(Some(50.0), Some(200.0)), 25.0);
        assert_eq!(balance_utilization(Some(500.0), Some(200.0)), 100.0);
        assert_eq!(balance_utilization(Some(-5.0), Some(200.0)), 0.0);
        assert_eq!(balance_utilization(Some(50.0), Some(0.0)), 0.0);
        assert_eq!(balance_utilization(Some(f64::NAN), Some(10.0)), 0.0);
        assert_eq!(balance_utilization(None, Some(10.0)), 0.0);
    }

    #[test]
    fn test_enquiry_utilization_reads_labels() {
        let mut details = BTreeMap::new();
        details.insert("Available Balance".to_string(), "1,500".to_string());
        details.insert("Max Recharge Limit".to_string(), "6,000".to_string());

        let enquiry = EnquiryResponse {
            enquiry_reference_id: "E1".to_string(),
            amount: BigDecimal::from(0),
            customer_name: None,
            policy_status: Some("Active".to_string()),
            due_date: None,
            bill_number: None,
            bill_period: None,
            bill_date: None,
            bill_due_date: None,
            customer_params: None,
            additional_details: Some(details),
            bill_details: None,
        };

        assert_eq!(available_balance(&enquiry), Some(1500.0));
        assert_eq!(recharge_limit(&enquiry), Some(6000.0));
        assert_eq!(enquiry_utilization(&enquiry), 25.0);
        assert_eq!(enquiry_status(&enquiry), Some("Active"));
    }
}
