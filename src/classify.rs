//! Business-error detection for aggregator responses.
//!
//! The aggregator reports failures such as "vehicle not found" inside an
//! HTTP 200 body. Both the proxy and its clients run every 2xx enquiry body
//! through [`is_domain_error`] before treating it as a success.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::errors::AppError;
use crate::upstream_models::{scalar_to_string, LooseRecord};

/// Status codes the aggregator uses for failed enquiries.
pub const ERROR_CODES: [&str; 5] = ["ERR", "IAN", "INV", "NF", "NA"];

/// Banner text when the body carries no usable message.
pub const FALLBACK_ERROR_MESSAGE: &str = "Unable to fetch bill details. Please try again.";

const STATUS_CODE_KEYS: [&str; 4] = ["statuscode", "statusCode", "status_code", "StatusCode"];

fn error_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)invalid|error|failed|not found|unavailable")
            .expect("error keyword pattern is valid")
    })
}

/// Whether a 2xx body actually describes a failure.
///
/// Both the `data` envelope and the root are checked; a failure reported in
/// either layer counts.
pub fn is_domain_error(body: &Value) -> bool {
    let record = LooseRecord::enveloped(body);

    let code_matches = layer_strings(&record, &STATUS_CODE_KEYS).iter().any(|code| {
        let code = code.trim();
        ERROR_CODES.iter().any(|c| code.eq_ignore_ascii_case(c))
    });
    if code_matches {
        return true;
    }

    layer_strings(&record, &["status", "message"])
        .iter()
        .any(|text| error_pattern().is_match(text))
}

/// Every string value under `keys`, across all layers of the record.
fn layer_strings(record: &LooseRecord<'_>, keys: &[&str]) -> Vec<String> {
    record
        .layers()
        .flat_map(|layer| keys.iter().filter_map(move |k| layer.get(*k)))
        .filter_map(scalar_to_string)
        .collect()
}

/// Rejects a 2xx enquiry body that carries nothing to read (empty, `null`,
/// or not a JSON object).
pub fn ensure_enquiry_payload(body: &Value) -> Result<(), AppError> {
    if body.is_object() {
        Ok(())
    } else {
        Err(AppError::ExternalApiError(format!(
            "Malformed pre-enquiry response: {}",
            body
        )))
    }
}

/// Picks the most specific human-readable message out of an error body.
///
/// Priority: `error` string, `status` string, nested `error.status`,
/// `message`, then [`FALLBACK_ERROR_MESSAGE`].
pub fn extract_error_message(body: &Value) -> String {
    let non_blank = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    non_blank(body.get("error"))
        .or_else(|| non_blank(body.get("status")))
        .or_else(|| non_blank(body.get("error").and_then(|e| e.get("status"))))
        .or_else(|| non_blank(body.get("message")))
        .or_else(|| {
            // the enquiry payload itself may sit under `data`
            body.get("data")
                .filter(|d| d.is_object())
                .map(extract_error_message)
                .filter(|m| m != FALLBACK_ERROR_MESSAGE)
        })
        .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_codes_case_insensitive() {
        for code in ["ERR", "ian", "Inv", "nf", "NA"] {
            assert!(is_domain_error(&json!({ "statuscode": code })), "{}", code);
        }
        assert!(is_domain_error(&json!({"data": {"statusCode": "err"}})));
        assert!(!is_domain_error(&json!({"statuscode": "ACK"})));
    }

    #[test]
    fn test_error_keywords_in_status_or_message() {
        assert!(is_domain_error(&json!({"status": "Invalid Vehicle Number"})));
        assert!(is_domain_error(&json!({"message": "Biller unavailable"})));
        assert!(is_domain_error(&json!({"status": "Record Not Found"})));
        assert!(is_domain_error(&json!({"message": "Request FAILED"})));
        assert!(!is_domain_error(&json!({"status": "SUCCESS", "message": "Fetched"})));
    }

    #[test]
    fn test_error_in_root_behind_envelope() {
        let body = json!({"status": "FAILED", "data": {"status": "OK"}});
        assert!(is_domain_error(&body));

        let body = json!({"statuscode": "ERR", "data": {"statuscode": "TXN"}});
        assert!(is_domain_error(&body));
    }

    #[test]
    fn test_enquiry_payload_must_be_object() {
        assert!(ensure_enquiry_payload(&json!({"data": {}})).is_ok());
        assert!(matches!(
            ensure_enquiry_payload(&Value::Null),
            Err(AppError::ExternalApiError(_))
        ));
        assert!(ensure_enquiry_payload(&json!("ok")).is_err());
        assert!(ensure_enquiry_payload(&json!([])).is_err());
    }

    #[test]
    fn test_success_body_is_not_error() {
        let body = json!({
            "statuscode": "TXN",
            "status": "Transaction Successful",
            "data": {"BillAmount": "500"}
        });
        assert!(!is_domain_error(&body));
    }

    #[test]
    fn test_extraction_priority() {
        assert_eq!(
            extract_error_message(&json!({"error": "boom", "status": "s", "message": "m"})),
            "boom"
        );
        assert_eq!(
            extract_error_message(&json!({"status": "Invalid Vehicle", "message": "m"})),
            "Invalid Vehicle"
        );
        assert_eq!(
            extract_error_message(&json!({"error": {"status": "Biller down"}, "message": "m"})),
            "Biller down"
        );
        assert_eq!(
            extract_error_message(&json!({"statuscode": "ERR", "message": "Wrong number"})),
            "Wrong number"
        );
        assert_eq!(
            extract_error_message(&json!({"statuscode": "NA"})),
            FALLBACK_ERROR_MESSAGE
        );
    }
}
