//! Translation from aggregator payloads to the crate's typed models.
//!
//! Every function here takes raw `serde_json::Value` and returns a model from
//! [`crate::models`]; loose shapes never travel further than this module.

use bigdecimal::{BigDecimal, Zero};
use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use crate::models::{
    Biller, BillerDetails, BillerMeta, BillerPage, DataType, EnquiryResponse, InputParameter,
    PaymentMode, PAN_INDIA,
};
use crate::upstream_models::{is_sentinel, scalar_to_string, LooseRecord};

/// Payment modes offered when the aggregator does not list any.
pub const DEFAULT_PAYMENT_MODES: [&str; 4] = ["UPI", "Debit Card", "Credit Card", "Net Banking"];

const COVERAGE_SENTINEL: &str = "-";

// ============ Billers ============

/// Normalizes one upstream biller record. Records without an id are dropped.
pub fn normalize_biller(record: &Value) -> Option<Biller> {
    let rec = LooseRecord::new(record);

    let biller_id = rec.string(&["billerId", "billerID", "biller_id", "id"])?;
    let biller_name = rec
        .string(&["billerName", "biller_name", "name"])
        .unwrap_or_default();

    let is_available = match rec.strict_bool(&["isAvailable"]) {
        Some(explicit) => explicit,
        None => rec.raw(&["billerStatus"]).and_then(Value::as_str) == Some("ACTIVE"),
    };

    Some(Biller {
        biller_id: biller_id.trim().to_string(),
        biller_name: biller_name.trim().to_string(),
        is_available,
        coverage: coverage(&rec),
        icon_url: rec.meaningful_string(&["iconUrl", "iconURL", "billerIcon", "logo"]),
    })
}

/// City, else state, else "PAN India". A missing value or `"-"` falls through.
fn coverage(rec: &LooseRecord<'_>) -> String {
    let usable = |keys: &[&str]| {
        rec.raw(keys)
            .and_then(scalar_to_string)
            .filter(|v| v != COVERAGE_SENTINEL)
    };

    usable(&["city", "billerCity"])
        .or_else(|| usable(&["state", "billerState"]))
        .unwrap_or_else(|| PAN_INDIA.to_string())
}

/// Normalizes a listing response into a page of billers plus its pagination.
///
/// `requested_page` fills in `currentPage` when the aggregator omits it.
pub fn normalize_biller_page(body: &Value, requested_page: u32) -> BillerPage {
    let envelope = LooseRecord::enveloped(body);

    let records: &[Value] = envelope
        .list(&["records", "billers", "billerList"])
        .map(Vec::as_slice)
        .or_else(|| body.get("data").and_then(Value::as_array).map(Vec::as_slice))
        .or_else(|| body.as_array().map(Vec::as_slice))
        .unwrap_or(&[]);

    let billers: Vec<Biller> = records
        .iter()
        .filter_map(|r| {
            let biller = normalize_biller(r);
            if biller.is_none() {
                tracing::warn!("Dropping biller record without billerId: {}", r);
            }
            biller
        })
        .collect();

    let meta_value = envelope.raw(&["meta", "pagination", "pageInfo"]);
    let meta = normalize_meta(meta_value, requested_page, billers.len());

    BillerPage { billers, meta }
}

fn normalize_meta(meta: Option<&Value>, requested_page: u32, records: usize) -> BillerMeta {
    let empty = Value::Null;
    let rec = LooseRecord::new(meta.unwrap_or(&empty));
    let field = |keys: &[&str]| rec.number(keys).map(|n| n.min(u32::MAX as u64) as u32);
    let records = records as u32;

    BillerMeta {
        total_pages: field(&["totalPages", "total_pages"]).unwrap_or(0),
        current_page: field(&["currentPage", "current_page", "pageNumber"])
            .unwrap_or(requested_page),
        total_records: field(&["totalRecords", "total_records"]).unwrap_or(records),
        records_on_current_page: field(&["recordsOnCurrentPage", "records_on_current_page"])
            .unwrap_or(records),
        record_from: field(&["recordFrom", "record_from"]).unwrap_or(0),
        record_to: field(&["recordTo", "record_to"]).unwrap_or(0),
    }
}

// ============ Biller details ============

/// Normalizes the parameter schema and payment modes of a biller.
pub fn normalize_biller_details(body: &Value) -> BillerDetails {
    let rec = LooseRecord::enveloped(body);

    let mut seen = HashSet::new();
    let input_parameters: Vec<InputParameter> = rec
        .list(&[
            "parameters",
            "inputParameters",
            "billerInputParams",
            "params",
        ])
        .map(|params| {
            params
                .iter()
                .filter_map(normalize_parameter)
                .filter(|p| seen.insert(p.param_name.clone()))
                .collect()
        })
        .unwrap_or_default();

    let mut payment_modes: Vec<PaymentMode> = rec
        .list(&["paymentModes", "billerPaymentModes", "paymentModesAllowed"])
        .map(|modes| modes.iter().filter_map(normalize_payment_mode).collect())
        .unwrap_or_default();
    if payment_modes.is_empty() {
        payment_modes = DEFAULT_PAYMENT_MODES
            .iter()
            .map(|m| PaymentMode::named(*m))
            .collect();
    }

    BillerDetails {
        input_parameters,
        payment_modes,
        fetch_requirement: rec
            .string(&["fetchRequirement", "billerFetchRequirement"])
            .unwrap_or_default(),
        support_validation: rec
            .string(&["supportValidation", "billerSupportBillValidation"])
            .unwrap_or_default(),
        payment_amount_exactness: rec
            .string(&["paymentAmountExactness", "billerPaymentExactness"])
            .unwrap_or_default(),
    }
}

fn normalize_parameter(value: &Value) -> Option<InputParameter> {
    let rec = LooseRecord::new(value);

    let param_name = rec.string(&["name", "paramName"])?.trim().to_string();
    let desc = rec.meaningful_string(&["desc", "description", "displayName"]);
    let data_type = match rec.string(&["inputType", "dataType"]) {
        Some(t) if t.trim().eq_ignore_ascii_case("NUMERIC") => DataType::Numeric,
        _ => DataType::Alphanumeric,
    };

    Some(InputParameter {
        name: desc.clone().unwrap_or_else(|| param_name.clone()),
        param_name,
        data_type,
        min_length: rec.number(&["minLength", "minLen"]).unwrap_or(0) as usize,
        max_length: rec.number(&["maxLength", "maxLen"]).unwrap_or(0) as usize,
        regex: rec.meaningful_string(&["regex", "regEx", "pattern"]),
        mandatory: rec.flag(&["mandatory", "isMandatory"]).unwrap_or(false),
        desc,
    })
}

fn normalize_payment_mode(value: &Value) -> Option<PaymentMode> {
    if let Some(name) = value.as_str() {
        let name = name.trim();
        return (!name.is_empty()).then(|| PaymentMode::named(name));
    }

    let rec = LooseRecord::new(value);
    let name = rec.string(&["paymentMode", "name", "mode"])?;
    let amount = |keys: &[&str]| rec.string(keys).and_then(|s| try_parse_amount(&s));

    Some(PaymentMode {
        name: name.trim().to_string(),
        min_amount: amount(&["minAmount", "minLimit"]),
        max_amount: amount(&["maxAmount", "maxLimit"]),
    })
}

// ============ Enquiry ============

/// Coalesces a successful enquiry body into the stable shape.
///
/// Callers must have already ruled out a business error with
/// [`crate::classify::is_domain_error`].
pub fn normalize_enquiry(body: &Value) -> EnquiryResponse {
    let rec = LooseRecord::enveloped(body);

    let amount = rec
        .raw(&["BillAmount", "billAmount", "amount", "Amount"])
        .map(amount_from_value)
        .unwrap_or_else(BigDecimal::zero);

    EnquiryResponse {
        enquiry_reference_id: rec
            .string(&[
                "enquiryReferenceId",
                "EnquiryReferenceId",
                "enquiryRefId",
                "referenceId",
                "refId",
            ])
            .unwrap_or_default(),
        amount,
        customer_name: rec.meaningful_string(&["CustomerName", "customerName"]),
        policy_status: rec.meaningful_string(&["PolicyStatus", "policyStatus"]),
        due_date: date_field(&rec, &["DueDate", "dueDate"]),
        bill_number: rec.meaningful_string(&["BillNumber", "billNumber"]),
        bill_period: rec.meaningful_string(&["BillPeriod", "billPeriod"]),
        bill_date: date_field(&rec, &["BillDate", "billDate"]),
        bill_due_date: date_field(&rec, &["BillDueDate", "billDueDate"]),
        customer_params: rec
            .raw(&["customerParams", "CustomerParams", "inputParams"])
            .map(flatten_name_values),
        additional_details: rec
            .raw(&[
                "additionalDetails",
                "AdditionalDetails",
                "additionalInfo",
                "AdditionalInfo",
            ])
            .map(flatten_name_values),
        bill_details: rec
            .raw(&["billDetails", "BillDetails"])
            .map(flatten_name_values),
    }
}

fn date_field(rec: &LooseRecord<'_>, keys: &[&str]) -> Option<String> {
    rec.meaningful_string(keys).filter(|d| !is_placeholder_date(d))
}

/// Dates the aggregator sends when it has none (`1900-01-01`, `0001-01-01`, ...).
pub fn is_placeholder_date(raw: &str) -> bool {
    let trimmed = raw.trim();
    let date_part = trimmed
        .split(|c| c == 'T' || c == ' ')
        .next()
        .unwrap_or(trimmed);

    ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .map(|date| date.year() <= 1900)
        .unwrap_or(false)
}

/// Flattens `[{Name, Value}]` lists (or plain objects) into a label → value map.
///
/// Entries with an empty label are dropped; a missing value becomes `""`.
pub fn flatten_name_values(value: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();

    match value {
        Value::Array(entries) => {
            for entry in entries {
                let rec = LooseRecord::new(entry);
                let Some(label) = rec.string(&["Name", "name", "key", "Key", "label"]) else {
                    continue;
                };
                let label = label.trim();
                if label.is_empty() {
                    continue;
                }
                let text = rec
                    .raw(&["Value", "value", "Val"])
                    .and_then(scalar_to_string)
                    .unwrap_or_default();
                out.insert(label.to_string(), text);
            }
        }
        Value::Object(map) => {
            for (label, text) in map {
                if label.trim().is_empty() {
                    continue;
                }
                out.insert(
                    label.trim().to_string(),
                    scalar_to_string(text).unwrap_or_default(),
                );
            }
        }
        _ => {}
    }

    out
}

// ============ Amounts ============

fn amount_from_value(value: &Value) -> BigDecimal {
    scalar_to_string(value)
        .map(|s| parse_amount(&s))
        .unwrap_or_else(BigDecimal::zero)
}

/// Parses an amount, stripping thousands separators, whitespace and `₹`.
/// Anything unparsable is zero.
pub fn parse_amount(raw: &str) -> BigDecimal {
    try_parse_amount(raw).unwrap_or_else(BigDecimal::zero)
}

fn try_parse_amount(raw: &str) -> Option<BigDecimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && *c != '₹' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() || is_sentinel(&cleaned) {
        return None;
    }
    BigDecimal::from_str(&cleaned).ok()
}

/// Formats an amount with two decimals and Indian digit grouping (`1,23,456.78`).
pub fn format_amount(amount: &BigDecimal) -> String {
    let fixed = amount.round(2).with_scale(2).to_string();
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    format!("{}{}.{}", sign, group_indian(whole), fraction)
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, last_three) = digits.split_at(digits.len() - 3);

    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), last_three)
}

/// Best-effort value of a balance or limit label, as a float for display maths.
pub fn amount_to_f64(amount: &BigDecimal) -> Option<f64> {
    use bigdecimal::ToPrimitive;
    amount.to_f64().filter(|f| f.is_finite())
}
