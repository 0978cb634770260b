use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Coverage reported when the upstream record has neither city nor state.
pub const PAN_INDIA: &str = "PAN India";

/// Form values keyed by `InputParameter::param_name`.
pub type FormData = BTreeMap<String, String>;

// ============ Directory ============

/// A FASTag issuer payable through the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Biller {
    /// Aggregator identifier, also the identity of the biller.
    pub biller_id: String,
    /// Display name.
    pub biller_name: String,
    /// Whether the biller currently accepts payments.
    pub is_available: bool,
    /// City, state or "PAN India".
    pub coverage: String,
    /// Logo URL if the aggregator supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Pagination descriptor returned alongside a page of billers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillerMeta {
    pub total_pages: u32,
    pub current_page: u32,
    pub total_records: u32,
    pub records_on_current_page: u32,
    pub record_from: u32,
    pub record_to: u32,
}

impl BillerMeta {
    /// Whether another page exists after the current one.
    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// One normalized page of the biller directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillerPage {
    pub billers: Vec<Biller>,
    pub meta: BillerMeta,
}

// ============ Biller details ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Numeric,
    Alphanumeric,
}

/// One account parameter the biller requires (vehicle number, wallet id, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputParameter {
    /// Label shown to the user.
    pub name: String,
    /// Key used in submitted form data.
    pub param_name: String,
    pub data_type: DataType,
    pub min_length: usize,
    pub max_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    pub mandatory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMode {
    pub name: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_amount"
    )]
    pub min_amount: Option<BigDecimal>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_amount"
    )]
    pub max_amount: Option<BigDecimal>,
}

impl PaymentMode {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_amount: None,
            max_amount: None,
        }
    }
}

/// Input schema and payment options for a selected biller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillerDetails {
    pub input_parameters: Vec<InputParameter>,
    pub payment_modes: Vec<PaymentMode>,
    pub fetch_requirement: String,
    pub support_validation: String,
    pub payment_amount_exactness: String,
}

impl BillerDetails {
    pub fn parameter(&self, param_name: &str) -> Option<&InputParameter> {
        self.input_parameters
            .iter()
            .find(|p| p.param_name == param_name)
    }

    pub fn payment_mode(&self, name: &str) -> Option<&PaymentMode> {
        self.payment_modes
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }
}

// ============ Enquiry ============

/// Result of a successful pre-payment enquiry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryResponse {
    pub enquiry_reference_id: String,
    #[serde(serialize_with = "serialize_amount")]
    pub amount: BigDecimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_params: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_details: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_details: Option<BTreeMap<String, String>>,
}

// ============ Requests ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page_number: u32,
    pub records_per_page: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillerFilters {
    pub category_key: String,
}

/// Body of a biller listing request, as sent to the proxy and forwarded upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillersRequest {
    pub pagination: Pagination,
    pub filters: BillerFilters,
}

impl BillersRequest {
    pub fn new(page: u32, page_size: u32, category_key: impl Into<String>) -> Self {
        Self {
            pagination: Pagination {
                page_number: page,
                records_per_page: page_size,
            },
            filters: BillerFilters {
                category_key: category_key.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillerDetailsRequest {
    pub biller_id: String,
}

/// Body of a pre-enquiry request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreEnquiryRequest {
    pub biller_id: String,
    pub input_parameters: FormData,
    /// Client-generated reference token, `SABPE_<unix millis>`.
    pub external_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_amount: Option<String>,
}

impl PreEnquiryRequest {
    pub fn new(biller_id: impl Into<String>, input_parameters: FormData) -> Self {
        Self {
            biller_id: biller_id.into(),
            input_parameters,
            external_ref: external_reference(),
            transaction_amount: None,
        }
    }
}

/// Generates the client-side reference token for a pre-enquiry.
pub fn external_reference() -> String {
    format!("SABPE_{}", chrono::Utc::now().timestamp_millis())
}

// ============ Payment handoff ============

/// What the payment step receives once the wizard reaches `MakePayment`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHandoff {
    pub biller_id: String,
    pub biller_name: String,
    pub enquiry_reference_id: String,
    #[serde(serialize_with = "serialize_amount")]
    pub amount: BigDecimal,
    pub payment_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    pub input_parameters: FormData,
}

// ============ Serialization helpers ============

/// Amounts leave the service as JSON numbers.
pub fn serialize_amount<S: Serializer>(amount: &BigDecimal, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(amount.to_f64().unwrap_or(0.0))
}

fn serialize_optional_amount<S: Serializer>(
    amount: &Option<BigDecimal>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match amount {
        Some(value) => serialize_amount(value, s),
        None => s.serialize_none(),
    }
}
