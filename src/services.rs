use std::future::Future;
use std::time::Duration;

use crate::classify::{ensure_enquiry_payload, extract_error_message, is_domain_error};
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::gateway_client::BbpsGatewayClient;
use crate::models::*;
use crate::normalize::{normalize_biller_details, normalize_biller_page, normalize_enquiry};

pub const BILLERS_PATH: &str = "/billers";
pub const BILLER_DETAILS_PATH: &str = "/biller-details";
pub const PRE_ENQUIRY_PATH: &str = "/pre-enquiry";

/// The three BBPS operations the directory and the wizard depend on.
pub trait BillerApi: Send + Sync {
    /// Fetches and normalizes one page of billers.
    fn list_billers(
        &self,
        page: u32,
        page_size: u32,
        category_key: &str,
    ) -> impl Future<Output = Result<BillerPage, AppError>> + Send;

    /// Fetches the input schema and payment modes of a biller.
    fn get_biller_details(
        &self,
        biller_id: &str,
    ) -> impl Future<Output = Result<BillerDetails, AppError>> + Send;

    /// Runs the balance enquiry. Business errors in a 2xx body, and bodies
    /// without an enquiry reference, are failures.
    fn pre_enquiry(
        &self,
        request: &PreEnquiryRequest,
    ) -> impl Future<Output = Result<EnquiryResponse, AppError>> + Send;
}

/// `BillerApi` over HTTP, against the aggregator or against this service's proxy.
#[derive(Clone)]
pub struct BbpsService {
    gateway: BbpsGatewayClient,
}

impl BbpsService {
    pub fn new(gateway: BbpsGatewayClient) -> Self {
        Self { gateway }
    }

    /// Talks to the aggregator configured in `config`.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let gateway = BbpsGatewayClient::new(
            config.bbps_base_url.clone(),
            config.bbps_api_key.clone(),
            config.upstream_timeout_secs.map(Duration::from_secs),
        )?;
        Ok(Self::new(gateway))
    }

    /// Talks to a running instance of this service through its `/api/bbps` proxy.
    pub fn for_proxy(proxy_base_url: &str) -> Result<Self, AppError> {
        let base = format!("{}/api/bbps", proxy_base_url.trim_end_matches('/'));
        Ok(Self::new(BbpsGatewayClient::new(base, None, None)?))
    }

    pub fn gateway(&self) -> &BbpsGatewayClient {
        &self.gateway
    }
}

impl BillerApi for BbpsService {
    async fn list_billers(
        &self,
        page: u32,
        page_size: u32,
        category_key: &str,
    ) -> Result<BillerPage, AppError> {
        tracing::info!(
            "Listing billers page {} (size {}, category {})",
            page,
            page_size,
            category_key
        );
        let request = BillersRequest::new(page, page_size, category_key);
        let body = self
            .gateway
            .post_json(BILLERS_PATH, &request)
            .await
            .with_context(|| format!("listing billers page {}", page))?;

        let result = normalize_biller_page(&body, page);
        tracing::info!(
            "✓ Fetched {} billers (page {}/{})",
            result.billers.len(),
            result.meta.current_page,
            result.meta.total_pages
        );
        Ok(result)
    }

    async fn get_biller_details(&self, biller_id: &str) -> Result<BillerDetails, AppError> {
        tracing::info!("Fetching details for biller {}", biller_id);
        let request = BillerDetailsRequest {
            biller_id: biller_id.to_string(),
        };
        let body = self
            .gateway
            .post_json(BILLER_DETAILS_PATH, &request)
            .await
            .with_context(|| format!("fetching details for biller {}", biller_id))?;

        let details = normalize_biller_details(&body);
        tracing::info!(
            "✓ Biller {} requires {} parameter(s)",
            biller_id,
            details.input_parameters.len()
        );
        Ok(details)
    }

    async fn pre_enquiry(&self, request: &PreEnquiryRequest) -> Result<EnquiryResponse, AppError> {
        tracing::info!(
            "Pre-enquiry for biller {} (ref {})",
            request.biller_id,
            request.external_ref
        );
        let body = self
            .gateway
            .post_json(PRE_ENQUIRY_PATH, request)
            .await
            .with_context(|| format!("pre-enquiry {}", request.external_ref))?;
        ensure_enquiry_payload(&body)?;

        if is_domain_error(&body) {
            let message = extract_error_message(&body);
            tracing::warn!(
                "❌ Pre-enquiry {} rejected by biller: {}",
                request.external_ref,
                message
            );
            return Err(AppError::Domain(message));
        }

        let enquiry = normalize_enquiry(&body);
        if enquiry.enquiry_reference_id.trim().is_empty() {
            tracing::warn!(
                "❌ Pre-enquiry {} answered without a reference id",
                request.external_ref
            );
            return Err(AppError::Domain(extract_error_message(&body)));
        }
        tracing::info!(
            "✓ Pre-enquiry {} succeeded, amount {}",
            request.external_ref,
            enquiry.amount
        );
        Ok(enquiry)
    }
}
