//! Four-step FASTag payment wizard.
//!
//! `SelectIssuer → EnterDetails → VerifyAmount → MakePayment`, with `back`
//! stepping to the previous state. Each state owns exactly the data it needs,
//! so a verify step without an enquiry cannot be built. Failed transitions
//! leave the state untouched and raise the single error banner.

use serde::Serialize;

use crate::errors::AppError;
use crate::models::{
    Biller, BillerDetails, EnquiryResponse, FormData, PaymentHandoff, PaymentMode,
    PreEnquiryRequest,
};
use crate::normalize::format_amount;
use crate::presentation::{enquiry_status, enquiry_utilization, StatusTone};
use crate::services::BillerApi;
use crate::validation::validate_form;

pub const PAYMENT_MODE_REQUIRED: &str = "Please select a payment mode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WizardStep {
    SelectIssuer,
    EnterDetails,
    VerifyAmount,
    MakePayment,
}

impl WizardStep {
    /// 1-based position for step indicators.
    pub fn index(self) -> u8 {
        match self {
            WizardStep::SelectIssuer => 1,
            WizardStep::EnterDetails => 2,
            WizardStep::VerifyAmount => 3,
            WizardStep::MakePayment => 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetailsStage {
    pub biller: Biller,
    pub details: BillerDetails,
    pub form: FormData,
    /// Enquiry kept from an earlier visit to the verify step.
    pub cached_enquiry: Option<EnquiryResponse>,
}

#[derive(Debug, Clone)]
pub struct VerifyStage {
    pub biller: Biller,
    pub details: BillerDetails,
    pub form: FormData,
    pub enquiry: EnquiryResponse,
    pub payment_mode: Option<PaymentMode>,
}

#[derive(Debug, Clone)]
pub struct PaymentStage {
    pub verify: VerifyStage,
    pub payment_mode: PaymentMode,
    pub handoff: PaymentHandoff,
}

#[derive(Debug, Clone, Default)]
pub enum WizardState {
    #[default]
    SelectIssuer,
    EnterDetails(DetailsStage),
    VerifyAmount(VerifyStage),
    MakePayment(PaymentStage),
}

impl WizardState {
    pub fn step(&self) -> WizardStep {
        match self {
            WizardState::SelectIssuer => WizardStep::SelectIssuer,
            WizardState::EnterDetails(_) => WizardStep::EnterDetails,
            WizardState::VerifyAmount(_) => WizardStep::VerifyAmount,
            WizardState::MakePayment(_) => WizardStep::MakePayment,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Wizard {
    state: WizardState,
    error: Option<String>,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn step(&self) -> WizardStep {
        self.state.step()
    }

    /// Current banner text, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Records the outcome of a transition: success clears the banner,
    /// failure raises it.
    fn settle(&mut self, result: Result<(), AppError>) -> Result<(), AppError> {
        match &result {
            Ok(()) => self.error = None,
            Err(e) => self.error = Some(e.user_message()),
        }
        result
    }

    fn wrong_step(&self, action: &str) -> AppError {
        step_error(self.step(), action)
    }

    /// Picks a biller and loads its parameter schema.
    pub async fn select_issuer<A: BillerApi>(
        &mut self,
        api: &A,
        biller: Biller,
    ) -> Result<(), AppError> {
        if !matches!(self.state, WizardState::SelectIssuer) {
            let err = self.wrong_step("select an issuer");
            return self.settle(Err(err));
        }
        if !biller.is_available {
            let err = AppError::BadRequest(format!(
                "{} is currently unavailable",
                biller.biller_name
            ));
            return self.settle(Err(err));
        }

        let result = match api.get_biller_details(&biller.biller_id).await {
            Ok(details) => {
                tracing::info!("Issuer {} selected", biller.biller_id);
                self.state = WizardState::EnterDetails(DetailsStage {
                    biller,
                    details,
                    form: FormData::new(),
                    cached_enquiry: None,
                });
                Ok(())
            }
            Err(e) => Err(e),
        };
        self.settle(result)
    }

    /// Sets one form value. Only declared parameters are accepted.
    pub fn set_field(
        &mut self,
        param_name: &str,
        value: impl Into<String>,
    ) -> Result<(), AppError> {
        let step = self.step();
        let result = match &mut self.state {
            WizardState::EnterDetails(stage) => {
                if stage.details.parameter(param_name).is_some() {
                    stage.form.insert(param_name.to_string(), value.into());
                    Ok(())
                } else {
                    Err(AppError::BadRequest(format!(
                        "Unknown parameter {}",
                        param_name
                    )))
                }
            }
            _ => Err(step_error(step, "edit details")),
        };
        self.settle(result)
    }

    /// Sets several form values at once. Every key is checked first, so an
    /// unknown parameter leaves the form untouched.
    pub fn set_fields(&mut self, fields: FormData) -> Result<(), AppError> {
        let step = self.step();
        let result = match &mut self.state {
            WizardState::EnterDetails(stage) => {
                let unknown = fields
                    .keys()
                    .find(|name| stage.details.parameter(name.as_str()).is_none())
                    .cloned();
                match unknown {
                    Some(unknown) => Err(AppError::BadRequest(format!(
                        "Unknown parameter {}",
                        unknown
                    ))),
                    None => {
                        stage.form.extend(fields);
                        Ok(())
                    }
                }
            }
            _ => Err(step_error(step, "edit details")),
        };
        self.settle(result)
    }

    /// Validates the form and runs the pre-enquiry. Nothing is sent when
    /// validation fails.
    pub async fn submit_details<A: BillerApi>(&mut self, api: &A) -> Result<(), AppError> {
        let WizardState::EnterDetails(stage) = &self.state else {
            let err = self.wrong_step("submit details");
            return self.settle(Err(err));
        };

        if let Err(e) = validate_form(&stage.details.input_parameters, &stage.form) {
            return self.settle(Err(e));
        }

        let request = PreEnquiryRequest::new(stage.biller.biller_id.clone(), stage.form.clone());
        let result = match api.pre_enquiry(&request).await {
            Ok(enquiry) => {
                self.state = match std::mem::take(&mut self.state) {
                    WizardState::EnterDetails(stage) => WizardState::VerifyAmount(VerifyStage {
                        biller: stage.biller,
                        details: stage.details,
                        form: stage.form,
                        enquiry,
                        payment_mode: None,
                    }),
                    other => other,
                };
                Ok(())
            }
            Err(e) => Err(e),
        };
        self.settle(result)
    }

    /// Chooses one of the biller's payment modes.
    pub fn choose_payment_mode(&mut self, mode: &str) -> Result<(), AppError> {
        let step = self.step();
        let result = match &mut self.state {
            WizardState::VerifyAmount(stage) => match stage.details.payment_mode(mode) {
                Some(found) => {
                    stage.payment_mode = Some(found.clone());
                    Ok(())
                }
                None => Err(AppError::BadRequest(format!(
                    "{} is not accepted by this biller",
                    mode
                ))),
            },
            _ => Err(step_error(step, "choose a payment mode")),
        };
        self.settle(result)
    }

    /// Moves to the payment step. Blocked until a payment mode is chosen.
    pub fn proceed_to_payment(&mut self) -> Result<(), AppError> {
        let result = match &self.state {
            WizardState::VerifyAmount(stage) => match &stage.payment_mode {
                None => Err(AppError::BadRequest(PAYMENT_MODE_REQUIRED.to_string())),
                Some(mode) => {
                    let handoff = PaymentHandoff {
                        biller_id: stage.biller.biller_id.clone(),
                        biller_name: stage.biller.biller_name.clone(),
                        enquiry_reference_id: stage.enquiry.enquiry_reference_id.clone(),
                        amount: stage.enquiry.amount.clone(),
                        payment_mode: mode.name.clone(),
                        customer_name: stage.enquiry.customer_name.clone(),
                        input_parameters: stage.form.clone(),
                    };
                    let payment_mode = mode.clone();
                    let verify = stage.clone();
                    tracing::info!(
                        "Payment handoff prepared for {} via {}",
                        handoff.enquiry_reference_id,
                        handoff.payment_mode
                    );
                    self.state = WizardState::MakePayment(PaymentStage {
                        verify,
                        payment_mode,
                        handoff,
                    });
                    Ok(())
                }
            },
            _ => Err(self.wrong_step("proceed to payment")),
        };
        self.settle(result)
    }

    /// Steps back one state. Fetched data is kept, except that returning to
    /// issuer selection forgets the biller.
    pub fn back(&mut self) -> Result<(), AppError> {
        let result = match std::mem::take(&mut self.state) {
            WizardState::SelectIssuer => Err(self.wrong_step("go back")),
            WizardState::EnterDetails(_) => {
                self.state = WizardState::SelectIssuer;
                Ok(())
            }
            WizardState::VerifyAmount(stage) => {
                self.state = WizardState::EnterDetails(DetailsStage {
                    biller: stage.biller,
                    details: stage.details,
                    form: stage.form,
                    cached_enquiry: Some(stage.enquiry),
                });
                Ok(())
            }
            WizardState::MakePayment(stage) => {
                self.state = WizardState::VerifyAmount(VerifyStage {
                    payment_mode: Some(stage.payment_mode),
                    ..stage.verify
                });
                Ok(())
            }
        };
        self.settle(result)
    }

    /// Serializable view of the wizard for clients.
    pub fn snapshot(&self) -> WizardSnapshot {
        let mut snap = WizardSnapshot {
            step: self.step(),
            step_index: self.step().index(),
            error: self.error.clone(),
            ..Default::default()
        };

        match &self.state {
            WizardState::SelectIssuer => {}
            WizardState::EnterDetails(stage) => {
                snap.biller = Some(stage.biller.clone());
                snap.details = Some(stage.details.clone());
                snap.form_data = stage.form.clone();
                if let Some(enquiry) = &stage.cached_enquiry {
                    snap.fill_enquiry(enquiry);
                }
            }
            WizardState::VerifyAmount(stage) => {
                snap.fill_verify(stage);
            }
            WizardState::MakePayment(stage) => {
                snap.fill_verify(&stage.verify);
                snap.payment_mode = Some(stage.payment_mode.name.clone());
                snap.handoff = Some(stage.handoff.clone());
            }
        }

        snap
    }
}

fn step_error(step: WizardStep, action: &str) -> AppError {
    AppError::InvalidTransition(format!("Cannot {} while on step {:?}", action, step))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSnapshot {
    pub step: WizardStep,
    pub step_index: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biller: Option<Biller>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BillerDetails>,
    pub form_data: FormData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enquiry: Option<EnquiryResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_tone: Option<StatusTone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_utilization: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handoff: Option<PaymentHandoff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for WizardSnapshot {
    fn default() -> Self {
        Self {
            step: WizardStep::SelectIssuer,
            step_index: WizardStep::SelectIssuer.index(),
            biller: None,
            details: None,
            form_data: FormData::new(),
            enquiry: None,
            amount_formatted: None,
            status_tone: None,
            balance_utilization: None,
            payment_mode: None,
            handoff: None,
            error: None,
        }
    }
}

impl WizardSnapshot {
    fn fill_enquiry(&mut self, enquiry: &EnquiryResponse) {
        self.amount_formatted = Some(format_amount(&enquiry.amount));
        self.status_tone = enquiry_status(enquiry).map(StatusTone::classify);
        self.balance_utilization = Some(enquiry_utilization(enquiry));
        self.enquiry = Some(enquiry.clone());
    }

    fn fill_verify(&mut self, stage: &VerifyStage) {
        self.biller = Some(stage.biller.clone());
        self.details = Some(stage.details.clone());
        self.form_data = stage.form.clone();
        self.payment_mode = stage.payment_mode.as_ref().map(|m| m.name.clone());
        self.fill_enquiry(&stage.enquiry);
    }
}
