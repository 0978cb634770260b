use regex::Regex;

use crate::errors::AppError;
use crate::models::{DataType, FormData, InputParameter};

/// Validates submitted form values against the biller's parameter schema.
///
/// Parameters are checked in declaration order and the first failure is
/// returned; later parameters are not looked at.
///
/// # Arguments
///
/// * `parameters` - The biller's input parameters, in declared order.
/// * `form` - Values keyed by `paramName`.
///
/// # Returns
///
/// * `Result<(), AppError>` - `AppError::Validation` for the first offending parameter.
pub fn validate_form(parameters: &[InputParameter], form: &FormData) -> Result<(), AppError> {
    for param in parameters {
        let value = form
            .get(&param.param_name)
            .map(|v| v.trim())
            .unwrap_or("");

        if let Some(message) = check_parameter(param, value) {
            tracing::debug!("❌ Parameter {} rejected: {}", param.param_name, message);
            return Err(AppError::Validation {
                param: param.param_name.clone(),
                message,
            });
        }
    }

    Ok(())
}

fn check_parameter(param: &InputParameter, value: &str) -> Option<String> {
    if value.is_empty() {
        return param
            .mandatory
            .then(|| format!("{} is required", param.name));
    }

    if let Some(pattern) = param.regex.as_deref() {
        match Regex::new(pattern) {
            Ok(re) if !re.is_match(value) => {
                return Some(format!("Please enter a valid {}", param.name));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    "Skipping unparsable regex for {}: {} ({})",
                    param.param_name,
                    pattern,
                    e
                );
            }
        }
    }

    let length = value.chars().count();
    if length < param.min_length {
        return Some(format!(
            "{} must be at least {} characters",
            param.name, param.min_length
        ));
    }
    if param.max_length > 0 && length > param.max_length {
        return Some(format!(
            "{} must be at most {} characters",
            param.name, param.max_length
        ));
    }

    if param.data_type == DataType::Numeric && !value.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!("{} must contain only digits", param.name));
    }

    None
}
