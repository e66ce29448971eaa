use axum::http::StatusCode;
use validator::Validate;

use crate::api::errors::ApiError;

/// Validation error response
#[derive(Debug, serde::Serialize)]
pub struct ValidationErrorResponse {
    pub error: String,
    pub field_errors: Vec<FieldError>,
}

/// Field error details
#[derive(Debug, serde::Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl From<ValidationErrorResponse> for ApiError {
    fn from(response: ValidationErrorResponse) -> Self {
        let details: Vec<String> = response
            .field_errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("{}: {}", response.error, details.join("; ")),
        )
    }
}

/// Validate a request payload, collecting every field error
pub fn validate_and_respond<T>(payload: &T) -> Result<(), ValidationErrorResponse>
where
    T: Validate,
{
    payload.validate().map_err(|validation_errors| {
        let mut field_errors: Vec<FieldError> = validation_errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(|error| FieldError {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|cow| cow.to_string())
                        .unwrap_or_else(|| "Invalid value".to_string()),
                })
            })
            .collect();
        field_errors.sort_by(|a, b| a.field.cmp(&b.field));

        ValidationErrorResponse {
            error: "Validation failed".to_string(),
            field_errors,
        }
    })
}
