//! Error handling for the Stockroom backend
//!
//! Every error can be turned into a user-facing message in English and Spanish

use serde::Serialize;
use shared::PlanError;
use thiserror::Error;

use crate::store::StoreError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Batch partially applied: {failed} of {attempted} writes failed ({first_error})")]
    PartialBatch {
        attempted: usize,
        failed: usize,
        first_error: StoreError,
    },

    // External service errors
    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Validation failure on one field
    pub fn validation(field: &str, message: &str, message_es: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_es: message_es.to_string(),
        }
    }

    /// Message shown to the user
    pub fn user_message(&self) -> UserMessage {
        let message = match self {
            AppError::Validation {
                field,
                message,
                message_es,
            } => UserMessage {
                code: "VALIDATION_ERROR".to_string(),
                message_en: message.clone(),
                message_es: message_es.clone(),
                field: Some(field.clone()),
            },
            AppError::InsufficientStock {
                requested,
                available,
            } => UserMessage {
                code: "INSUFFICIENT_STOCK".to_string(),
                message_en: format!(
                    "Insufficient stock: requested {}, only {} available",
                    requested, available
                ),
                message_es: format!(
                    "Stock insuficiente: solicitaste {}, solo hay {}",
                    requested, available
                ),
                field: Some("quantity".to_string()),
            },
            AppError::NotFound(resource) => UserMessage {
                code: "NOT_FOUND".to_string(),
                message_en: format!("{} not found", resource),
                message_es: format!("No se encontró {}", resource),
                field: None,
            },
            AppError::Store(_) => UserMessage {
                code: "STORE_ERROR".to_string(),
                message_en: "Could not reach the database, try again".to_string(),
                message_es: "No se pudo conectar con la base de datos, intenta de nuevo".to_string(),
                field: None,
            },
            AppError::PartialBatch {
                attempted, failed, ..
            } => UserMessage {
                code: "PARTIAL_BATCH".to_string(),
                message_en: format!(
                    "{} of {} changes could not be saved; refresh to see the current stock",
                    failed, attempted
                ),
                message_es: format!(
                    "{} de {} cambios no se guardaron; actualiza para ver el stock real",
                    failed, attempted
                ),
                field: None,
            },
            AppError::ExternalService(msg) => UserMessage {
                code: "EXTERNAL_SERVICE_ERROR".to_string(),
                message_en: format!("External service error: {}", msg),
                message_es: format!("Error del servicio externo: {}", msg),
                field: None,
            },
            AppError::Configuration(msg) => UserMessage {
                code: "CONFIGURATION_ERROR".to_string(),
                message_en: format!("Configuration error: {}", msg),
                message_es: format!("Error de configuración: {}", msg),
                field: None,
            },
            AppError::Internal(_) => UserMessage {
                code: "INTERNAL_ERROR".to_string(),
                message_en: "An internal error occurred".to_string(),
                message_es: "Ocurrió un error interno".to_string(),
                field: None,
            },
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        message
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::InsufficientStock {
                requested,
                available,
            } => AppError::InsufficientStock {
                requested,
                available,
            },
            PlanError::NonPositiveQuantity => AppError::validation(
                "quantity",
                "Quantity must be positive",
                "La cantidad debe ser mayor a cero",
            ),
            PlanError::QuantityTooLarge => AppError::validation(
                "quantity",
                "Quantity is too large",
                "La cantidad es demasiado grande",
            ),
            PlanError::UnknownAction(action) => AppError::Validation {
                field: "action".to_string(),
                message: format!("Unknown action: {}", action),
                message_es: format!("Acción desconocida: {}", action),
            },
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.iter().collect();
        fields.sort_by_key(|(field, _)| **field);

        match fields.first() {
            Some((field, errs)) => {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                AppError::Validation {
                    field: field.to_string(),
                    message_es: format!("El campo {} no es válido", field),
                    message,
                }
            }
            None => AppError::validation("input", "Invalid input", "Datos no válidos"),
        }
    }
}

/// Error message for the UI layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserMessage {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Result type alias for services
pub type AppResult<T> = Result<T, AppError>;
