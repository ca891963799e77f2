//! Checkout Error Types

use thiserror::Error;

use crate::flow::FlowState;
use crate::form::BillingField;

/// Result type alias for checkout operations
pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Checkout-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Plan failed its preconditions (empty name, non-positive price)
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// Command issued while no flow is open
    #[error("Checkout flow is not open")]
    NotOpen,

    /// Command not accepted in the current step
    #[error("Cannot {command} while in {state}")]
    InvalidTransition {
        command: &'static str,
        state: FlowState,
    },

    /// Required billing fields left empty at submit time
    #[error("Missing required fields: {}", join_fields(.0))]
    MissingFields(Vec<BillingField>),

    /// Unknown billing field name
    #[error("Unknown billing field: {0}")]
    UnknownField(String),

    /// Unknown plan tier
    #[error("Unknown plan tier: {0}")]
    UnknownTier(String),

    /// Unknown billing cycle
    #[error("Unknown billing cycle: {0}")]
    UnknownCycle(String),

    /// Unknown payment method
    #[error("Unknown payment method: {0}")]
    UnknownMethod(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Background payment task died before reporting back
    #[error("Payment task failed: {0}")]
    TaskFailed(String),
}

fn join_fields(fields: &[BillingField]) -> String {
    fields
        .iter()
        .map(BillingField::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl CheckoutError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::MissingFields(_) | Self::TaskFailed(_))
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingFields(fields) => {
                format!("Please fill in: {}.", join_fields(fields))
            }
            Self::NotOpen => "This checkout has been closed. Please choose a plan again.".into(),
            Self::InvalidTransition { .. } => "That action isn't available right now.".into(),
            Self::InvalidPlan(_) | Self::UnknownTier(_) | Self::UnknownCycle(_) => {
                "The selected plan is not available.".into()
            }
            Self::UnknownMethod(_) => "That payment method is not supported.".into(),
            Self::TaskFailed(_) => "Payment processing failed. Please try again.".into(),
            _ => "An error occurred processing your request.".into(),
        }
    }
}

impl From<anyhow::Error> for CheckoutError {
    fn from(err: anyhow::Error) -> Self {
        Self::Config(err.to_string())
    }
}
