//! Payment Gateway Integration
//!
//! The flow talks to payments through the [`PaymentGateway`] capability. The
//! shipped implementation is [`SimulatedGateway`], which waits a fixed time
//! and approves every request. A real gateway plugs in behind the same trait.

mod simulated;

pub use simulated::SimulatedGateway;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CheckoutError, Result};
use crate::form::BillingForm;
use crate::plan::Plan;

/// Payment methods offered on the method-selection step
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    #[serde(rename = "paypal", alias = "pay_pal")]
    PayPal,
    ApplePay,
    GooglePay,
}

impl PaymentMethod {
    pub const ALL: [Self; 4] = [Self::CreditCard, Self::PayPal, Self::ApplePay, Self::GooglePay];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::PayPal => "paypal",
            Self::ApplePay => "apple_pay",
            Self::GooglePay => "google_pay",
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::CreditCard => "Credit Card",
            Self::PayPal => "PayPal",
            Self::ApplePay => "Apple Pay",
            Self::GooglePay => "Google Pay",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "credit_card" | "card" => Ok(Self::CreditCard),
            "paypal" | "pay_pal" => Ok(Self::PayPal),
            "apple_pay" => Ok(Self::ApplePay),
            "google_pay" => Ok(Self::GooglePay),
            _ => Err(CheckoutError::UnknownMethod(s.to_string())),
        }
    }
}

/// Everything a gateway needs to charge one submission
#[derive(Clone, Debug)]
pub struct PaymentRequest {
    pub plan: Plan,
    pub method: PaymentMethod,
    pub billing: BillingForm,
}

/// Confirmation returned by the gateway
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// Gateway reference (e.g. "pay_3f2a...")
    pub reference: String,

    /// Plan that was purchased
    pub plan_name: String,

    /// Amount charged per period
    pub amount: Decimal,

    pub method: PaymentMethod,

    pub completed_at: DateTime<Utc>,
}

impl PaymentReceipt {
    pub fn for_request(request: &PaymentRequest) -> Self {
        Self {
            reference: format!("pay_{}", Uuid::new_v4().simple()),
            plan_name: request.plan.name.clone(),
            amount: request.plan.price,
            method: request.method,
            completed_at: Utc::now(),
        }
    }
}

/// Payment capability (Strategy pattern)
///
/// The current design has no decline path, so an attempt always yields a
/// receipt. Adding declines means widening this signature and giving the flow
/// a failed step to land in.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge the request and wait for the outcome
    async fn attempt(&self, request: &PaymentRequest) -> PaymentReceipt;

    /// Gateway name
    fn name(&self) -> &str;
}
