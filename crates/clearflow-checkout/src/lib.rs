//! # clearflow-checkout
//!
//! Checkout flow for the ClearFlow marketing site: plan catalog, billing form
//! model, and the step state machine that walks a visitor from picking a
//! payment method to a confirmed purchase.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  Plan   ┌────────────────────────────────────────────┐
//! │ Plan catalog │───────▶ │               CheckoutFlow                  │
//! └──────────────┘         │  ┌───────────┐ ┌────────────┐ ┌──────────┐ │
//!                          │  │ FlowState │ │BillingForm │ │ScrollLock│ │
//! commands ──────────────▶ │  │  machine  │ │   model    │ │  guard   │ │
//!                          │  └───────────┘ └────────────┘ └──────────┘ │
//! snapshots ◀───────────── │        │                                   │
//!                          └────────┼───────────────────────────────────┘
//!                                   ▼
//!                          ┌──────────────────┐
//!                          │  PaymentGateway  │  (SimulatedGateway)
//!                          │    (Strategy)    │
//!                          └──────────────────┘
//! ```
//!
//! The `PaymentGateway` trait lets a real processor replace the simulated one
//! without touching the state machine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use clearflow_checkout::{
//!     BillingCycle, CheckoutFlow, CountingScrollLock, PlanTier, SimulatedGateway,
//! };
//!
//! let flow = CheckoutFlow::new(
//!     Arc::new(SimulatedGateway::new()),
//!     Arc::new(CountingScrollLock::new()),
//! );
//!
//! flow.open(PlanTier::Professional.plan(BillingCycle::Monthly))?;
//! flow.advance_to_details()?;
//! // ... set_field for all seven fields ...
//! let ticket = flow.submit()?;
//! ticket.settled().await?;
//! ```

pub mod config;
pub mod error;
pub mod flow;
pub mod form;
pub mod gateway;
pub mod locale;
pub mod plan;
pub mod scroll;
pub mod session;

pub use config::CheckoutConfig;
pub use error::{CheckoutError, Result};
pub use flow::{CheckoutFlow, CheckoutView, Completion, FlowSnapshot, FlowState, PaymentTicket};
pub use form::{BillingField, BillingForm, SUPPORTED_COUNTRIES};
pub use gateway::{PaymentGateway, PaymentMethod, PaymentReceipt, PaymentRequest, SimulatedGateway};
pub use locale::{Locale, LocaleToggle, TextDirection};
pub use plan::{BillingCycle, Plan, PlanOffer, PlanTier, catalog};
pub use scroll::{CountingScrollLock, ScrollLock, ScrollLockGuard};
pub use session::SessionId;
