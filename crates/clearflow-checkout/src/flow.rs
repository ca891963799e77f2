//! Checkout Flow Controller
//!
//! Owns the step state machine for one checkout overlay:
//!
//! ```text
//!   open(plan)
//!       │
//!       ▼
//! ┌─────────────────┐  advance / select_method  ┌──────────────┐
//! │ MethodSelection │ ────────────────────────▶ │ DetailsEntry │ ◀─┐ submit
//! │                 │ ◀──────────────────────── │              │ ──┘ (missing fields)
//! └─────────────────┘   return_to_method_sel.   └──────────────┘
//!                                                      │ submit (all fields)
//!                                                      ▼
//!                         gateway resolves      ┌──────────────┐
//!            ┌─────────────┐ ◀───────────────── │  Processing  │
//!            │  Completed  │                    └──────────────┘
//!            └─────────────┘
//!
//!   close() from anywhere ──▶ not open
//! ```
//!
//! All commands run synchronously under one mutex. The payment call is the
//! only suspension point; it runs on a spawned task that re-checks the session
//! id before applying its result, so a flow closed or re-opened in the
//! meantime is left untouched.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{CheckoutError, Result};
use crate::form::{BillingField, BillingForm};
use crate::gateway::{PaymentGateway, PaymentMethod, PaymentReceipt, PaymentRequest};
use crate::locale::TextDirection;
use crate::plan::Plan;
use crate::scroll::{ScrollLock, ScrollLockGuard};
use crate::session::SessionId;

/// Step of an open checkout flow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    MethodSelection,
    DetailsEntry,
    Processing,
    Completed,
}

impl FlowState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MethodSelection => "method_selection",
            Self::DetailsEntry => "details_entry",
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }

    /// Whether billing data is meaningful in this step
    pub const fn exposes_form(&self) -> bool {
        matches!(self, Self::DetailsEntry | Self::Processing)
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the presentation layer needs to render the current step
///
/// A closed flow is the default snapshot: no state, no session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub session_id: Option<SessionId>,
    pub state: Option<FlowState>,
    pub plan: Option<Plan>,
    pub method: Option<PaymentMethod>,

    /// Only present in `DetailsEntry` and `Processing`
    pub form: Option<BillingForm>,

    /// Form locked, payment in flight
    pub processing: bool,

    /// Payment confirmed
    pub succeeded: bool,

    pub receipt: Option<PaymentReceipt>,
}

impl FlowSnapshot {
    pub const fn is_open(&self) -> bool {
        self.state.is_some()
    }
}

/// Snapshot plus the layout direction it should be rendered in
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckoutView {
    #[serde(flatten)]
    pub snapshot: FlowSnapshot,
    pub direction: TextDirection,
}

/// Outcome of a background payment task
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The flow moved to `Completed`
    Applied(PaymentReceipt),

    /// The flow was closed, re-opened, or dropped first; nothing changed
    Stale,
}

/// Handle to an in-flight payment
///
/// Dropping the ticket does not cancel the payment.
#[derive(Debug)]
pub struct PaymentTicket {
    session: SessionId,
    handle: JoinHandle<Completion>,
}

impl PaymentTicket {
    /// Session the payment was submitted under
    pub const fn session_id(&self) -> &SessionId {
        &self.session
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the payment task to finish
    pub async fn settled(self) -> Result<Completion> {
        self.handle
            .await
            .map_err(|e| CheckoutError::TaskFailed(e.to_string()))
    }
}

/// State of one open flow
struct OpenFlow {
    id: SessionId,
    plan: Plan,
    state: FlowState,
    method: PaymentMethod,
    form: BillingForm,
    receipt: Option<PaymentReceipt>,
    _scroll: ScrollLockGuard,
}

impl OpenFlow {
    fn new(plan: Plan, scroll: ScrollLockGuard) -> Self {
        Self {
            id: SessionId::new(),
            plan,
            state: FlowState::MethodSelection,
            method: PaymentMethod::default(),
            form: BillingForm::new(),
            receipt: None,
            _scroll: scroll,
        }
    }

    /// Start over with a new plan, keeping the scroll lock already held
    fn restart(&mut self, plan: Plan) {
        self.id = SessionId::new();
        self.plan = plan;
        self.state = FlowState::MethodSelection;
        self.method = PaymentMethod::default();
        self.form.reset();
        self.receipt = None;
    }

    fn require(&self, command: &'static str, expected: FlowState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CheckoutError::InvalidTransition {
                command,
                state: self.state,
            })
        }
    }

    fn complete(&mut self, receipt: PaymentReceipt) {
        self.state = FlowState::Completed;
        self.form.reset();
        self.receipt = Some(receipt);
    }

    fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            session_id: Some(self.id.clone()),
            state: Some(self.state),
            plan: Some(self.plan.clone()),
            method: Some(self.method),
            form: self.state.exposes_form().then(|| self.form.clone()),
            processing: self.state == FlowState::Processing,
            succeeded: self.state == FlowState::Completed,
            receipt: self.receipt.clone(),
        }
    }
}

struct Shared {
    current: Mutex<Option<OpenFlow>>,
    updates: watch::Sender<FlowSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Option<OpenFlow>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, current: &Option<OpenFlow>) {
        let snapshot = current
            .as_ref()
            .map_or_else(FlowSnapshot::default, OpenFlow::snapshot);
        self.updates.send_replace(snapshot);
    }
}

/// The checkout flow controller
pub struct CheckoutFlow {
    shared: Arc<Shared>,
    gateway: Arc<dyn PaymentGateway>,
    scroll_lock: Arc<dyn ScrollLock>,
}

impl CheckoutFlow {
    /// Create a closed flow
    pub fn new(gateway: Arc<dyn PaymentGateway>, scroll_lock: Arc<dyn ScrollLock>) -> Self {
        let (updates, _rx) = watch::channel(FlowSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                current: Mutex::new(None),
                updates,
            }),
            gateway,
            scroll_lock,
        }
    }

    /// Open the flow for a plan
    ///
    /// Re-opening with the plan already in progress is a no-op unless that
    /// session has completed. A different plan, or a completed session,
    /// starts a fresh session at `MethodSelection`.
    pub fn open(&self, plan: Plan) -> Result<SessionId> {
        if let Err(e) = plan.validate() {
            tracing::warn!(error = %e, "Refusing to open checkout");
            return Err(e);
        }

        let mut current = self.shared.lock();
        let id = match current.as_mut() {
            Some(flow) if flow.plan == plan && flow.state != FlowState::Completed => {
                tracing::debug!(session = %flow.id, "Checkout already open for this plan");
                return Ok(flow.id.clone());
            }
            Some(flow) => {
                flow.restart(plan);
                flow.id.clone()
            }
            None => {
                let flow = OpenFlow::new(plan, ScrollLockGuard::acquire(Arc::clone(&self.scroll_lock)));
                let id = flow.id.clone();
                *current = Some(flow);
                id
            }
        };

        tracing::info!(session = %id, "Checkout opened");
        self.shared.publish(&current);
        Ok(id)
    }

    /// Record a payment method without leaving `MethodSelection`
    pub fn choose_method(&self, method: PaymentMethod) -> Result<()> {
        self.update(|flow| {
            flow.require("choose_method", FlowState::MethodSelection)?;
            flow.method = method;
            Ok(())
        })
    }

    /// Pick a payment method and continue to the billing form
    pub fn select_method(&self, method: PaymentMethod) -> Result<()> {
        self.update(|flow| {
            flow.require("select_method", FlowState::MethodSelection)?;
            flow.method = method;
            flow.state = FlowState::DetailsEntry;
            tracing::debug!(session = %flow.id, method = method.as_str(), "Method selected");
            Ok(())
        })
    }

    /// Continue to the billing form with the current method
    pub fn advance_to_details(&self) -> Result<()> {
        self.update(|flow| {
            flow.require("advance_to_details", FlowState::MethodSelection)?;
            flow.state = FlowState::DetailsEntry;
            Ok(())
        })
    }

    /// Go back to method selection; typed values are kept for this session
    pub fn return_to_method_selection(&self) -> Result<()> {
        self.update(|flow| {
            flow.require("return_to_method_selection", FlowState::DetailsEntry)?;
            flow.state = FlowState::MethodSelection;
            Ok(())
        })
    }

    /// Overwrite one billing field
    pub fn set_field(&self, field: BillingField, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.update(|flow| {
            flow.require("set_field", FlowState::DetailsEntry)?;
            flow.form.set(field, value);
            Ok(())
        })
    }

    /// Submit the billing form as currently held
    ///
    /// The payment runs on a task spawned onto the current Tokio runtime.
    /// Called outside a runtime, an otherwise valid submit returns
    /// `CheckoutError::TaskFailed` and the flow stays in `DetailsEntry`.
    pub fn submit(&self) -> Result<PaymentTicket> {
        self.submit_inner(None)
    }

    /// Replace the billing form wholesale, then submit it
    ///
    /// Needs a Tokio runtime in the same way as [`CheckoutFlow::submit`].
    pub fn submit_form(&self, form: BillingForm) -> Result<PaymentTicket> {
        self.submit_inner(Some(form))
    }

    fn submit_inner(&self, form: Option<BillingForm>) -> Result<PaymentTicket> {
        let mut current = self.shared.lock();
        let flow = current.as_mut().ok_or(CheckoutError::NotOpen)?;
        flow.require("submit", FlowState::DetailsEntry)?;

        let replaced = form.is_some();
        if let Some(form) = form {
            flow.form = form;
        }

        let missing = flow.form.missing_fields();
        if !missing.is_empty() {
            tracing::warn!(session = %flow.id, ?missing, "Submission rejected");
            if replaced {
                self.shared.publish(&current);
            }
            return Err(CheckoutError::MissingFields(missing));
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!(session = %flow.id, error = %e, "No runtime to run the payment on");
                if replaced {
                    self.shared.publish(&current);
                }
                return Err(CheckoutError::TaskFailed(e.to_string()));
            }
        };

        flow.state = FlowState::Processing;
        let session = flow.id.clone();
        let request = PaymentRequest {
            plan: flow.plan.clone(),
            method: flow.method,
            billing: flow.form.clone(),
        };
        tracing::info!(
            session = %session,
            plan = %request.plan,
            method = request.method.as_str(),
            gateway = self.gateway.name(),
            "Payment submitted"
        );
        self.shared.publish(&current);
        drop(current);

        let handle = runtime.spawn(complete_payment(
            Arc::downgrade(&self.shared),
            Arc::clone(&self.gateway),
            session.clone(),
            request,
        ));

        Ok(PaymentTicket { session, handle })
    }

    /// Close the flow from any step
    ///
    /// Returns whether a flow was open. Safe to call repeatedly.
    pub fn close(&self) -> bool {
        let mut current = self.shared.lock();
        let Some(flow) = current.take() else {
            return false;
        };
        tracing::info!(session = %flow.id, state = %flow.state, "Checkout closed");
        self.shared.publish(&current);
        drop(current);
        // releases the scroll lock
        drop(flow);
        true
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        self.shared.updates.borrow().clone()
    }

    /// Receiver that observes every published transition
    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Snapshot paired with a layout direction; the direction is passed through untouched
    pub fn view(&self, direction: TextDirection) -> CheckoutView {
        CheckoutView {
            snapshot: self.snapshot(),
            direction,
        }
    }

    pub fn state(&self) -> Option<FlowState> {
        self.shared.lock().as_ref().map(|flow| flow.state)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.shared.lock().as_ref().map(|flow| flow.id.clone())
    }

    pub fn is_open(&self) -> bool {
        self.shared.lock().is_some()
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    fn update<T>(&self, f: impl FnOnce(&mut OpenFlow) -> Result<T>) -> Result<T> {
        let mut current = self.shared.lock();
        let flow = current.as_mut().ok_or(CheckoutError::NotOpen)?;
        let out = f(flow)?;
        self.shared.publish(&current);
        Ok(out)
    }
}

impl std::fmt::Debug for CheckoutFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutFlow")
            .field("state", &self.state())
            .field("gateway", &self.gateway.name())
            .finish_non_exhaustive()
    }
}

async fn complete_payment(
    shared: Weak<Shared>,
    gateway: Arc<dyn PaymentGateway>,
    session: SessionId,
    request: PaymentRequest,
) -> Completion {
    let receipt = gateway.attempt(&request).await;

    let Some(shared) = shared.upgrade() else {
        tracing::debug!(session = %session, "Checkout dropped before payment completed");
        return Completion::Stale;
    };

    let mut current = shared.lock();
    let applied = match current.as_mut() {
        Some(flow) if flow.id == session && flow.state == FlowState::Processing => {
            flow.complete(receipt.clone());
            true
        }
        _ => false,
    };

    if applied {
        shared.publish(&current);
        tracing::info!(session = %session, reference = %receipt.reference, "Payment completed");
        Completion::Applied(receipt)
    } else {
        tracing::debug!(session = %session, "Ignoring stale payment completion");
        Completion::Stale
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::form::filled_form;
    use crate::gateway::SimulatedGateway;
    use crate::plan::{BillingCycle, PlanTier, catalog};
    use crate::scroll::CountingScrollLock;

    const LATENCY: Duration = SimulatedGateway::DEFAULT_LATENCY;

    fn flow() -> (CheckoutFlow, Arc<CountingScrollLock>) {
        let lock = Arc::new(CountingScrollLock::new());
        let flow = CheckoutFlow::new(Arc::new(SimulatedGateway::new()), lock.clone());
        (flow, lock)
    }

    fn professional() -> Plan {
        Plan::new("Professional", dec!(29), "per month").unwrap()
    }

    fn held_form(flow: &CheckoutFlow) -> Option<BillingForm> {
        flow.shared.lock().as_ref().map(|f| f.form.clone())
    }

    fn fill(flow: &CheckoutFlow, form: &BillingForm) {
        for field in BillingField::ALL {
            flow.set_field(field, form.get(field)).unwrap();
        }
    }

    #[test]
    fn test_open_starts_at_method_selection() {
        for cycle in [BillingCycle::Monthly, BillingCycle::Annual] {
            for offer in catalog(cycle) {
                let (flow, _) = flow();
                flow.open(offer.plan.clone()).unwrap();
                let snapshot = flow.snapshot();
                assert_eq!(snapshot.state, Some(FlowState::MethodSelection));
                assert_eq!(snapshot.plan, Some(offer.plan));
                assert_eq!(snapshot.form, None);
                assert!(!snapshot.processing && !snapshot.succeeded);
                assert_eq!(held_form(&flow), Some(BillingForm::default()));
            }
        }
    }

    #[test]
    fn test_open_rejects_invalid_plan() {
        let (flow, lock) = flow();
        let plan = Plan {
            name: String::new(),
            price: dec!(29),
            period: "per month".into(),
        };
        assert!(matches!(flow.open(plan), Err(CheckoutError::InvalidPlan(_))));

        let free = Plan {
            name: "Free".into(),
            price: dec!(0),
            period: "per month".into(),
        };
        assert!(flow.open(free).is_err());
        assert!(!flow.is_open());
        assert_eq!(lock.acquisitions(), 0);
    }

    #[test]
    fn test_scenario_a_missing_email_rejected() {
        let (flow, _) = flow();
        flow.open(professional()).unwrap();
        assert_eq!(flow.state(), Some(FlowState::MethodSelection));
        flow.advance_to_details().unwrap();
        assert_eq!(flow.state(), Some(FlowState::DetailsEntry));

        let form = filled_form().with(BillingField::Email, "");
        let err = flow.submit_form(form).unwrap_err();
        assert_eq!(err, CheckoutError::MissingFields(vec![BillingField::Email]));
        assert_eq!(flow.state(), Some(FlowState::DetailsEntry));
        assert!(!flow.snapshot().processing);
    }

    #[test]
    fn test_any_missing_field_keeps_details_entry() {
        let (flow, _) = flow();
        flow.open(professional()).unwrap();
        flow.advance_to_details().unwrap();

        for field in BillingField::ALL {
            fill(&flow, &filled_form().with(field, ""));
            let err = flow.submit().unwrap_err();
            assert_eq!(err, CheckoutError::MissingFields(vec![field]));
            assert_eq!(flow.state(), Some(FlowState::DetailsEntry));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_b_valid_submit_completes_after_delay() {
        let (flow, _) = flow();
        flow.open(professional()).unwrap();
        flow.advance_to_details().unwrap();
        fill(&flow, &filled_form());

        let ticket = flow.submit().unwrap();
        let snapshot = flow.snapshot();
        assert_eq!(snapshot.state, Some(FlowState::Processing));
        assert!(snapshot.processing);
        assert_eq!(snapshot.form, Some(filled_form()));

        tokio::time::sleep(LATENCY / 2).await;
        assert_eq!(flow.state(), Some(FlowState::Processing));

        let completion = ticket.settled().await.unwrap();
        let Completion::Applied(receipt) = completion else {
            panic!("expected applied completion, got {completion:?}");
        };
        assert_eq!(receipt.plan_name, "Professional");
        assert_eq!(receipt.amount, dec!(29));

        let snapshot = flow.snapshot();
        assert_eq!(snapshot.state, Some(FlowState::Completed));
        assert!(snapshot.succeeded && !snapshot.processing);
        assert_eq!(snapshot.form, None);
        assert_eq!(snapshot.receipt, Some(receipt));
        assert_eq!(held_form(&flow), Some(BillingForm::default()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_c_close_during_processing_ignores_completion() {
        let (flow, lock) = flow();
        flow.open(professional()).unwrap();
        flow.advance_to_details().unwrap();
        let ticket = flow.submit_form(filled_form()).unwrap();

        assert!(flow.close());
        assert!(!flow.is_open());
        assert!(!lock.is_locked());
        let closed = flow.snapshot();
        assert_eq!(closed, FlowSnapshot::default());

        tokio::time::sleep(LATENCY * 2).await;
        assert!(ticket.is_finished());
        assert_eq!(ticket.settled().await.unwrap(), Completion::Stale);
        assert_eq!(flow.snapshot(), closed);
        assert_eq!(flow.state(), None);
        assert_eq!(lock.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_d_no_leakage_between_sessions() {
        let (flow, lock) = flow();
        let first = flow.open(professional()).unwrap();
        flow.advance_to_details().unwrap();
        let ticket = flow.submit_form(filled_form()).unwrap();
        ticket.settled().await.unwrap();
        assert_eq!(flow.state(), Some(FlowState::Completed));
        flow.close();

        let starter = PlanTier::Starter.plan(BillingCycle::Monthly);
        let second = flow.open(starter.clone()).unwrap();
        assert_ne!(first, second);

        let snapshot = flow.snapshot();
        assert_eq!(snapshot.state, Some(FlowState::MethodSelection));
        assert_eq!(snapshot.plan, Some(starter));
        assert_eq!(snapshot.receipt, None);
        assert_eq!(held_form(&flow), Some(BillingForm::default()));

        flow.advance_to_details().unwrap();
        assert_eq!(flow.snapshot().form, Some(BillingForm::default()));
        assert_eq!(lock.acquisitions(), 2);
        assert_eq!(lock.releases(), 1);
    }

    #[test]
    fn test_back_navigation_keeps_entered_fields() {
        let (flow, _) = flow();
        flow.open(professional()).unwrap();
        flow.advance_to_details().unwrap();
        flow.set_field(BillingField::Email, "ada@example.com").unwrap();
        flow.set_field(BillingField::Country, "AE").unwrap();

        flow.return_to_method_selection().unwrap();
        let snapshot = flow.snapshot();
        assert_eq!(snapshot.state, Some(FlowState::MethodSelection));
        assert_eq!(snapshot.form, None);

        flow.advance_to_details().unwrap();
        let form = flow.snapshot().form.unwrap();
        assert_eq!(form.email, "ada@example.com");
        assert_eq!(form.country, "AE");
    }

    #[tokio::test(start_paused = true)]
    async fn test_form_locked_while_processing() {
        let (flow, _) = flow();
        flow.open(professional()).unwrap();
        flow.advance_to_details().unwrap();
        let ticket = flow.submit_form(filled_form()).unwrap();

        let err = flow.set_field(BillingField::Email, "other@example.com").unwrap_err();
        assert_eq!(
            err,
            CheckoutError::InvalidTransition {
                command: "set_field",
                state: FlowState::Processing
            }
        );
        assert!(matches!(
            flow.submit(),
            Err(CheckoutError::InvalidTransition { command: "submit", .. })
        ));
        assert!(flow.return_to_method_selection().is_err());
        assert_eq!(flow.snapshot().form.unwrap().email, "ada@example.com");

        ticket.settled().await.unwrap();
        assert_eq!(flow.state(), Some(FlowState::Completed));
    }

    #[test]
    fn test_invalid_transitions_leave_state_alone() {
        let (flow, _) = flow();
        flow.open(professional()).unwrap();
        assert!(flow.submit().is_err());
        assert!(flow.return_to_method_selection().is_err());
        assert!(flow.set_field(BillingField::Cvv, "123").is_err());
        assert_eq!(flow.state(), Some(FlowState::MethodSelection));

        flow.advance_to_details().unwrap();
        assert!(matches!(
            flow.advance_to_details(),
            Err(CheckoutError::InvalidTransition {
                state: FlowState::DetailsEntry,
                ..
            })
        ));
        assert!(flow.choose_method(PaymentMethod::PayPal).is_err());
        assert_eq!(flow.state(), Some(FlowState::DetailsEntry));
    }

    #[test]
    fn test_commands_on_closed_flow() {
        let (flow, lock) = flow();
        assert_eq!(flow.advance_to_details(), Err(CheckoutError::NotOpen));
        assert!(matches!(flow.submit(), Err(CheckoutError::NotOpen)));
        assert!(!flow.close());

        flow.open(professional()).unwrap();
        assert!(flow.close());
        assert!(!flow.close());
        assert!(!flow.close());
        assert_eq!(lock.acquisitions(), 1);
        assert_eq!(lock.releases(), 1);
        assert_eq!(flow.snapshot(), FlowSnapshot::default());
    }

    #[test]
    fn test_reopen_same_plan_is_noop() {
        let (flow, lock) = flow();
        let id = flow.open(professional()).unwrap();
        flow.advance_to_details().unwrap();
        flow.set_field(BillingField::Email, "ada@example.com").unwrap();

        assert_eq!(flow.open(professional()).unwrap(), id);
        assert_eq!(flow.state(), Some(FlowState::DetailsEntry));
        assert_eq!(flow.snapshot().form.unwrap().email, "ada@example.com");
        assert_eq!(lock.acquisitions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopen_different_plan_mid_processing() {
        let (flow, lock) = flow();
        let first = flow.open(professional()).unwrap();
        flow.advance_to_details().unwrap();
        let ticket = flow.submit_form(filled_form()).unwrap();

        let enterprise = PlanTier::Enterprise.plan(BillingCycle::Annual);
        let second = flow.open(enterprise.clone()).unwrap();
        assert_ne!(first, second);
        assert_eq!(flow.state(), Some(FlowState::MethodSelection));
        assert_eq!(held_form(&flow), Some(BillingForm::default()));

        assert_eq!(ticket.settled().await.unwrap(), Completion::Stale);
        let snapshot = flow.snapshot();
        assert_eq!(snapshot.state, Some(FlowState::MethodSelection));
        assert_eq!(snapshot.plan, Some(enterprise));
        assert_eq!(snapshot.session_id, Some(second));
        assert_eq!(lock.acquisitions(), 1);
        assert!(lock.is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopen_after_completed_restarts() {
        let (flow, _) = flow();
        let first = flow.open(professional()).unwrap();
        flow.advance_to_details().unwrap();
        flow.submit_form(filled_form()).unwrap().settled().await.unwrap();

        let second = flow.open(professional()).unwrap();
        assert_ne!(first, second);
        let snapshot = flow.snapshot();
        assert_eq!(snapshot.state, Some(FlowState::MethodSelection));
        assert!(!snapshot.succeeded);
        assert_eq!(snapshot.receipt, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_lock_held_through_completed() {
        let (flow, lock) = flow();
        flow.open(professional()).unwrap();
        assert!(lock.is_locked());
        flow.advance_to_details().unwrap();
        flow.submit_form(filled_form()).unwrap().settled().await.unwrap();
        assert!(lock.is_locked());
        flow.close();
        assert!(!lock.is_locked());
        assert_eq!((lock.acquisitions(), lock.releases()), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_scroll_lock_while_processing() {
        let (flow, lock) = flow();
        flow.open(professional()).unwrap();
        flow.advance_to_details().unwrap();
        let ticket = flow.submit_form(filled_form()).unwrap();

        drop(flow);
        assert!(!lock.is_locked());
        assert_eq!(lock.releases(), 1);
        assert_eq!(ticket.settled().await.unwrap(), Completion::Stale);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selected_method_reaches_receipt() {
        let (flow, _) = flow();
        flow.open(professional()).unwrap();
        flow.choose_method(PaymentMethod::ApplePay).unwrap();
        assert_eq!(flow.snapshot().method, Some(PaymentMethod::ApplePay));
        flow.select_method(PaymentMethod::PayPal).unwrap();
        assert_eq!(flow.state(), Some(FlowState::DetailsEntry));

        let Completion::Applied(receipt) = flow
            .submit_form(filled_form())
            .unwrap()
            .settled()
            .await
            .unwrap()
        else {
            panic!("payment should complete");
        };
        assert_eq!(receipt.method, PaymentMethod::PayPal);
    }

    #[test]
    fn test_direction_hint_is_inert() {
        let (flow, _) = flow();
        flow.open(professional()).unwrap();
        flow.advance_to_details().unwrap();

        let ltr = flow.view(TextDirection::Ltr);
        let rtl = flow.view(TextDirection::Rtl);
        assert_eq!(ltr.snapshot, rtl.snapshot);
        assert_eq!(flow.state(), Some(FlowState::DetailsEntry));

        let json = serde_json::to_value(&rtl).unwrap();
        assert_eq!(json["direction"], "rtl");
        assert_eq!(json["state"], "details_entry");
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_processing_then_completed() {
        let (flow, _) = flow();
        let mut rx = flow.subscribe();
        flow.open(professional()).unwrap();
        flow.advance_to_details().unwrap();
        assert_eq!(rx.borrow_and_update().state, Some(FlowState::DetailsEntry));

        let _ticket = flow.submit_form(filled_form()).unwrap();
        assert!(rx.borrow_and_update().processing);

        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.state, Some(FlowState::Completed));
        assert!(snapshot.succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_only_value_is_accepted() {
        let (flow, _) = flow();
        flow.open(professional()).unwrap();
        flow.advance_to_details().unwrap();

        let ticket = flow
            .submit_form(filled_form().with(BillingField::ZipCode, " "))
            .unwrap();
        assert_eq!(flow.state(), Some(FlowState::Processing));
        assert!(matches!(ticket.settled().await.unwrap(), Completion::Applied(_)));
        assert_eq!(flow.state(), Some(FlowState::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_from_every_state() {
        for target in [
            FlowState::MethodSelection,
            FlowState::DetailsEntry,
            FlowState::Processing,
            FlowState::Completed,
        ] {
            let (flow, lock) = flow();
            flow.open(professional()).unwrap();
            if target != FlowState::MethodSelection {
                flow.advance_to_details().unwrap();
                fill(&flow, &filled_form());
            }
            if matches!(target, FlowState::Processing | FlowState::Completed) {
                let ticket = flow.submit().unwrap();
                if target == FlowState::Completed {
                    ticket.settled().await.unwrap();
                }
            }
            assert_eq!(flow.state(), Some(target));

            assert!(flow.close(), "close from {target}");
            assert_eq!(flow.snapshot(), FlowSnapshot::default());
            assert!(!flow.snapshot().is_open());
            assert_eq!(held_form(&flow), None);
            assert_eq!((lock.acquisitions(), lock.releases()), (1, 1), "lock after close from {target}");

            tokio::time::sleep(LATENCY * 2).await;
            assert_eq!(flow.state(), None);
            assert_eq!(lock.releases(), 1);
        }
    }

    #[test]
    fn test_submit_without_runtime_stays_in_details_entry() {
        let (flow, lock) = flow();
        flow.open(professional()).unwrap();
        flow.advance_to_details().unwrap();

        let err = flow.submit_form(filled_form()).unwrap_err();
        assert!(matches!(err, CheckoutError::TaskFailed(_)));
        assert_eq!(flow.state(), Some(FlowState::DetailsEntry));
        assert_eq!(flow.snapshot().form, Some(filled_form()));
        assert!(lock.is_locked());
    }

    #[test]
    fn test_rejected_submit_form_keeps_typed_values() {
        let (flow, _) = flow();
        flow.open(professional()).unwrap();
        flow.advance_to_details().unwrap();

        let partial = filled_form().with(BillingField::ZipCode, "");
        assert!(flow.submit_form(partial.clone()).is_err());
        assert_eq!(flow.snapshot().form, Some(partial));
    }
}
