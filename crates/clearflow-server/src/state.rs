//! Application State

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use clearflow_checkout::{
    CheckoutConfig, CheckoutFlow, CountingScrollLock, LocaleToggle, PaymentGateway, Plan,
    Result, SessionId,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Open checkout flows, one per visitor
    pub flows: Arc<FlowRegistry>,

    /// Payment gateway shared by every flow
    pub gateway: Arc<dyn PaymentGateway>,

    /// Counts checkout overlays currently holding the page scroll lock
    pub scroll_lock: Arc<CountingScrollLock>,

    /// Site-wide locale, read for the direction hint
    pub locale: Arc<LocaleToggle>,
}

impl AppState {
    pub fn new(config: &CheckoutConfig) -> Self {
        Self {
            flows: Arc::new(FlowRegistry::new(config.idle_ttl)),
            gateway: Arc::new(config.gateway()),
            scroll_lock: Arc::new(CountingScrollLock::new()),
            locale: Arc::new(LocaleToggle::new(config.default_locale)),
        }
    }

    /// Create a flow, open it for `plan`, and register it under its session id
    pub fn open_flow(&self, plan: Plan) -> Result<(SessionId, Arc<CheckoutFlow>)> {
        let flow = Arc::new(CheckoutFlow::new(
            Arc::clone(&self.gateway),
            self.scroll_lock.clone(),
        ));
        let id = flow.open(plan)?;
        self.flows.insert(id.clone(), Arc::clone(&flow));
        Ok((id, flow))
    }
}

/// A registered flow and when a visitor last touched it
struct RegisteredFlow {
    flow: Arc<CheckoutFlow>,
    last_seen: DateTime<Utc>,
}

/// In-memory registry of open flows
///
/// Entries untouched for longer than the idle TTL are closed and dropped by
/// [`FlowRegistry::evict_idle`], which releases their scroll lock.
pub struct FlowRegistry {
    flows: RwLock<HashMap<SessionId, RegisteredFlow>>,
    idle_ttl: TimeDelta,
}

impl FlowRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            flows: RwLock::new(HashMap::new()),
            idle_ttl: TimeDelta::from_std(idle_ttl).unwrap_or_else(|_| TimeDelta::days(365)),
        }
    }

    pub fn insert(&self, id: SessionId, flow: Arc<CheckoutFlow>) {
        let entry = RegisteredFlow {
            flow,
            last_seen: Utc::now(),
        };
        self.flows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, entry);
    }

    /// Look up a flow and mark it as recently used
    pub fn get(&self, id: &SessionId) -> Option<Arc<CheckoutFlow>> {
        let mut flows = self.flows.write().unwrap_or_else(PoisonError::into_inner);
        let entry = flows.get_mut(id)?;
        entry.last_seen = Utc::now();
        Some(Arc::clone(&entry.flow))
    }

    pub fn remove(&self, id: &SessionId) -> Option<Arc<CheckoutFlow>> {
        self.flows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .map(|entry| entry.flow)
    }

    pub fn len(&self) -> usize {
        self.flows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Close and forget every flow idle for longer than the TTL as of `now`
    ///
    /// Returns how many flows were evicted.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now.checked_sub_signed(self.idle_ttl).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let evicted: Vec<(SessionId, RegisteredFlow)> = {
            let mut flows = self.flows.write().unwrap_or_else(PoisonError::into_inner);
            let stale: Vec<SessionId> = flows
                .iter()
                .filter(|(_, entry)| entry.last_seen < cutoff)
                .map(|(id, _)| id.clone())
                .collect();
            stale
                .into_iter()
                .filter_map(|id| flows.remove(&id).map(|entry| (id, entry)))
                .collect()
        };

        // close outside the registry lock; a handler may still hold a clone
        for (id, entry) in &evicted {
            let state = entry.flow.state();
            entry.flow.close();
            tracing::info!(session = %id, ?state, last_seen = %entry.last_seen, "Evicted idle checkout");
        }
        evicted.len()
    }
}

/// Periodically evict idle checkouts until the runtime shuts down
pub fn spawn_idle_sweeper(flows: Arc<FlowRegistry>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = flows.evict_idle(Utc::now());
            if evicted > 0 {
                tracing::debug!(evicted, remaining = flows.len(), "Idle checkout sweep");
            }
        }
    })
}
