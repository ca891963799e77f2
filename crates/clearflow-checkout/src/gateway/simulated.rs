//! Simulated Gateway
//!
//! Stands in for a real payment round trip: waits a fixed latency, then
//! approves. Card details are never inspected.

use std::time::Duration;

use async_trait::async_trait;

use super::{PaymentGateway, PaymentReceipt, PaymentRequest};

/// Fixed-latency gateway that always succeeds
#[derive(Clone, Debug)]
pub struct SimulatedGateway {
    latency: Duration,
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedGateway {
    /// Reference latency of the hosted demo
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(3000);

    pub const fn new() -> Self {
        Self { latency: Self::DEFAULT_LATENCY }
    }

    pub const fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    pub const fn latency(&self) -> Duration {
        self.latency
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn attempt(&self, request: &PaymentRequest) -> PaymentReceipt {
        tracing::debug!(
            plan = %request.plan.name,
            method = request.method.as_str(),
            latency = ?self.latency,
            "Simulating payment"
        );
        tokio::time::sleep(self.latency).await;
        PaymentReceipt::for_request(request)
    }

    fn name(&self) -> &str {
        "SimulatedGateway"
    }
}
