use crate::gateways::{FetchedPayment, GatewayError, GatewayOrder, PaymentGateway};
use std::sync::atomic::{AtomicU64, Ordering};

/// Behavior-driven stand-in for the real gateway. `ALWAYS_CAPTURED` answers
/// every payment lookup as captured at `amount_minor`; `ALWAYS_TIMEOUT`
/// simulates an unreachable gateway; any other behavior string reports the
/// payment as still `created`.
pub struct MockGateway {
    pub behavior: String,
    pub amount_minor: i64,
    counter: AtomicU64,
}

impl MockGateway {
    pub fn new(behavior: &str, amount_minor: i64) -> Self {
        Self {
            behavior: behavior.to_string(),
            amount_minor,
            counter: AtomicU64::new(0),
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        if self.behavior == "ALWAYS_TIMEOUT" {
            return Err(GatewayError::Timeout);
        }

        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(GatewayOrder {
            gateway_order_id: format!("order_mock_{n}"),
            amount_minor,
            currency: currency.to_string(),
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<FetchedPayment, GatewayError> {
        let status = match self.behavior.as_str() {
            "ALWAYS_TIMEOUT" => return Err(GatewayError::Timeout),
            "ALWAYS_CAPTURED" => "captured",
            _ => "created",
        };

        Ok(FetchedPayment {
            payment_id: payment_id.to_string(),
            gateway_order_id: None,
            amount_minor: self.amount_minor,
            currency: "INR".to_string(),
            status: status.to_string(),
        })
    }
}
