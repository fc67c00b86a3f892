use serde::{Deserialize, Serialize};

pub mod mock;
pub mod razorpay;

/// Gateway-side order handle the client pays against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub gateway_order_id: String,
    pub amount_minor: i64,
    pub currency: String,
}

/// Authoritative view of a payment as the gateway reports it. Client-supplied
/// amounts and statuses are never trusted; this is what counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPayment {
    pub payment_id: String,
    pub gateway_order_id: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
}

impl FetchedPayment {
    /// Razorpay reports `captured` once funds are actually charged. Anything
    /// else (`created`, `authorized`, `failed`, `refunded`) is not a capture.
    pub fn is_captured(&self) -> bool {
        self.status == "captured"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway timed out")]
    Timeout,
    #[error("gateway returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("gateway unreachable: {0}")]
    Network(String),
}

#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_order(&self, amount_minor: i64, currency: &str)
        -> Result<GatewayOrder, GatewayError>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<FetchedPayment, GatewayError>;
}
