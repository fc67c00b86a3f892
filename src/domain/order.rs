use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Fulfillment moves strictly forward; cancellation is reachable from any
    /// state before the order has shipped. Orders are never deleted, so
    /// `Cancelled` and `Delivered` are terminal.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (PendingPayment, Paid) => true,
            (Paid, Processing) => true,
            (Processing, Shipped) => true,
            (Shipped, Delivered) => true,
            (PendingPayment | Paid | Processing, Cancelled) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "PENDING_PAYMENT",
            OrderStatus::Paid => "PAID",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "PENDING_PAYMENT" => Some(OrderStatus::PendingPayment),
            "PAID" => Some(OrderStatus::Paid),
            "PROCESSING" => Some(OrderStatus::Processing),
            "SHIPPED" => Some(OrderStatus::Shipped),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// One product/quantity/price entry within an order. `unit_price_minor` is the
/// catalog price at the moment of purchase and is never re-read afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_minor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMetadata {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    /// Status string the gateway reported when the order was finalized.
    pub gateway_status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderLine>,
    pub shipping_address_id: Uuid,
    pub total_minor: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub payment: PaymentMetadata,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Everything the finalizer decided to persist. The store assigns nothing;
/// identity and totals are fixed here so concurrent finalizers race only on
/// the payment-id uniqueness constraint.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderLine>,
    pub shipping_address_id: Uuid,
    pub total_minor: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub payment: PaymentMetadata,
}

/// Request body of `POST /payments/verify`. Field names mirror the checkout
/// widget's callback payload, which mixes snake_case and camelCase.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub razorpay_order_id: String,
    #[serde(default)]
    pub razorpay_payment_id: String,
    #[serde(default)]
    pub razorpay_signature: String,
    #[serde(rename = "orderItems", default)]
    pub order_items: Vec<OrderItemInput>,
    #[serde(rename = "shippingAddress")]
    pub shipping_address: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemInput {
    pub product: Uuid,
    pub quantity: i32,
    /// Unit price in minor units as the client saw it at checkout. Audited,
    /// never authoritative for the charge total.
    pub price: i64,
}
