use crate::domain::order::{
    NewOrder, Order, OrderLine, OrderStatus, PaymentMetadata, VerifyPaymentRequest,
};
use crate::gateways::{GatewayError, PaymentGateway};
use crate::repo::orders_repo::{OrderStore, StoreError};
use crate::signature;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid signature")]
    Signature,
    #[error("payment not completed, gateway reports '{status}'")]
    PaymentNotCompleted { status: String },
    #[error("payment gateway timed out")]
    UpstreamTimeout,
    #[error("payment gateway error: {0}")]
    Upstream(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct FinalizeOutcome {
    pub order: Order,
    /// False when this call found an order already finalized for the same
    /// gateway payment id and returned it instead of writing a duplicate.
    pub created: bool,
}

pub struct OrderFinalizer {
    pub orders: Arc<dyn OrderStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    /// Shared secret the gateway signs completion callbacks with. Never
    /// logged, never echoed in responses.
    pub key_secret: String,
}

impl OrderFinalizer {
    /// The one allowed path from "client claims payment succeeded" to "order
    /// exists and is paid". Each gate must pass before the next runs; no gate
    /// leaves partial state behind, so any failure is safe to retry.
    pub async fn finalize(
        &self,
        user_id: Uuid,
        req: VerifyPaymentRequest,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        let shipping_address_id = validate(&req)?;

        if !signature::verify(
            &req.razorpay_order_id,
            &req.razorpay_payment_id,
            &req.razorpay_signature,
            &self.key_secret,
        ) {
            tracing::warn!(
                razorpay_order_id = %req.razorpay_order_id,
                razorpay_payment_id = %req.razorpay_payment_id,
                "rejected payment claim with invalid signature"
            );
            return Err(FinalizeError::Signature);
        }

        let payment = self
            .gateway
            .fetch_payment(&req.razorpay_payment_id)
            .await
            .map_err(|e| {
                tracing::warn!(
                    gateway = self.gateway.name(),
                    razorpay_payment_id = %req.razorpay_payment_id,
                    error = %e,
                    "payment status lookup failed"
                );
                match e {
                    GatewayError::Timeout => FinalizeError::UpstreamTimeout,
                    other => FinalizeError::Upstream(other.to_string()),
                }
            })?;

        if let Some(existing) = self
            .orders
            .find_by_gateway_payment_id(&req.razorpay_payment_id)
            .await
            .map_err(store_internal)?
        {
            return Ok(FinalizeOutcome {
                order: existing,
                created: false,
            });
        }

        if !payment.is_captured() {
            return Err(FinalizeError::PaymentNotCompleted {
                status: payment.status,
            });
        }

        // The gateway-confirmed captured amount is the charge of record. The
        // client's line-item prices are kept for audit; a mismatch is worth a
        // log line, not a rejection.
        let items: Vec<OrderLine> = req
            .order_items
            .iter()
            .map(|i| OrderLine {
                product_id: i.product,
                quantity: i.quantity,
                unit_price_minor: i.price,
            })
            .collect();
        // Saturating: this total is advisory, and extreme client-supplied
        // prices must not abort the finalize.
        let items_total = items.iter().fold(0i64, |total, i| {
            total.saturating_add(i.unit_price_minor.saturating_mul(i64::from(i.quantity)))
        });
        if items_total != payment.amount_minor {
            tracing::warn!(
                razorpay_payment_id = %req.razorpay_payment_id,
                items_total_minor = items_total,
                captured_minor = payment.amount_minor,
                "client line-item total differs from gateway-captured amount"
            );
        }

        let new_order = NewOrder {
            order_id: Uuid::new_v4(),
            user_id,
            items,
            shipping_address_id,
            total_minor: payment.amount_minor,
            currency: payment.currency.clone(),
            status: OrderStatus::Paid,
            payment: PaymentMetadata {
                razorpay_payment_id: req.razorpay_payment_id.clone(),
                razorpay_order_id: req.razorpay_order_id.clone(),
                gateway_status: payment.status.clone(),
            },
        };

        match self.orders.insert_order(new_order).await {
            Ok(order) => Ok(FinalizeOutcome {
                order,
                created: true,
            }),
            // Lost the race between the lookup above and this insert; the
            // unique index is the final arbiter. Resolve to the winner's
            // order so retries and double-submits converge on one result.
            Err(StoreError::DuplicatePayment) => {
                let existing = self
                    .orders
                    .find_by_gateway_payment_id(&req.razorpay_payment_id)
                    .await
                    .map_err(store_internal)?
                    .ok_or_else(|| {
                        anyhow::anyhow!("duplicate payment id reported but no order found")
                    })?;

                Ok(FinalizeOutcome {
                    order: existing,
                    created: false,
                })
            }
            Err(StoreError::Other(e)) => Err(FinalizeError::Internal(e)),
        }
    }
}

fn validate(req: &VerifyPaymentRequest) -> Result<Uuid, FinalizeError> {
    if req.razorpay_order_id.is_empty() {
        return Err(FinalizeError::Validation("razorpay_order_id is required".to_string()));
    }
    if req.razorpay_payment_id.is_empty() {
        return Err(FinalizeError::Validation("razorpay_payment_id is required".to_string()));
    }
    if req.razorpay_signature.is_empty() {
        return Err(FinalizeError::Validation("razorpay_signature is required".to_string()));
    }
    if req.order_items.is_empty() {
        return Err(FinalizeError::Validation("orderItems must not be empty".to_string()));
    }
    for item in &req.order_items {
        if item.quantity < 1 {
            return Err(FinalizeError::Validation("item quantity must be at least 1".to_string()));
        }
        if item.price < 0 {
            return Err(FinalizeError::Validation("item price must not be negative".to_string()));
        }
    }

    req.shipping_address
        .ok_or_else(|| FinalizeError::Validation("shippingAddress is required".to_string()))
}

fn store_internal(e: StoreError) -> FinalizeError {
    match e {
        StoreError::Other(inner) => FinalizeError::Internal(inner),
        other => FinalizeError::Internal(anyhow::anyhow!(other)),
    }
}
