use crate::domain::order::{NewOrder, Order};
use crate::repo::orders_repo::{OrderStore, StoreError};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-memory order store with the same uniqueness contract as the Postgres
/// repo. Lookups and inserts run under one mutex, so the payment-id check and
/// the write are atomic the way a unique index makes them in the database.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: Mutex<HashMap<Uuid, Order>>,
}

#[async_trait::async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut orders = self.orders.lock().await;

        if orders
            .values()
            .any(|o| o.payment.razorpay_payment_id == order.payment.razorpay_payment_id)
        {
            return Err(StoreError::DuplicatePayment);
        }

        let stored = Order {
            order_id: order.order_id,
            user_id: order.user_id,
            items: order.items,
            shipping_address_id: order.shipping_address_id,
            total_minor: order.total_minor,
            currency: order.currency,
            status: order.status,
            payment: order.payment,
            created_at: chrono::Utc::now(),
        };
        orders.insert(stored.order_id, stored.clone());

        Ok(stored)
    }

    async fn find_by_gateway_payment_id(
        &self,
        razorpay_payment_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.lock().await;
        Ok(orders
            .values()
            .find(|o| o.payment.razorpay_payment_id == razorpay_payment_id)
            .cloned())
    }

    async fn find_by_id(&self, order_id: Uuid, user_id: Uuid) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.lock().await;
        Ok(orders
            .get(&order_id)
            .filter(|o| o.user_id == user_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.lock().await;
        let mut mine: Vec<Order> = orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }
}
