use crate::domain::order::{NewOrder, Order, OrderLine, OrderStatus, PaymentMetadata};
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The unique index on razorpay_payment_id rejected the insert: some other
    /// finalize call already won the race for this payment.
    #[error("an order already exists for this gateway payment id")]
    DuplicatePayment,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait::async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists the order and its line items as one atomic write. Fails with
    /// `DuplicatePayment` if an order with the same razorpay_payment_id
    /// already exists; no partial order is ever left behind.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    async fn find_by_gateway_payment_id(
        &self,
        razorpay_payment_id: &str,
    ) -> Result<Option<Order>, StoreError>;

    async fn find_by_id(&self, order_id: Uuid, user_id: Uuid) -> Result<Option<Order>, StoreError>;

    /// The user's orders, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError>;
}

#[derive(Clone)]
pub struct OrdersRepo {
    pub pool: PgPool,
}

impl OrdersRepo {
    async fn load_items(&self, order_id: Uuid) -> anyhow::Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, quantity, unit_price_minor
            FROM order_items
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| OrderLine {
                product_id: r.get("product_id"),
                quantity: r.get("quantity"),
                unit_price_minor: r.get("unit_price_minor"),
            })
            .collect())
    }

    async fn hydrate(&self, row: sqlx::postgres::PgRow) -> anyhow::Result<Order> {
        let order_id: Uuid = row.get("order_id");
        let status: String = row.get("status");
        let items = self.load_items(order_id).await?;

        Ok(Order {
            order_id,
            user_id: row.get("user_id"),
            items,
            shipping_address_id: row.get("shipping_address_id"),
            total_minor: row.get("total_minor"),
            currency: row.get("currency"),
            status: OrderStatus::parse(&status)
                .ok_or_else(|| anyhow::anyhow!("unknown order status in store: {status}"))?,
            payment: PaymentMetadata {
                razorpay_payment_id: row.get("razorpay_payment_id"),
                razorpay_order_id: row.get("razorpay_order_id"),
                gateway_status: row.get("gateway_payment_status"),
            },
            created_at: row.get("created_at"),
        })
    }
}

const ORDER_COLUMNS: &str = "order_id, user_id, shipping_address_id, total_minor, currency, \
     status, razorpay_payment_id, razorpay_order_id, gateway_payment_status, created_at";

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e.as_database_error().and_then(|d| d.code()),
        Some(code) if code == "23505"
    )
}

#[async_trait::async_trait]
impl OrderStore for OrdersRepo {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Other(e.into()))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (
                order_id, user_id, shipping_address_id, total_minor, currency,
                status, razorpay_payment_id, razorpay_order_id, gateway_payment_status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING created_at
            "#,
        )
        .bind(order.order_id)
        .bind(order.user_id)
        .bind(order.shipping_address_id)
        .bind(order.total_minor)
        .bind(order.currency.clone())
        .bind(order.status.as_str())
        .bind(order.payment.razorpay_payment_id.clone())
        .bind(order.payment.razorpay_order_id.clone())
        .bind(order.payment.gateway_status.clone())
        .fetch_one(tx.as_mut())
        .await;

        let created_at: chrono::DateTime<chrono::Utc> = match inserted {
            Ok(row) => row.get("created_at"),
            Err(e) if is_unique_violation(&e) => return Err(StoreError::DuplicatePayment),
            Err(e) => return Err(StoreError::Other(e.into())),
        };

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_item_id, order_id, product_id, quantity, unit_price_minor, position)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(order.order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_minor)
            .bind(position as i32)
            .execute(tx.as_mut())
            .await
            .map_err(|e| StoreError::Other(e.into()))?;
        }

        tx.commit().await.map_err(|e| StoreError::Other(e.into()))?;

        Ok(Order {
            order_id: order.order_id,
            user_id: order.user_id,
            items: order.items,
            shipping_address_id: order.shipping_address_id,
            total_minor: order.total_minor,
            currency: order.currency,
            status: order.status,
            payment: order.payment,
            created_at,
        })
    }

    async fn find_by_gateway_payment_id(
        &self,
        razorpay_payment_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE razorpay_payment_id = $1"
        ))
        .bind(razorpay_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Other(e.into()))?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, order_id: Uuid, user_id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1 AND user_id = $2"
        ))
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Other(e.into()))?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Other(e.into()))?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.hydrate(row).await?);
        }

        Ok(orders)
    }
}
