use checkout_gateway::domain::order::{
    NewOrder, Order, OrderItemInput, OrderStatus, VerifyPaymentRequest,
};
use checkout_gateway::gateways::mock::MockGateway;
use checkout_gateway::repo::memory::MemoryOrderStore;
use checkout_gateway::repo::orders_repo::{OrderStore, StoreError};
use checkout_gateway::service::order_service::{FinalizeError, OrderFinalizer};
use checkout_gateway::signature::sign;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

const SECRET: &str = "rzp_test_secret";

fn finalizer(store: Arc<MemoryOrderStore>, behavior: &str, amount_minor: i64) -> OrderFinalizer {
    OrderFinalizer {
        orders: store,
        gateway: Arc::new(MockGateway::new(behavior, amount_minor)),
        key_secret: SECRET.to_string(),
    }
}

fn claim(order_id: &str, payment_id: &str) -> VerifyPaymentRequest {
    VerifyPaymentRequest {
        razorpay_order_id: order_id.to_string(),
        razorpay_payment_id: payment_id.to_string(),
        razorpay_signature: sign(order_id, payment_id, SECRET),
        order_items: vec![
            OrderItemInput {
                product: Uuid::new_v4(),
                quantity: 2,
                price: 15_000,
            },
            OrderItemInput {
                product: Uuid::new_v4(),
                quantity: 1,
                price: 20_000,
            },
        ],
        shipping_address: Some(Uuid::new_v4()),
    }
}

#[tokio::test]
async fn captured_payment_creates_paid_order() {
    let store = Arc::new(MemoryOrderStore::default());
    let svc = finalizer(store.clone(), "ALWAYS_CAPTURED", 50_000);
    let user = Uuid::new_v4();

    let outcome = svc.finalize(user, claim("order_ABC", "pay_XYZ")).await.unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.order.status, OrderStatus::Paid);
    assert_eq!(outcome.order.user_id, user);
    assert_eq!(outcome.order.payment.razorpay_payment_id, "pay_XYZ");
    assert_eq!(outcome.order.payment.razorpay_order_id, "order_ABC");
    assert_eq!(outcome.order.payment.gateway_status, "captured");
    assert_eq!(outcome.order.items.len(), 2);

    let stored = store.find_by_gateway_payment_id("pay_XYZ").await.unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn invalid_signature_writes_nothing() {
    let store = Arc::new(MemoryOrderStore::default());
    let svc = finalizer(store.clone(), "ALWAYS_CAPTURED", 50_000);

    // Signature was computed over a different payment id.
    let mut req = claim("order_ABC", "pay_XYZ");
    req.razorpay_signature = sign("order_ABC", "pay_OLD", SECRET);

    let err = svc.finalize(Uuid::new_v4(), req).await.unwrap_err();
    assert!(matches!(err, FinalizeError::Signature));
    assert!(store
        .find_by_gateway_payment_id("pay_XYZ")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn uncaptured_payment_writes_nothing_even_with_valid_signature() {
    let store = Arc::new(MemoryOrderStore::default());
    let svc = finalizer(store.clone(), "CREATED_ONLY", 50_000);

    let err = svc
        .finalize(Uuid::new_v4(), claim("order_ABC", "pay_XYZ"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FinalizeError::PaymentNotCompleted { ref status } if status == "created"
    ));
    assert!(store
        .find_by_gateway_payment_id("pay_XYZ")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn total_comes_from_gateway_not_client() {
    let store = Arc::new(MemoryOrderStore::default());
    // Client claims 50_000 in line items; gateway captured 42_000.
    let svc = finalizer(store.clone(), "ALWAYS_CAPTURED", 42_000);

    let outcome = svc
        .finalize(Uuid::new_v4(), claim("order_ABC", "pay_XYZ"))
        .await
        .unwrap();

    assert_eq!(outcome.order.total_minor, 42_000);
    // Line-item prices stay as the client saw them, for audit.
    assert_eq!(outcome.order.items[0].unit_price_minor, 15_000);
}

#[tokio::test]
async fn duplicate_submission_returns_existing_order() {
    let store = Arc::new(MemoryOrderStore::default());
    let svc = finalizer(store.clone(), "ALWAYS_CAPTURED", 50_000);
    let user = Uuid::new_v4();

    let first = svc.finalize(user, claim("order_ABC", "pay_XYZ")).await.unwrap();
    let second = svc.finalize(user, claim("order_ABC", "pay_XYZ")).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.order.order_id, second.order.order_id);
    assert_eq!(store.list_for_user(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_submissions_create_exactly_one_order() {
    let store = Arc::new(MemoryOrderStore::default());
    let svc = Arc::new(finalizer(store.clone(), "ALWAYS_CAPTURED", 50_000));
    let user = Uuid::new_v4();

    let a = {
        let svc = svc.clone();
        tokio::spawn(async move { svc.finalize(user, claim("order_ABC", "pay_XYZ")).await })
    };
    let b = {
        let svc = svc.clone();
        tokio::spawn(async move { svc.finalize(user, claim("order_ABC", "pay_XYZ")).await })
    };

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();

    assert_eq!(a.order.order_id, b.order.order_id);
    assert_eq!(store.list_for_user(user).await.unwrap().len(), 1);
}

/// Delegates to a shared in-memory store but answers the first idempotency
/// lookup with a miss, the way a concurrent finalize can read before the
/// winner's insert commits. Conflicts are counted so a test can tell the
/// uniqueness-constraint path actually ran.
struct StaleLookupStore {
    inner: Arc<MemoryOrderStore>,
    hide_next_lookup: AtomicBool,
    conflicts: AtomicU32,
}

#[async_trait::async_trait]
impl OrderStore for StaleLookupStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let result = self.inner.insert_order(order).await;
        if matches!(result, Err(StoreError::DuplicatePayment)) {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    async fn find_by_gateway_payment_id(
        &self,
        razorpay_payment_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        if self.hide_next_lookup.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_by_gateway_payment_id(razorpay_payment_id).await
    }

    async fn find_by_id(&self, order_id: Uuid, user_id: Uuid) -> Result<Option<Order>, StoreError> {
        self.inner.find_by_id(order_id, user_id).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, StoreError> {
        self.inner.list_for_user(user_id).await
    }
}

#[tokio::test]
async fn lost_insert_race_resolves_to_winning_order() {
    let inner = Arc::new(MemoryOrderStore::default());
    let user = Uuid::new_v4();

    let winner_svc = finalizer(inner.clone(), "ALWAYS_CAPTURED", 50_000);
    let winner = winner_svc
        .finalize(user, claim("order_ABC", "pay_XYZ"))
        .await
        .unwrap();
    assert!(winner.created);

    // Replay the interleaving where the loser's pre-insert lookup ran before
    // the winner's insert committed: the lookup misses, the insert hits the
    // uniqueness constraint, and resolution re-reads the winner's order.
    let stale = Arc::new(StaleLookupStore {
        inner: inner.clone(),
        hide_next_lookup: AtomicBool::new(true),
        conflicts: AtomicU32::new(0),
    });
    let loser_svc = OrderFinalizer {
        orders: stale.clone(),
        gateway: Arc::new(MockGateway::new("ALWAYS_CAPTURED", 50_000)),
        key_secret: SECRET.to_string(),
    };

    let loser = loser_svc
        .finalize(user, claim("order_ABC", "pay_XYZ"))
        .await
        .unwrap();

    assert!(!loser.created);
    assert_eq!(loser.order.order_id, winner.order.order_id);
    assert_eq!(stale.conflicts.load(Ordering::SeqCst), 1);
    assert_eq!(inner.list_for_user(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn extreme_client_prices_do_not_abort_finalize() {
    let store = Arc::new(MemoryOrderStore::default());
    let svc = finalizer(store.clone(), "ALWAYS_CAPTURED", 50_000);
    let user = Uuid::new_v4();

    // The audit total would overflow i64; the charge of record still comes
    // from the gateway and the finalize must not panic.
    let mut req = claim("order_ABC", "pay_XYZ");
    req.order_items[0].price = i64::MAX;
    req.order_items[0].quantity = i32::MAX;

    let outcome = svc.finalize(user, req).await.unwrap();
    assert_eq!(outcome.order.total_minor, 50_000);
    assert_eq!(store.list_for_user(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn gateway_timeout_is_retryable_and_leaves_no_order() {
    let store = Arc::new(MemoryOrderStore::default());
    let user = Uuid::new_v4();

    let down = finalizer(store.clone(), "ALWAYS_TIMEOUT", 50_000);
    let err = down.finalize(user, claim("order_ABC", "pay_XYZ")).await.unwrap_err();
    assert!(matches!(err, FinalizeError::UpstreamTimeout));
    assert!(store
        .find_by_gateway_payment_id("pay_XYZ")
        .await
        .unwrap()
        .is_none());

    // Gateway recovers; the retry with the same payment id succeeds once.
    let up = finalizer(store.clone(), "ALWAYS_CAPTURED", 50_000);
    let outcome = up.finalize(user, claim("order_ABC", "pay_XYZ")).await.unwrap();
    assert!(outcome.created);
    assert_eq!(store.list_for_user(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn missing_fields_are_rejected_before_any_side_effect() {
    let store = Arc::new(MemoryOrderStore::default());
    let svc = finalizer(store.clone(), "ALWAYS_CAPTURED", 50_000);
    let user = Uuid::new_v4();

    let mut missing_payment = claim("order_ABC", "pay_XYZ");
    missing_payment.razorpay_payment_id = String::new();
    assert!(matches!(
        svc.finalize(user, missing_payment).await.unwrap_err(),
        FinalizeError::Validation(_)
    ));

    let mut no_items = claim("order_ABC", "pay_XYZ");
    no_items.order_items.clear();
    assert!(matches!(
        svc.finalize(user, no_items).await.unwrap_err(),
        FinalizeError::Validation(_)
    ));

    let mut no_address = claim("order_ABC", "pay_XYZ");
    no_address.shipping_address = None;
    assert!(matches!(
        svc.finalize(user, no_address).await.unwrap_err(),
        FinalizeError::Validation(_)
    ));

    let mut zero_quantity = claim("order_ABC", "pay_XYZ");
    zero_quantity.order_items[0].quantity = 0;
    assert!(matches!(
        svc.finalize(user, zero_quantity).await.unwrap_err(),
        FinalizeError::Validation(_)
    ));

    assert_eq!(store.list_for_user(user).await.unwrap().len(), 0);
}

#[tokio::test]
async fn distinct_payments_create_distinct_orders() {
    let store = Arc::new(MemoryOrderStore::default());
    let svc = finalizer(store.clone(), "ALWAYS_CAPTURED", 50_000);
    let user = Uuid::new_v4();

    let first = svc.finalize(user, claim("order_A", "pay_1")).await.unwrap();
    let second = svc.finalize(user, claim("order_B", "pay_2")).await.unwrap();

    assert_ne!(first.order.order_id, second.order.order_id);

    let mine = store.list_for_user(user).await.unwrap();
    assert_eq!(mine.len(), 2);
    // Newest first.
    assert!(mine[0].created_at >= mine[1].created_at);
}

#[test]
fn order_status_transitions_follow_fulfillment_path() {
    use OrderStatus::*;

    assert!(PendingPayment.can_transition_to(Paid));
    assert!(Paid.can_transition_to(Processing));
    assert!(Processing.can_transition_to(Shipped));
    assert!(Shipped.can_transition_to(Delivered));

    // Cancellation is allowed until the order ships.
    assert!(PendingPayment.can_transition_to(Cancelled));
    assert!(Paid.can_transition_to(Cancelled));
    assert!(Processing.can_transition_to(Cancelled));
    assert!(!Shipped.can_transition_to(Cancelled));
    assert!(!Delivered.can_transition_to(Cancelled));

    // No skipping forward, no moving back.
    assert!(!Paid.can_transition_to(Shipped));
    assert!(!Shipped.can_transition_to(Paid));
    assert!(!Cancelled.can_transition_to(Processing));
}
