pub mod config;
pub mod domain {
    pub mod order;
}
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod orders;
        pub mod payments;
    }
    pub mod middleware {
        pub mod auth;
    }
}
pub mod repo {
    pub mod memory;
    pub mod orders_repo;
}
pub mod service {
    pub mod order_service;
}
pub mod signature;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub order_service: Arc<service::order_service::OrderFinalizer>,
    pub orders: Arc<dyn repo::orders_repo::OrderStore>,
}
