pub mod orders;

use std::sync::Arc;

use crate::db::DbPool;

/// Aggregate of the services used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub orders: orders::OrderService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            orders: orders::OrderService::new(db),
        }
    }
}
