pub mod orders;

pub use orders::{NewOrderItem, OrderRecord, OrderRepository};
