pub mod order;
pub mod order_item;
pub mod user;
