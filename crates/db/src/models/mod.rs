pub mod activity_log;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod order_log;
pub mod push_subscription;
pub mod user;
