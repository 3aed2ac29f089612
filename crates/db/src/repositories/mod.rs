//! Repository layer. Each repository is a unit struct of async query functions.

pub mod activity_log_repo;
pub mod notification_repo;
pub mod order_assignment_repo;
pub mod order_item_repo;
pub mod order_log_repo;
pub mod order_repo;
pub mod push_subscription_repo;
pub mod user_repo;

pub use activity_log_repo::ActivityLogRepo;
pub use notification_repo::NotificationRepo;
pub use order_assignment_repo::OrderAssignmentRepo;
pub use order_item_repo::OrderItemRepo;
pub use order_log_repo::OrderLogRepo;
pub use order_repo::OrderRepo;
pub use push_subscription_repo::PushSubscriptionRepo;
pub use user_repo::UserRepo;
