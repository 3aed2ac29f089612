//! Order workflow event bus and notification delivery.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope carried on the bus.
//! - [`Notifier`]: the interface the order engine uses to reach users after
//!   a write commits; [`Dispatcher`] is the production implementation.
//! - [`delivery`]: external channels (SMTP email, web push fan-out).

pub mod bus;
pub mod delivery;
pub mod notifier;

pub use bus::{EventBus, PlatformEvent};
pub use delivery::email::{EmailConfig, EmailDelivery};
pub use delivery::push::{LogPushTransport, PushFanout, PushTransport};
pub use notifier::{Dispatcher, Notifier, OrderEmail, OrderEmailKind, PushMessage, Recipient};
