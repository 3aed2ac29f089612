//! Order emails via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport and sends
//! plain-text mail. Rendering is separate and pure so it can be tested
//! without a server. If `SMTP_HOST` is not set, [`EmailConfig::from_env`]
//! returns `None` and no mailer is constructed.

use std::fmt::Write as _;

use crate::notifier::{OrderEmail, OrderEmailKind, Recipient};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

const DEFAULT_SMTP_PORT: u16 = 587;

const DEFAULT_FROM_ADDRESS: &str = "orders@ama.local";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable        | Required | Default             |
    /// |-----------------|----------|---------------------|
    /// | `SMTP_HOST`     | yes      | --                  |
    /// | `SMTP_PORT`     | no       | `587`               |
    /// | `SMTP_FROM`     | no       | `orders@ama.local`  |
    /// | `SMTP_USER`     | no       | --                  |
    /// | `SMTP_PASSWORD` | no       | --                  |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok().filter(|h| !h.is_empty())?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

pub struct EmailDelivery {
    config: EmailConfig,
}

impl EmailDelivery {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Send one plain-text email.
    pub async fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to_email.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        tracing::info!(to = to_email, subject, "Order email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn title_of(order: &OrderEmail) -> &str {
    order
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or("Untitled Order")
}

/// Render the subject and body of an order email for one recipient.
pub fn render_order_email(
    kind: OrderEmailKind,
    order: &OrderEmail,
    recipient: &Recipient,
    actor: &Recipient,
    changes: &[String],
) -> (String, String) {
    let title = title_of(order);
    let (subject, lead) = match kind {
        OrderEmailKind::Created => (
            format!("New order #{}: {title}", order.id),
            format!("{} assigned you a new order.", actor.username),
        ),
        OrderEmailKind::Updated => (
            format!("Order #{} updated: {title}", order.id),
            format!("{} updated an order assigned to you.", actor.username),
        ),
        OrderEmailKind::UpdatedByTaker => (
            format!("Order #{} updated by {}", order.id, actor.username),
            format!("{} updated your order.", actor.username),
        ),
        OrderEmailKind::CompletedForAccounter => (
            format!("Order #{} ready for review", order.id),
            "An order routed to you has been completed and is ready to be entered into the ERP."
                .to_string(),
        ),
    };

    let show_prices = kind == OrderEmailKind::CompletedForAccounter;
    let mut body = format!("Hello {},\n\n{lead}\n\n", recipient.username);
    write_order_block(&mut body, order, show_prices);

    if !changes.is_empty() {
        body.push_str("\nRecent changes:\n");
        for change in changes {
            let _ = writeln!(body, "  - {change}");
        }
    }

    (subject, body)
}

/// Render one email listing several orders.
pub fn render_bulk_email(
    orders: &[OrderEmail],
    recipient: &Recipient,
    sender: &Recipient,
) -> (String, String) {
    let subject = format!("{} orders from {}", orders.len(), sender.username);
    let mut body = format!(
        "Hello {},\n\n{} sent you {} orders.\n",
        recipient.username,
        sender.username,
        orders.len()
    );
    for order in orders {
        body.push('\n');
        write_order_block(&mut body, order, false);
    }
    (subject, body)
}

fn write_order_block(out: &mut String, order: &OrderEmail, show_prices: bool) {
    let _ = writeln!(out, "Order #{}: {}", order.id, title_of(order));
    let _ = writeln!(out, "Status: {}", order.status);
    if let Some(city) = order.city.as_deref().filter(|c| !c.is_empty()) {
        let _ = writeln!(out, "City: {city}");
    }
    if order.items.is_empty() {
        return;
    }
    out.push_str("Items:\n");
    for item in &order.items {
        let _ = write!(out, "  - {} x {}", item.name, item.quantity);
        if let (true, Some(price)) = (show_prices, item.price.as_deref()) {
            let _ = write!(out, " @ {price}");
        }
        if let Some(status) = item.status.as_deref() {
            let _ = write!(out, " [{status}]");
        }
        out.push('\n');
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
