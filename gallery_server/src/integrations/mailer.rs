//! Notification fan-out.
//!
//! Subscribes to the engine's order events and sends plain-text email via SMTP:
//! * `OrderPaidEvent` → one sale notice per implicated artist (grouped by artist), plus an admin summary that
//!   also carries the reconciliation warnings, the artists that could not be reached, and any send failures.
//! * `OrderShippedEvent` → a single dispatch notice to the buyer, when the order has an email.
//!
//! Every individual send is isolated: one failing recipient never prevents the remaining sends, and nothing in
//! here propagates back into a request. Absence of SMTP configuration degrades the whole fan-out to a no-op.

use std::{collections::BTreeMap, future::Future, pin::Pin};

use gallery_engine::{
    db_types::Order,
    events::{EventHandlers, EventHooks},
    order_objects::{ItemLine, PaidOrderSummary},
};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport,
    AsyncTransport,
    Message,
    Tokio1Executor,
};
use log::*;
use thiserror::Error;

use crate::config::{ServerConfig, SmtpConfig};

pub const MAILER_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Invalid mailer configuration: {0}")]
    Configuration(String),
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
    #[error("Sending failed: {0}")]
    SendFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[allow(async_fn_in_trait)]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &EmailMessage) -> Result<(), MailerError>;
}

//--------------------------------------      SmtpMailer       --------------------------------------------------------
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailerError> {
        let from = config
            .from_address
            .parse::<Mailbox>()
            .map_err(|e| MailerError::Configuration(format!("Invalid from address: {e}")))?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MailerError::Configuration(format!("Failed to create SMTP relay: {e}")))?
            .port(config.port);
        if !config.user.is_empty() {
            builder = builder.credentials(Credentials::new(config.user.clone(), config.password.reveal().clone()));
        }
        Ok(Self { transport: builder.build(), from })
    }
}

impl EmailSender for SmtpMailer {
    async fn send(&self, email: &EmailMessage) -> Result<(), MailerError> {
        let to = email.to.parse::<Mailbox>().map_err(|e| MailerError::InvalidRecipient(e.to_string()))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| MailerError::SendFailed(format!("Failed to build message: {e}")))?;
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| MailerError::SendFailed(format!("Failed to send email: {e}")))
    }
}

//--------------------------------------       Fan-out         --------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct NotificationReport {
    pub artist_emails_sent: usize,
    pub missing_contacts: Vec<String>,
    pub failures: Vec<String>,
    pub admin_summary_sent: bool,
}

/// Email every artist implicated in a paid order, then the admin. Failures are collected into the returned
/// report, never returned as errors: this function always runs to the end of the recipient list.
pub async fn dispatch_order_notifications<S: EmailSender>(
    summary: &PaidOrderSummary,
    sender: &S,
    admin_email: Option<&str>,
) -> NotificationReport {
    let mut report = NotificationReport::default();
    let order = &summary.order;
    let mut by_artist: BTreeMap<i64, Vec<&ItemLine>> = BTreeMap::new();
    for item in &summary.items {
        by_artist.entry(item.artist_id).or_default().push(item);
    }
    for (artist_id, items) in &by_artist {
        let artist_name = items[0].artist_name.as_str();
        let contact = items[0].contact_email.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let Some(contact) = contact else {
            info!("📧️ Artist {artist_name} (#{artist_id}) has no contact email. Skipping their sale notice.");
            report.missing_contacts.push(artist_name.to_string());
            continue;
        };
        let email = EmailMessage {
            to: contact.to_string(),
            subject: format!("New sale — order #{}", order.id),
            body: artist_email_body(order, artist_name, items),
        };
        match sender.send(&email).await {
            Ok(()) => report.artist_emails_sent += 1,
            Err(e) => {
                warn!("📧️ Could not email artist {artist_name}. {e}");
                report.failures.push(format!("{artist_name} <{contact}>: {e}"));
            },
        }
    }
    match admin_email {
        Some(admin) => {
            let email = EmailMessage {
                to: admin.to_string(),
                subject: format!("Order #{} paid — {}", order.id, order.total),
                body: admin_summary_body(summary, &report),
            };
            match sender.send(&email).await {
                Ok(()) => report.admin_summary_sent = true,
                Err(e) => {
                    warn!("📧️ Could not send the admin summary. {e}");
                    report.failures.push(format!("admin <{admin}>: {e}"));
                },
            }
        },
        None => debug!("📧️ No admin email configured. Skipping the admin summary."),
    }
    report
}

/// Send the buyer their dispatch notice. Returns `Ok(false)` when the order carries no email address.
pub async fn dispatch_shipped_notification<S: EmailSender>(order: &Order, sender: &S) -> Result<bool, MailerError> {
    let Some(to) = order.email.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(false);
    };
    let email = EmailMessage {
        to: to.to_string(),
        subject: format!("Your order #{} has shipped", order.id),
        body: shipped_email_body(order),
    };
    sender.send(&email).await?;
    Ok(true)
}

fn format_item(item: &ItemLine) -> String {
    match &item.variant_label {
        Some(label) => format!("{} × {} ({label}) — {} each", item.quantity, item.work_title, item.unit_price),
        None => format!("{} × {} — {} each", item.quantity, item.work_title, item.unit_price),
    }
}

fn artist_email_body(order: &Order, artist_name: &str, items: &[&ItemLine]) -> String {
    let mut lines = vec![
        format!("Hello {artist_name},"),
        String::new(),
        format!("Order #{} includes the following of your works:", order.id),
        String::new(),
    ];
    for item in items {
        lines.push(format!("  {}", format_item(item)));
    }
    lines.push(String::new());
    lines.push("Please prepare the listed works for shipment.".to_string());
    lines.join("\n")
}

fn admin_summary_body(summary: &PaidOrderSummary, report: &NotificationReport) -> String {
    let order = &summary.order;
    let buyer = order.email.as_deref().unwrap_or("(no email)");
    let mut lines = vec![
        format!("Order #{} ({}) has been paid.", order.id, order.session_id),
        format!("Buyer: {buyer}"),
        format!("Total: {}", order.total),
        String::new(),
        "Items:".to_string(),
    ];
    for item in &summary.items {
        lines.push(format!("  {} [{}]", format_item(item), item.artist_name));
    }
    if !summary.missing.is_empty() {
        lines.push(String::new());
        lines.push("Unresolved line items (NOT included in the order):".to_string());
        for reason in &summary.missing {
            lines.push(format!("  - {reason}"));
        }
    }
    if !report.missing_contacts.is_empty() {
        lines.push(String::new());
        lines.push("Artists without a contact email (no sale notice sent):".to_string());
        for name in &report.missing_contacts {
            lines.push(format!("  - {name}"));
        }
    }
    if !report.failures.is_empty() {
        lines.push(String::new());
        lines.push("Failed notifications:".to_string());
        for failure in &report.failures {
            lines.push(format!("  - {failure}"));
        }
    }
    lines.join("\n")
}

fn shipped_email_body(order: &Order) -> String {
    let mut lines =
        vec![format!("Good news — your order #{} is on its way.", order.id)];
    if let Some(url) = order.tracking_url.as_deref().filter(|s| !s.is_empty()) {
        lines.push(String::new());
        lines.push(format!("Track your parcel: {url}"));
    }
    lines.join("\n")
}

//--------------------------------------    Event handlers     --------------------------------------------------------
/// Wire the mailer to the engine's order events.
///
/// Returns handlers with no hooks registered when SMTP is not configured, so the event system (and with it the
/// whole fan-out) degrades to a no-op.
pub fn create_mailer_event_handlers(config: &ServerConfig) -> Result<EventHandlers, MailerError> {
    let mut hooks = EventHooks::default();
    let Some(smtp) = config.smtp.as_ref() else {
        info!("📧️ No SMTP configuration present. Order notifications are disabled.");
        return Ok(EventHandlers::new(MAILER_EVENT_BUFFER_SIZE, hooks));
    };
    let mailer = SmtpMailer::new(smtp)?;
    let admin_email = config.admin_email.clone();
    let paid_mailer = mailer.clone();
    hooks.on_order_paid(move |ev| {
        let mailer = paid_mailer.clone();
        let admin_email = admin_email.clone();
        Box::pin(async move {
            let report = dispatch_order_notifications(&ev.summary, &mailer, admin_email.as_deref()).await;
            info!(
                "📧️ Order #{}: {} artist email(s) sent, {} missing contact(s), {} failure(s), admin summary {}.",
                ev.summary.order.id,
                report.artist_emails_sent,
                report.missing_contacts.len(),
                report.failures.len(),
                if report.admin_summary_sent { "sent" } else { "not sent" }
            );
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_order_shipped(move |ev| {
        let mailer = mailer.clone();
        Box::pin(async move {
            match dispatch_shipped_notification(&ev.order, &mailer).await {
                Ok(true) => info!("📧️ Shipped notification sent for order #{}", ev.order.id),
                Ok(false) => info!("📧️ Order #{} has no buyer email. No shipped notification sent.", ev.order.id),
                Err(e) => error!("📧️ Could not send the shipped notification for order #{}. {e}", ev.order.id),
            }
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    Ok(EventHandlers::new(MAILER_EVENT_BUFFER_SIZE, hooks))
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use gallery_common::Cents;
    use gallery_engine::db_types::{OrderStatus, SessionId, ShippingStatus};
    use mockall::mock;

    use super::*;

    mock! {
        pub Sender {}
        impl EmailSender for Sender {
            async fn send(&self, email: &EmailMessage) -> Result<(), MailerError>;
        }
    }

    fn paid_order() -> Order {
        Order {
            id: 7,
            session_id: SessionId::from("cs_fixture"),
            email: Some("buyer@example.com".to_string()),
            total: Cents::from(17000),
            status: OrderStatus::Paid,
            shipping_status: ShippingStatus::Pending,
            tracking_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(artist_id: i64, artist_name: &str, contact: Option<&str>, title: &str) -> ItemLine {
        ItemLine {
            work_id: artist_id * 10,
            work_title: title.to_string(),
            artist_id,
            artist_name: artist_name.to_string(),
            contact_email: contact.map(str::to_string),
            variant_label: None,
            quantity: 1,
            unit_price: Cents::from(4500),
        }
    }

    fn recording_sender(
        fail_for: &'static str,
    ) -> (MockSender, Arc<Mutex<Vec<EmailMessage>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut sender = MockSender::new();
        let recorded = sent.clone();
        sender.expect_send().returning(move |email| {
            recorded.lock().unwrap().push(email.clone());
            if email.to == fail_for {
                Err(MailerError::SendFailed("smtp 550".to_string()))
            } else {
                Ok(())
            }
        });
        (sender, sent)
    }

    #[tokio::test]
    async fn one_failing_artist_does_not_block_the_rest() {
        let (sender, sent) = recording_sender("mara@example.com");
        let summary = PaidOrderSummary {
            order: paid_order(),
            items: vec![
                item(1, "Mara Voss", Some("mara@example.com"), "Dune Study II"),
                item(2, "Ilya Brandt", Some("ilya@example.com"), "Red Interior"),
            ],
            missing: vec![],
        };
        let report = dispatch_order_notifications(&summary, &sender, Some("admin@example.com")).await;
        assert_eq!(report.artist_emails_sent, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.admin_summary_sent);
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 3, "both artists attempted, plus the admin summary");
        assert!(sent.iter().any(|e| e.to == "ilya@example.com"));
        let admin = sent.iter().find(|e| e.to == "admin@example.com").unwrap();
        assert!(admin.body.contains("Failed notifications"), "the admin summary reports the failed send");
        assert!(admin.body.contains("Mara Voss"));
    }

    #[tokio::test]
    async fn artists_without_contact_email_end_up_in_the_admin_summary() {
        let (sender, sent) = recording_sender("");
        let summary = PaidOrderSummary {
            order: paid_order(),
            items: vec![
                item(2, "Ilya Brandt", Some("ilya@example.com"), "Red Interior"),
                item(3, "Noa Lindqvist", None, "Untitled (Smoke)"),
            ],
            missing: vec!["variant #9 does not belong to work 'Red Interior' (#3)".to_string()],
        };
        let report = dispatch_order_notifications(&summary, &sender, Some("admin@example.com")).await;
        assert_eq!(report.artist_emails_sent, 1);
        assert_eq!(report.missing_contacts, vec!["Noa Lindqvist".to_string()]);
        assert!(report.failures.is_empty());
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|e| e.to != "noa@example.com"), "no send attempted without a contact");
        let admin = sent.iter().find(|e| e.to == "admin@example.com").unwrap();
        assert!(admin.body.contains("Artists without a contact email"));
        assert!(admin.body.contains("Noa Lindqvist"));
        assert!(admin.body.contains("Unresolved line items"), "reconciliation warnings reach the admin");
        assert!(admin.body.contains("variant #9"));
    }

    #[tokio::test]
    async fn no_admin_email_means_no_admin_summary() {
        let (sender, sent) = recording_sender("");
        let summary = PaidOrderSummary {
            order: paid_order(),
            items: vec![item(2, "Ilya Brandt", Some("ilya@example.com"), "Red Interior")],
            missing: vec![],
        };
        let report = dispatch_order_notifications(&summary, &sender, None).await;
        assert_eq!(report.artist_emails_sent, 1);
        assert!(!report.admin_summary_sent);
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn shipped_notice_goes_to_the_buyer_exactly_once() {
        let (sender, sent) = recording_sender("");
        let mut order = paid_order();
        order.shipping_status = ShippingStatus::Shipped;
        order.tracking_url = Some("https://tracking.example.com/p/123".to_string());
        let delivered = dispatch_shipped_notification(&order, &sender).await.unwrap();
        assert!(delivered);
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "buyer@example.com");
        assert!(sent[0].body.contains("https://tracking.example.com/p/123"));
    }

    #[tokio::test]
    async fn shipped_notice_is_skipped_without_a_buyer_email() {
        let mut sender = MockSender::new();
        sender.expect_send().times(0);
        let mut order = paid_order();
        order.email = None;
        let delivered = dispatch_shipped_notification(&order, &sender).await.unwrap();
        assert!(!delivered);
    }
}
