use async_trait::async_trait;
use chrono::{DateTime, Local};
use fintrack_core::common::time::{RealTimeProvider, TimeProvider};
use fintrack_core::notify::entity::{BodyFormat, DeliveryReport, Envelope};
use fintrack_core::notify::error::NotifyError;
use fintrack_core::notify::port::Notifier;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

/// Implicit TLS submission port.
const SMTPS_PORT: u16 = 465;

/// # Summary
/// A notifier that delivers report envelopes over SMTP, one message per recipient.
///
/// # Invariants
/// - The `AsyncSmtpTransport` is built once and reused for every recipient.
/// - A failure for one recipient never prevents delivery to the others.
pub struct EmailNotifier {
    /// The asynchronous SMTP transport.
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    /// The sender mailbox, validated at construction.
    from: Mailbox,
    /// Source of the footer timestamp in HTML bodies.
    clock: Arc<dyn TimeProvider>,
}

impl EmailNotifier {
    /// # Summary
    /// Creates a new `EmailNotifier`.
    ///
    /// # Logic
    /// 1. Port 465 uses implicit TLS, any other port uses STARTTLS.
    /// 2. Authenticates with the given credentials.
    /// 3. Parses the sender address up front so a bad config fails at startup.
    ///
    /// # Arguments
    /// * `host` - The SMTP server host (e.g., "smtp.gmail.com").
    /// * `port` - The submission port, usually 587.
    /// * `user` - The SMTP username.
    /// * `pass` - The SMTP password or app-specific password.
    /// * `from` - The sender's email address.
    pub fn new(host: &str, port: u16, user: &str, pass: &str, from: &str) -> Result<Self, NotifyError> {
        let creds = Credentials::new(user.to_string(), pass.to_string());

        let builder = if port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| NotifyError::Config(format!("Invalid SMTP host: {}", e)))?;

        let mailer = builder.port(port).credentials(creds).build();

        let from = from
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Config(format!("Invalid from address: {}", e)))?;

        Ok(Self {
            mailer,
            from,
            clock: Arc::new(RealTimeProvider),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    /// # Summary
    /// Builds the message for a single recipient.
    ///
    /// # Logic
    /// 1. HTML bodies are wrapped in the report template, plain bodies are sent as-is.
    /// 2. The attachment, if any, is added as a second MIME part.
    fn build_message(&self, to: &str, envelope: &Envelope) -> Result<Message, NotifyError> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Config(format!("Invalid recipient '{}': {}", to, e)))?;

        let body = match envelope.format {
            BodyFormat::Html => SinglePart::html(render_html(
                &envelope.body,
                envelope.record_count,
                self.clock.now(),
            )),
            BodyFormat::Plain => SinglePart::plain(envelope.body.clone()),
        };

        let mut parts = MultiPart::mixed().singlepart(body);
        if let Some(file) = &envelope.attachment {
            let content_type = ContentType::parse(&file.content_type)
                .map_err(|e| NotifyError::Message(format!("Bad content type: {}", e)))?;
            parts = parts.singlepart(
                Attachment::new(file.filename.clone()).body(file.bytes.clone(), content_type),
            );
        }

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(envelope.subject.as_str())
            .multipart(parts)
            .map_err(|e| NotifyError::Message(format!("Failed to build email: {}", e)))
    }
}

/// # Summary
/// Wraps a report message in the HTML email template.
///
/// # Arguments
/// * `message` - Pre-formatted HTML fragment with the report details.
/// * `record_count` - Number of records in the attached workbook.
/// * `now` - Timestamp shown in the footer.
pub fn render_html(message: &str, record_count: usize, now: DateTime<Local>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background-color: #4CAF50; color: white; padding: 20px; text-align: center; border-radius: 5px; }}
        .content {{ padding: 20px; background-color: #f9f9f9; border-radius: 5px; margin: 20px 0; }}
        .footer {{ text-align: center; font-size: 12px; color: #666; margin-top: 20px; }}
        .highlight {{ background-color: #ffeb3b; padding: 2px 4px; border-radius: 3px; }}
        .warning {{ background-color: #fff3cd; border: 1px solid #ffeaa7; color: #856404; padding: 10px; border-radius: 5px; margin: 10px 0; }}
        .info {{ background-color: #d1ecf1; border: 1px solid #bee5eb; color: #0c5460; padding: 10px; border-radius: 5px; margin: 10px 0; }}
    </style>
</head>
<body>
    <div class="header">
        <h1>FinTrack Financial Report</h1>
    </div>
    <div class="content">
        <p>Hello,</p>
        <div>{message}</div>
        <p>The attached workbook contains:</p>
        <ul>
            <li><strong>Sheet "Financial Report" or "Weekly Data":</strong> one row per symbol and date</li>
            <li><strong>Sheet "Summary":</strong> totals by type and data source</li>
        </ul>
        <p>Each row includes open, high, low, close and volume.</p>
        <p class="highlight">Records processed: {record_count}</p>
    </div>
    <div class="footer">
        <p>Generated automatically by FinTrack</p>
        <p>Date: {timestamp}</p>
    </div>
</body>
</html>
"#,
        timestamp = now.format("%Y-%m-%d %H:%M:%S"),
    )
}

#[async_trait]
impl Notifier for EmailNotifier {
    /// # Summary
    /// Sends the envelope to every recipient individually.
    ///
    /// # Logic
    /// 1. Builds and sends one message per recipient.
    /// 2. Collects per-recipient successes and errors.
    /// 3. Succeeds if at least one recipient received the message.
    ///
    /// # Returns
    /// * `Ok(DeliveryReport)` listing delivered and failed recipients.
    /// * `Err(NotifyError::Delivery)` with every error if nobody received it.
    async fn deliver(&self, envelope: &Envelope) -> Result<DeliveryReport, NotifyError> {
        if envelope.recipients.is_empty() {
            return Err(NotifyError::Config("No recipients".to_string()));
        }

        let mut report = DeliveryReport::default();
        for recipient in &envelope.recipients {
            let outcome = match self.build_message(recipient, envelope) {
                Ok(message) => self
                    .mailer
                    .send(message)
                    .await
                    .map(|_| ())
                    .map_err(|e| NotifyError::Network(format!("SMTP error: {}", e))),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {
                    info!("Email '{}' sent to {}", envelope.subject, recipient);
                    report.delivered.push(recipient.clone());
                }
                Err(e) => {
                    warn!("Email '{}' to {} failed: {}", envelope.subject, recipient, e);
                    report.failed.push((recipient.clone(), e.to_string()));
                }
            }
        }

        if report.delivered.is_empty() {
            let errors: Vec<String> = report
                .failed
                .iter()
                .map(|(to, err)| format!("{}: {}", to, err))
                .collect();
            return Err(NotifyError::Delivery(errors.join("; ")));
        }

        if report.is_partial() {
            warn!(
                "Email delivered to {} of {} recipients",
                report.delivered.len(),
                envelope.recipients.len()
            );
        }
        Ok(report)
    }
}
