use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::config::{Config, SmtpConfig};
use crate::models::{ContactSubmission, InsuranceType, Quote};

/// Transactional email sender. Every send is best-effort: failures are
/// logged and never surfaced to the request that triggered them, so a broken
/// SMTP relay cannot block a quote or contact submission from being saved.
#[derive(Clone)]
pub struct EmailService {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    smtp: Option<SmtpConfig>,
}

impl EmailService {
    pub fn new(config: &Config) -> Self {
        let Some(smtp) = config.smtp.clone() else {
            tracing::warn!("SMTP not configured, outgoing email disabled");
            return Self {
                transport: None,
                smtp: None,
            };
        };

        let transport = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host) {
            Ok(builder) => Some(
                builder
                    .port(smtp.port)
                    .credentials(Credentials::new(
                        smtp.username.clone(),
                        smtp.password.clone(),
                    ))
                    .build(),
            ),
            Err(e) => {
                tracing::error!("failed to build SMTP transport: {e}");
                None
            }
        };

        Self {
            transport,
            smtp: Some(smtp),
        }
    }

    pub async fn send_quote_confirmation(&self, quote: &Quote) {
        let coverage_type = match quote.insurance_type {
            InsuranceType::Solo => "Individual Coverage",
            InsuranceType::Joint => "Joint Coverage",
        };
        let partner_line = match (&quote.partner_first_name, &quote.partner_last_name) {
            (Some(first), Some(last)) => format!("\nPartner: {first} {last}"),
            _ => String::new(),
        };

        let body = format!(
            "Thank You for Your Quote Request\n\n\
             Dear {first} {last},\n\n\
             We have received your life insurance quote request. Our team will review \
             your information and contact you within 1-2 business days with quotes \
             tailored to your needs.\n\n\
             QUOTE SUMMARY\n\
             Reference Number: #{id}\n\
             Coverage Type: {coverage_type}\n\
             Coverage Amount: \u{a3}{amount}\n\
             Coverage Period: {period} years{partner_line}\n\n\
             This is an automated confirmation email. Please do not reply.",
            first = quote.first_name,
            last = quote.last_name,
            id = quote.id,
            amount = quote.coverage_amount,
            period = quote.coverage_period,
        );

        self.send(&quote.email, "Quote Request Received", body).await;
    }

    pub async fn send_contact_notification(&self, submission: &ContactSubmission) {
        let Some(smtp) = &self.smtp else { return };
        let admin_address = smtp.admin_address.clone();

        let body = format!(
            "New contact form submission\n\n\
             From: {name}\n\
             Email: {email}\n\
             Subject: {subject}\n\n\
             Message:\n{message}",
            name = submission.name,
            email = submission.email,
            subject = submission.subject,
            message = submission.message,
        );

        self.send(
            &admin_address,
            &format!("Contact Form: {}", submission.subject),
            body,
        )
        .await;
    }

    pub async fn send_contact_auto_reply(&self, submission: &ContactSubmission) {
        let body = format!(
            "Dear {name},\n\n\
             We have received your message and will get back to you within 24 hours \
             during business days.\n\n\
             Your message:\n\
             Subject: {subject}\n\
             {message}\n\n\
             Best regards,\n\
             The LifeQuote Team",
            name = submission.name,
            subject = submission.subject,
            message = submission.message,
        );

        self.send(&submission.email, "Thank you for contacting us", body)
            .await;
    }

    pub async fn send_password_reset(&self, email: &str, first_name: &str, reset_url: &str) {
        let body = format!(
            "Password Reset Request\n\n\
             Hello {first_name},\n\n\
             We received a request to reset the password for your backoffice account.\n\n\
             To reset your password, open the link below:\n\
             {reset_url}\n\n\
             SECURITY NOTICE: this link expires in 1 hour. If you didn't request a \
             password reset you can safely ignore this email; your password will \
             remain unchanged.",
        );

        self.send(email, "Password Reset Request", body).await;
    }

    async fn send(&self, to: &str, subject: &str, body: String) {
        let (Some(transport), Some(smtp)) = (&self.transport, &self.smtp) else {
            tracing::debug!(to, subject, "email not configured, skipping send");
            return;
        };

        let from: Mailbox = match smtp.from_address.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                tracing::error!("invalid SMTP from address {:?}: {e}", smtp.from_address);
                return;
            }
        };
        let to_mailbox: Mailbox = match to.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                tracing::warn!("invalid recipient address {to:?}: {e}");
                return;
            }
        };

        let message = match Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .body(body)
        {
            Ok(message) => message,
            Err(e) => {
                tracing::error!("failed to build email: {e}");
                return;
            }
        };

        match transport.send(message).await {
            Ok(_) => tracing::info!(to, subject, "email sent"),
            Err(e) => tracing::warn!(to, subject, "email send failed: {e}"),
        }
    }
}
