//! # cf-mail
//!
//! Askama-rendered transactional mail. Rendering is separated from delivery:
//! `TemplateMailer` builds an `OutgoingMail` and hands it to a `MailTransport`.

use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use cf_core::traits::Mailer;

#[derive(Template)]
#[template(path = "verification_code.html")]
pub struct VerificationCodeEmail<'a> {
    pub name: &'a str,
    pub code: &'a str,
}

#[derive(Template)]
#[template(path = "welcome.html")]
pub struct WelcomeEmail<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    /// Plain-text alternative
    pub text: String,
    pub html: String,
}

/// Where rendered mail goes.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, mail: OutgoingMail) -> anyhow::Result<()>;
}

/// Writes mail to the log instead of an SMTP relay.
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn deliver(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        tracing::info!(
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            text = %mail.text,
            "mail delivered"
        );
        tracing::debug!(html = %mail.html, "mail body");
        Ok(())
    }
}

pub struct TemplateMailer {
    from: String,
    transport: Arc<dyn MailTransport>,
}

impl TemplateMailer {
    pub fn new(from_address: &str, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            from: format!("\"Connectify\" <{from_address}>"),
            transport,
        }
    }

    async fn send(&self, to: &str, subject: &str, text: String, html: String) -> anyhow::Result<()> {
        self.transport
            .deliver(OutgoingMail {
                from: self.from.clone(),
                to: to.to_string(),
                subject: subject.to_string(),
                text,
                html,
            })
            .await
    }
}

#[async_trait]
impl Mailer for TemplateMailer {
    async fn send_confirmation_code(&self, name: &str, email: &str, code: &str) -> anyhow::Result<()> {
        let html = VerificationCodeEmail { name, code }.render()?;
        self.send(email, "Verification Code", code.to_string(), html).await
    }

    async fn send_welcome(&self, name: &str, email: &str) -> anyhow::Result<()> {
        let html = WelcomeEmail { name }.render()?;
        self.send(email, "Registration Successful!", "You have successfully become a member.".into(), html)
            .await
    }
}
