use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .context("smtp relay config")?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        let from = config.from.parse::<Mailbox>().context("parse SMTP_FROM")?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse::<Mailbox>().context("parse recipient")?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .context("build message")?;
        self.transport.send(message).await.context("smtp send")?;
        Ok(())
    }
}

/// Body of the password-recovery email: greeting, the code itself, and the
/// validity window. The plaintext OTP appears nowhere else.
pub fn reset_otp_email(full_name: &str, otp: &str) -> (String, String) {
    let subject = "Your password recovery code".to_string();
    let html = format!(
        "<p>Hello {full_name},</p>\
         <p>Use the following code to reset your password. It is valid for 10 minutes:</p>\
         <h2 style=\"background-color:#f0fdf4;color:#166534;padding:10px 20px;\
text-align:center;border-radius:5px;letter-spacing:2px;\">{otp}</h2>\
         <p>If you did not request a password reset, you can ignore this email.</p>"
    );
    (subject, html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_email_carries_the_code_and_name() {
        let (subject, html) = reset_otp_email("Ada Lovelace", "123456");
        assert!(subject.contains("recovery"));
        assert!(html.contains("123456"));
        assert!(html.contains("Ada Lovelace"));
        assert!(html.contains("10 minutes"));
    }
}
