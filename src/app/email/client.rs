use anyhow::Context;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sesv2::{
    types::{Body, Content, Destination, EmailContent, Message},
    Client,
};

/// Outbound email delivery.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct EmailClient {
    ses_client: Client,
    verified_email: String,

    /// Skip SES entirely, useful for local development
    should_mock: bool,
}

impl EmailClient {
    /// Build an email client
    ///
    /// It should only be called once, and shared
    pub fn new(sdk_config: &SdkConfig, verified_email: String, should_mock: bool) -> Self {
        let ses_client = Client::new(sdk_config);

        EmailClient {
            ses_client,
            verified_email,
            should_mock,
        }
    }

    fn build_content(subject: &str, html_body: &str) -> anyhow::Result<EmailContent> {
        let subject = Content::builder()
            .data(subject)
            .build()
            .context("failed to build email subject")?;
        let html = Content::builder()
            .data(html_body)
            .build()
            .context("failed to build email body")?;

        let message = Message::builder()
            .subject(subject)
            .body(Body::builder().html(html).build())
            .build();

        Ok(EmailContent::builder().simple(message).build())
    }
}

#[async_trait]
impl EmailTransport for EmailClient {
    #[tracing::instrument(name = "Sending email", skip_all, fields(email = ?to))]
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        if self.should_mock {
            tracing::info!("email mocked, not sent");
            return Ok(());
        }

        let content = Self::build_content(subject, html_body)?;

        match self
            .ses_client
            .send_email()
            .from_email_address(&self.verified_email)
            .destination(Destination::builder().to_addresses(to).build())
            .content(content)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => Err(anyhow::anyhow!("Error sending email to {}: {}", to, e)),
        }
    }
}
