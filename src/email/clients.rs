use anyhow::Result;
use async_trait::async_trait;
use sendgrid::v3::{Content, Email, Personalization, Sender};
use tracing::info;

/// A transactional email, ready to hand to a client. The body is HTML.
#[derive(Clone, Debug)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait EmailClient: Send + Sync {
    async fn send(&self, message: &Message) -> Result<()>;
}

/// An email "client" that prints messages to stdout. Used for local
/// development when no SendGrid key is configured.
pub struct ConsoleMailer;

#[async_trait]
impl EmailClient for ConsoleMailer {
    async fn send(&self, message: &Message) -> Result<()> {
        println!("From: {}", message.from);
        println!("To: {}", message.to);
        println!("Subject: {}", message.subject);
        println!("{}", "-".repeat(80));
        println!("{}\n", message.html);

        Ok(())
    }
}

pub struct SendgridMailer {
    sender: Sender,
}

impl SendgridMailer {
    pub fn new(api_key: String) -> Self {
        Self {
            sender: Sender::new(api_key),
        }
    }
}

#[async_trait]
impl EmailClient for SendgridMailer {
    async fn send(&self, message: &Message) -> Result<()> {
        let personalization = Personalization::new(Email::new(message.to.to_owned()));

        let sendable_message = sendgrid::v3::Message::new(Email::new(message.from.to_owned()))
            .set_subject(&message.subject)
            .add_content(
                Content::new()
                    .set_content_type("text/html")
                    .set_value(message.html.to_owned()),
            )
            .add_personalization(personalization);

        self.sender.send(&sendable_message).await?;
        info!(subject = %message.subject, "Sent email via SendGrid.");

        Ok(())
    }
}
