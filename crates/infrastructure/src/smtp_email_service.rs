//! SMTP delivery for leave notifications using `lettre`.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use peoplehub_application::EmailService;
use peoplehub_core::{AppError, AppResult};
use tracing::debug;

/// SMTP relay settings.
#[derive(Clone)]
pub struct SmtpEmailConfig {
    /// Relay hostname.
    pub host: String,
    /// Relay port, usually 587 for STARTTLS.
    pub port: u16,
    /// Login name; anonymous relay when unset.
    pub username: Option<String>,
    /// Login password.
    pub password: Option<String>,
    /// Sender address, optionally with a display name.
    pub from_address: String,
}

/// E-mail service sending through an SMTP relay.
pub struct SmtpEmailService {
    sender: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailService {
    /// Builds the relay transport. Fails on an unusable sender or host.
    pub fn new(config: SmtpEmailConfig) -> AppResult<Self> {
        let sender = config.from_address.parse::<Mailbox>().map_err(|error| {
            AppError::Validation(format!(
                "invalid sender address '{}': {error}",
                config.from_address
            ))
        })?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|error| {
                AppError::Validation(format!(
                    "invalid SMTP relay '{}': {error}",
                    config.host
                ))
            })?
            .port(config.port);

        if let Some(username) = config.username {
            builder = builder.credentials(Credentials::new(
                username,
                config.password.unwrap_or_default(),
            ));
        }

        Ok(Self {
            sender,
            transport: builder.build(),
        })
    }
}

fn compose(
    sender: Mailbox,
    to: &str,
    subject: &str,
    text_body: &str,
    html_body: Option<&str>,
) -> AppResult<Message> {
    let recipient = to.parse::<Mailbox>().map_err(|error| {
        AppError::Validation(format!("invalid recipient address '{to}': {error}"))
    })?;

    let builder = Message::builder().from(sender).to(recipient).subject(subject);
    let message = match html_body {
        Some(html_body) => builder.multipart(MultiPart::alternative_plain_html(
            text_body.to_owned(),
            html_body.to_owned(),
        )),
        None => builder.singlepart(SinglePart::plain(text_body.to_owned())),
    };

    message.map_err(|error| AppError::Internal(format!("failed to build email: {error}")))
}

#[async_trait]
impl EmailService for SmtpEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()> {
        let message = compose(self.sender.clone(), to, subject, text_body, html_body)?;

        let response = self.transport.send(message).await.map_err(|error| {
            AppError::Internal(format!("failed to send email to '{to}': {error}"))
        })?;
        debug!(to, code = %response.code(), "smtp relay accepted email");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use lettre::message::Mailbox;
    use peoplehub_core::AppError;

    use super::{SmtpEmailConfig, SmtpEmailService, compose};

    fn sender() -> Mailbox {
        match "PeopleHub <hr@example.com>".parse() {
            Ok(mailbox) => mailbox,
            Err(error) => panic!("sender should parse: {error}"),
        }
    }

    #[test]
    fn plain_message_carries_headers_and_body() {
        let message = compose(sender(), "ada@example.com", "Leave approved", "See you soon", None);
        let Ok(message) = message else {
            panic!("message should build");
        };
        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();

        assert!(raw.contains("To: ada@example.com"));
        assert!(raw.contains("Subject: Leave approved"));
        assert!(raw.contains("See you soon"));
        assert!(!raw.contains("multipart/alternative"));
    }

    #[test]
    fn html_body_becomes_an_alternative_part() {
        let message = compose(
            sender(),
            "ada@example.com",
            "Leave approved",
            "See you soon",
            Some("<p>See you soon</p>"),
        );
        let Ok(message) = message else {
            panic!("message should build");
        };
        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();

        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("<p>See you soon</p>"));
    }

    #[test]
    fn bad_recipient_is_validation_error() {
        assert!(matches!(
            compose(sender(), "not an address", "Subject", "Body", None),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn bad_sender_is_rejected_at_construction() {
        let service = SmtpEmailService::new(SmtpEmailConfig {
            host: "smtp.example.com".to_owned(),
            port: 587,
            username: None,
            password: None,
            from_address: "nobody".to_owned(),
        });

        assert!(matches!(service, Err(AppError::Validation(_))));
    }
}
