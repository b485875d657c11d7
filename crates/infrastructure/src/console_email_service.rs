use async_trait::async_trait;
use peoplehub_application::EmailService;
use peoplehub_core::AppResult;
use tracing::info;

/// E-mail service that writes messages to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleEmailService;

impl ConsoleEmailService {
    /// Creates a console e-mail service.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailService for ConsoleEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()> {
        info!(
            to,
            subject,
            has_html = html_body.is_some(),
            "email (console)\n{text_body}"
        );

        Ok(())
    }
}
