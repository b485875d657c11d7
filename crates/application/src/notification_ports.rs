use async_trait::async_trait;
use peoplehub_core::AppResult;
use peoplehub_domain::LeaveEvent;

/// Port publishing leave events to the notification side.
///
/// Called after the owning transaction commits. Implementations must not
/// block on delivery.
#[async_trait]
pub trait LeaveEventPublisher: Send + Sync {
    /// Publishes one event.
    async fn publish(&self, event: LeaveEvent) -> AppResult<()>;
}

/// Port for outbound e-mail delivery.
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Sends a plain-text or HTML email.
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()>;
}
