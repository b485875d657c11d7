use std::sync::Arc;

use peoplehub_core::{AppError, AppResult, UserId};
use peoplehub_domain::{Employee, LeaveEvent};
use tracing::info;

use crate::{EmailService, OrganizationRepository};

/// Turns leave events into e-mails.
#[derive(Clone)]
pub struct NotificationService {
    organization: Arc<dyn OrganizationRepository>,
    email_service: Arc<dyn EmailService>,
}

impl NotificationService {
    /// Creates a notification service.
    #[must_use]
    pub fn new(
        organization: Arc<dyn OrganizationRepository>,
        email_service: Arc<dyn EmailService>,
    ) -> Self {
        Self {
            organization,
            email_service,
        }
    }

    /// Sends the e-mail for one event to its recipient.
    pub async fn deliver(&self, event: &LeaveEvent) -> AppResult<()> {
        let leave = event.leave();
        let recipient = self.employee(event.recipient_id()).await?;
        let requester = self.employee(leave.requester_id).await?;
        let requester_name = requester.full_name();
        let period = format!(
            "{} to {} ({} business days)",
            leave.start_date, leave.end_date, leave.duration_days
        );

        let (subject, text_body) = match event {
            LeaveEvent::LeaveRequested { phase, .. }
            | LeaveEvent::NextPhaseActivated { phase, .. } => (
                format!("{requester_name} requested {}", leave.leave_type_name),
                format!(
                    "{requester_name} has requested {} for {period}.\n\n\
                     Reason: {}\n\n\
                     Your decision is needed for approval phase {phase}.",
                    leave.leave_type_name, leave.reason
                ),
            ),
            LeaveEvent::LeaveApproved { .. } => (
                format!("Your {} request was approved", leave.leave_type_name),
                format!(
                    "Your {} request for {period} has been approved by every approver.",
                    leave.leave_type_name
                ),
            ),
            LeaveEvent::LeaveRejected { reason, .. } => (
                format!("Your {} request was rejected", leave.leave_type_name),
                format!(
                    "Your {} request for {period} has been rejected.\n\n\
                     Reason: {}",
                    leave.leave_type_name,
                    reason.as_deref().unwrap_or("no reason given")
                ),
            ),
        };

        self.email_service
            .send_email(recipient.email(), &subject, &text_body, None)
            .await?;

        info!(
            leave_request_id = %leave.leave_request_id,
            event = event.kind().as_str(),
            recipient_id = %recipient.id(),
            "leave notification sent"
        );

        Ok(())
    }

    async fn employee(&self, user_id: UserId) -> AppResult<Employee> {
        self.organization
            .find_employee(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("employee '{user_id}' does not exist")))
    }
}
