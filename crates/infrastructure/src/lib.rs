//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod channel_leave_event_publisher;
mod console_email_service;
mod in_memory_leave_repository;
mod in_memory_organization_repository;
mod postgres_leave_event_outbox;
mod postgres_leave_repository;
mod postgres_organization_repository;
mod smtp_email_service;

#[cfg(test)]
mod postgres_test_support;

pub use channel_leave_event_publisher::{
    ChannelLeaveEventPublisher, spawn_notification_dispatcher,
};
pub use console_email_service::ConsoleEmailService;
pub use in_memory_leave_repository::InMemoryLeaveRepository;
pub use in_memory_organization_repository::InMemoryOrganizationRepository;
pub use postgres_leave_event_outbox::{ClaimedLeaveEvent, PostgresLeaveEventOutbox};
pub use postgres_leave_repository::PostgresLeaveRepository;
pub use postgres_organization_repository::PostgresOrganizationRepository;
pub use smtp_email_service::{SmtpEmailConfig, SmtpEmailService};
