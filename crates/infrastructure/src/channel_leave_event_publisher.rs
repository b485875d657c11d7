use async_trait::async_trait;
use peoplehub_application::{LeaveEventPublisher, NotificationService};
use peoplehub_core::{AppError, AppResult};
use peoplehub_domain::LeaveEvent;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// In-process publisher handing events to a bounded tokio channel.
///
/// Publishing never waits: a full or closed channel is reported as an error,
/// which the approval flow logs and drops.
#[derive(Clone)]
pub struct ChannelLeaveEventPublisher {
    sender: mpsc::Sender<LeaveEvent>,
}

impl ChannelLeaveEventPublisher {
    /// Creates a publisher and the receiving end for a dispatcher.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<LeaveEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl LeaveEventPublisher for ChannelLeaveEventPublisher {
    async fn publish(&self, event: LeaveEvent) -> AppResult<()> {
        self.sender.try_send(event).map_err(|error| match error {
            TrySendError::Full(event) => AppError::Internal(format!(
                "leave notification queue is full, dropped {} for leave request '{}'",
                event.kind().as_str(),
                event.leave().leave_request_id
            )),
            TrySendError::Closed(event) => AppError::Internal(format!(
                "leave notification dispatcher stopped, dropped {} for leave request '{}'",
                event.kind().as_str(),
                event.leave().leave_request_id
            )),
        })
    }
}

/// Spawns a task delivering received events until every publisher is dropped.
pub fn spawn_notification_dispatcher(
    mut receiver: mpsc::Receiver<LeaveEvent>,
    notifications: NotificationService,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            if let Err(error) = notifications.deliver(&event).await {
                warn!(
                    leave_request_id = %event.leave().leave_request_id,
                    event = event.kind().as_str(),
                    error = %error,
                    "leave notification delivery failed"
                );
            }
        }

        debug!("leave notification dispatcher stopped");
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use peoplehub_application::{
        ApprovalFlowService, ApproverService, BalanceService, CreateLeaveRequestInput,
        EmailService, EntitlementService, LeaveEventPublisher, LeaveRepository,
        LeaveRequestService, NotificationService, OrganizationRepository,
    };
    use peoplehub_core::{Actor, AppError, AppResult, UserId};
    use peoplehub_domain::{
        Approver, ApproverId, ApproverRole, Department, DepartmentId, Employee, Entitlement,
        EntitlementId, EntitlementKind, LeaveEvent, LeaveEventLeave, LeaveRequestId, LeaveStatus,
        LevelEntitlement, LevelId,
    };
    use tokio::sync::Mutex;

    use super::{ChannelLeaveEventPublisher, spawn_notification_dispatcher};
    use crate::{InMemoryLeaveRepository, InMemoryOrganizationRepository};

    #[derive(Default)]
    struct CollectingEmailService {
        subjects: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl EmailService for CollectingEmailService {
        async fn send_email(
            &self,
            to: &str,
            subject: &str,
            _text_body: &str,
            _html_body: Option<&str>,
        ) -> AppResult<()> {
            self.subjects
                .lock()
                .await
                .push((to.to_owned(), subject.to_owned()));
            Ok(())
        }
    }

    fn rejected(requester_id: UserId) -> LeaveEvent {
        let Some(start_date) = NaiveDate::from_ymd_opt(2026, 3, 2) else {
            panic!("fixture date should be valid");
        };
        LeaveEvent::LeaveRejected {
            leave: LeaveEventLeave {
                leave_request_id: LeaveRequestId::new(),
                requester_id,
                leave_type_id: EntitlementId::new(),
                leave_type_name: "Sick Leave".to_owned(),
                start_date,
                end_date: start_date,
                duration_days: 1,
                reason: "flu".to_owned(),
            },
            rejected_by: UserId::new(),
            reason: Some("short staffed".to_owned()),
        }
    }

    #[tokio::test]
    async fn dispatcher_delivers_published_events_and_stops_with_publisher() {
        let organization = Arc::new(InMemoryOrganizationRepository::new());
        let Ok(requester) = Employee::new(UserId::new(), "Mia", "Okafor", "mia@example.com") else {
            panic!("employee should build");
        };
        organization.save_employee(requester.clone()).await;

        let emails = Arc::new(CollectingEmailService::default());
        let notifications = NotificationService::new(organization, emails.clone());
        let (publisher, receiver) = ChannelLeaveEventPublisher::new(8);
        let dispatcher = spawn_notification_dispatcher(receiver, notifications);

        assert!(publisher.publish(rejected(requester.id())).await.is_ok());
        drop(publisher);
        assert!(dispatcher.await.is_ok());

        let subjects = emails.subjects.lock().await.clone();
        assert_eq!(
            subjects,
            vec![(
                "mia@example.com".to_owned(),
                "Your Sick Leave request was rejected".to_owned()
            )]
        );
    }

    #[tokio::test]
    async fn full_queue_is_reported_without_blocking() {
        let (publisher, _receiver) = ChannelLeaveEventPublisher::new(1);

        assert!(publisher.publish(rejected(UserId::new())).await.is_ok());
        assert!(matches!(
            publisher.publish(rejected(UserId::new())).await,
            Err(AppError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn closed_dispatcher_is_reported() {
        let (publisher, receiver) = ChannelLeaveEventPublisher::new(4);
        drop(receiver);

        assert!(matches!(
            publisher.publish(rejected(UserId::new())).await,
            Err(AppError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn leave_flow_runs_end_to_end_over_in_memory_adapters() {
        let organization = Arc::new(InMemoryOrganizationRepository::new());
        let level_id = LevelId::new();
        let department_id = DepartmentId::new();
        let Ok(annual) = Entitlement::new(
            EntitlementId::new(),
            "Annual Leave",
            "days",
            EntitlementKind::Leave,
        ) else {
            panic!("entitlement should build");
        };
        let annual_id = annual.id();
        let Ok(binding) = LevelEntitlement::new(level_id, annual, 10) else {
            panic!("level entitlement should build");
        };
        let (Ok(manager), Ok(requester), Ok(department)) = (
            Employee::new(UserId::new(), "Ravi", "Menon", "ravi@example.com"),
            Employee::new(UserId::new(), "Mia", "Okafor", "mia@example.com"),
            Department::new(department_id, "Audit"),
        ) else {
            panic!("organization should build");
        };
        let manager = manager.with_department(department_id).with_level(level_id);
        let requester = requester.with_department(department_id).with_level(level_id);
        organization.save_level_entitlement(binding).await;
        organization.save_department(department.with_head(manager.id())).await;
        organization.save_employee(manager.clone()).await;
        organization.save_employee(requester.clone()).await;
        let grant = Approver::new(
            ApproverId::new(),
            manager.id(),
            ApproverRole::DeptManager,
            Some(department_id),
        );
        assert!(organization.save_approver(grant).await.is_ok());

        let emails = Arc::new(CollectingEmailService::default());
        let (publisher, receiver) = ChannelLeaveEventPublisher::new(8);
        let dispatcher = spawn_notification_dispatcher(
            receiver,
            NotificationService::new(organization.clone(), emails.clone()),
        );

        let leave_repository = Arc::new(InMemoryLeaveRepository::new());
        let entitlements = EntitlementService::new(organization.clone());
        let approvers = ApproverService::new(organization.clone());
        let balances = BalanceService::new(entitlements.clone(), leave_repository.clone());
        let approval_flow = ApprovalFlowService::new(
            approvers.clone(),
            entitlements.clone(),
            leave_repository.clone(),
            Arc::new(publisher),
        );
        let leave_requests = LeaveRequestService::new(
            entitlements,
            balances,
            approvers,
            approval_flow.clone(),
            leave_repository.clone(),
        );

        let (Some(start_date), Some(end_date)) = (
            NaiveDate::from_ymd_opt(2030, 3, 4),
            NaiveDate::from_ymd_opt(2030, 3, 5),
        ) else {
            panic!("fixture dates should be valid");
        };
        let created = leave_requests
            .create_leave_request(
                &Actor::new(requester.id(), "Mia Okafor", Vec::new()),
                CreateLeaveRequestInput {
                    leave_type_id: annual_id,
                    doa_id: None,
                    reason: "Family visit".to_owned(),
                    start_date,
                    end_date,
                    uploads: Vec::new(),
                },
            )
            .await;
        let created = match created {
            Ok(created) => created,
            Err(error) => panic!("leave request should be created: {error}"),
        };
        assert_eq!(created.approval.approver_id(), manager.id());

        let outcome = approval_flow
            .approve_leave_request(
                &Actor::new(manager.id(), "Ravi Menon", Vec::new()),
                created.approval.id(),
                Some("enjoy".to_owned()),
            )
            .await;
        assert!(outcome.is_ok());

        let stored = leave_repository
            .find_leave_request(created.leave_request.id())
            .await;
        assert!(matches!(stored, Ok(Some(ref request)) if request.status() == LeaveStatus::Approved));

        drop(leave_requests);
        drop(approval_flow);
        assert!(dispatcher.await.is_ok());

        let subjects = emails.subjects.lock().await.clone();
        assert_eq!(
            subjects,
            vec![
                (
                    "ravi@example.com".to_owned(),
                    "Mia Okafor requested Annual Leave".to_owned()
                ),
                (
                    "mia@example.com".to_owned(),
                    "Your Annual Leave request was approved".to_owned()
                ),
            ]
        );
    }
}
