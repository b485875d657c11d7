//! Application services and ports for the leave approval workflow.

#![forbid(unsafe_code)]

mod approval_flow_service;
mod approver_service;
mod balance_service;
mod entitlement_service;
mod leave_ports;
mod leave_request_service;
mod notification_ports;
mod notification_service;
mod organization_ports;

#[cfg(test)]
mod test_support;

pub use approval_flow_service::{ApprovalFlowService, ApprovalOutcome};
pub use approver_service::ApproverService;
pub use balance_service::BalanceService;
pub use entitlement_service::EntitlementService;
pub use leave_ports::{LeaveRepository, LeaveRequestQuery, LeaveTransaction};
pub use leave_request_service::{
    CreateLeaveRequestInput, CreatedLeaveRequest, LeaveRequestDetails, LeaveRequestFilter,
    LeaveRequestService,
};
pub use notification_ports::{EmailService, LeaveEventPublisher};
pub use notification_service::NotificationService;
pub use organization_ports::{
    ApproverQuery, ApproverScope, GrantApproverInput, OrganizationRepository,
};
