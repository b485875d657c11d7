//! Domain entities and invariants.

#![forbid(unsafe_code)]

#[macro_use]
mod identifier;

mod approver;
mod balance;
mod calendar;
mod entitlement;
mod event;
mod leave;
mod organization;

pub use approver::{Approver, ApproverId, ApproverRole};
pub use balance::{LeaveBalance, LeaveUsage, leave_year_end, leave_year_start};
pub use calendar::{LeaveDateRange, business_days};
pub use entitlement::{
    Entitlement, EntitlementId, EntitlementKind, LeaveAllowance, LevelEntitlement,
};
pub use event::{LeaveEvent, LeaveEventKind, LeaveEventLeave};
pub use leave::{
    Approval, ApprovalChain, ApprovalId, ApprovalStatus, ChainSlot, LeaveRequest,
    LeaveRequestId, LeaveStatus, NewLeaveRequest,
};
pub use organization::{Department, DepartmentId, Employee, Level, LevelId, UserRole};
pub use peoplehub_core::UserId;
