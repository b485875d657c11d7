use peoplehub_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::LevelId;

uuid_identifier!(
    /// Unique identifier for an entitlement. Leave requests use it as their leave type.
    EntitlementId
);

/// Entitlement discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementKind {
    /// Time-off allowance.
    Leave,
    /// Reimbursement allowance.
    Claims,
}

impl EntitlementKind {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leave => "leave",
            Self::Claims => "claims",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "leave" => Ok(Self::Leave),
            "claims" => Ok(Self::Claims),
            _ => Err(AppError::Validation(format!(
                "unknown entitlement kind '{value}'"
            ))),
        }
    }
}

/// Named allowance resource such as "Annual Leave".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    id: EntitlementId,
    name: NonEmptyString,
    unit: NonEmptyString,
    kind: EntitlementKind,
}

impl Entitlement {
    /// Creates an entitlement.
    pub fn new(
        id: EntitlementId,
        name: impl Into<String>,
        unit: impl Into<String>,
        kind: EntitlementKind,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            unit: NonEmptyString::new(unit)?,
            kind,
        })
    }

    /// Returns the entitlement identifier.
    #[must_use]
    pub fn id(&self) -> EntitlementId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the allowance unit.
    #[must_use]
    pub fn unit(&self) -> &str {
        self.unit.as_str()
    }

    /// Returns the entitlement kind.
    #[must_use]
    pub fn kind(&self) -> EntitlementKind {
        self.kind
    }

    /// Leave entitlements, plus anything counted as a plain amount.
    #[must_use]
    pub fn is_leave_allowance(&self) -> bool {
        self.kind == EntitlementKind::Leave || self.unit.as_str().eq_ignore_ascii_case("amount")
    }
}

/// Binds an entitlement to a level with a numeric allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelEntitlement {
    level_id: LevelId,
    entitlement: Entitlement,
    value: i64,
}

impl LevelEntitlement {
    /// Creates a level binding; allowances are never negative.
    pub fn new(level_id: LevelId, entitlement: Entitlement, value: i64) -> AppResult<Self> {
        if value < 0 {
            return Err(AppError::Validation(format!(
                "allowance for '{}' must not be negative",
                entitlement.name()
            )));
        }

        Ok(Self {
            level_id,
            entitlement,
            value,
        })
    }

    /// Returns the owning level.
    #[must_use]
    pub fn level_id(&self) -> LevelId {
        self.level_id
    }

    /// Returns the bound entitlement.
    #[must_use]
    pub fn entitlement(&self) -> &Entitlement {
        &self.entitlement
    }

    /// Returns the allowance value.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Flattens the binding into an allowance record.
    #[must_use]
    pub fn to_allowance(&self) -> LeaveAllowance {
        LeaveAllowance {
            entitlement_id: self.entitlement.id(),
            name: self.entitlement.name().to_owned(),
            value: self.value,
            unit: self.entitlement.unit().to_owned(),
        }
    }
}

/// Flattened allowance returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveAllowance {
    /// Entitlement (leave type) identifier.
    pub entitlement_id: EntitlementId,
    /// Entitlement name.
    pub name: String,
    /// Allowance granted by the level.
    pub value: i64,
    /// Allowance unit.
    pub unit: String,
}
