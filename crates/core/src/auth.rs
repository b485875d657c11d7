use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Already-authenticated caller handed to every core operation.
///
/// Role names are carried as plain strings so that the authentication layer
/// stays free of domain types; services interpret them when they need to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    user_id: UserId,
    display_name: String,
    roles: BTreeSet<String>,
}

impl Actor {
    /// Creates an actor from authentication data.
    #[must_use]
    pub fn new(
        user_id: UserId,
        display_name: impl Into<String>,
        roles: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            roles: roles
                .into_iter()
                .map(|role| role.trim().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Returns the authenticated user identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns true when the token carried the given role name.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role.trim().to_ascii_lowercase().as_str())
    }
}
