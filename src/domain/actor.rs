use super::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A role claim supplied by the external authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Collector,
    Validator,
    Canceller,
    Admin,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "collector" => Ok(Self::Collector),
            "validator" => Ok(Self::Validator),
            "canceller" => Ok(Self::Canceller),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

/// An action on the ledger that requires authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Record a new payment.
    Collect,
    /// Approve a pending payment, or have one's own GCash collections validated on entry.
    Validate,
    Cancel,
    /// Back-fill historical (legacy) records.
    Backfill,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Collect => "collect",
            Self::Validate => "validate",
            Self::Cancel => "cancel",
            Self::Backfill => "backfill",
        })
    }
}

impl Role {
    pub fn grants(self, capability: Capability) -> bool {
        match self {
            Self::Admin => true,
            Self::Collector => capability == Capability::Collect,
            Self::Validator => matches!(capability, Capability::Collect | Capability::Validate),
            Self::Canceller => capability == Capability::Cancel,
        }
    }
}

/// The user performing a ledger operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn new(user_id: UserId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.roles.iter().any(|role| role.grants(capability))
    }
}
