//! Portal roles carried by the authentication provider

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role of an authenticated principal, set at provisioning time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Staff,
    Manager,
    #[serde(alias = "it_admin")]
    ItAdmin,
}

impl Role {
    /// Managers and IT admins can sit in approval chains.
    pub fn can_review(&self) -> bool {
        matches!(self, Role::Manager | Role::ItAdmin)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "staff" => Ok(Role::Staff),
            "manager" => Ok(Role::Manager),
            "itadmin" | "it_admin" => Ok(Role::ItAdmin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Staff => write!(f, "staff"),
            Role::Manager => write!(f, "manager"),
            Role::ItAdmin => write!(f, "itadmin"),
        }
    }
}
