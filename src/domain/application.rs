//! Application catalog domain model

use super::common::{impl_mysql_string_enum, StringUuid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// How requests for an application are routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum LevelingMode {
    /// Fixed three-manager chain (A -> B -> C)
    #[default]
    Leveling,
    /// The application's own manager list, or a single fallback reviewer
    #[serde(alias = "noleveling", alias = "no-leveling")]
    NoLeveling,
}

impl std::str::FromStr for LevelingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "leveling" => Ok(LevelingMode::Leveling),
            "no_leveling" | "noleveling" | "no-leveling" | "no leveling" => {
                Ok(LevelingMode::NoLeveling)
            }
            _ => Err(format!("Unknown leveling mode: {}", s)),
        }
    }
}

impl std::fmt::Display for LevelingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelingMode::Leveling => write!(f, "leveling"),
            LevelingMode::NoLeveling => write!(f, "no_leveling"),
        }
    }
}

impl_mysql_string_enum!(LevelingMode);

/// A manager bound to an application or to an approval level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
pub struct AssignedManager {
    /// Stable principal id (the `sub` of the manager's token)
    pub id: StringUuid,
    /// Display name snapshot
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

impl AssignedManager {
    pub fn new(id: impl Into<StringUuid>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Catalogued application staff can request access to
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Application {
    pub id: StringUuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub leveling: LevelingMode,
    /// Assigned managers in assignment order. Ignored for leveling apps.
    #[sqlx(json)]
    pub managers: Vec<AssignedManager>,
    pub logo_url: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Application {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: StringUuid::new_v4(),
            name: String::new(),
            description: String::new(),
            category: String::new(),
            leveling: LevelingMode::default(),
            managers: Vec::new(),
            logo_url: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateApplicationInput {
    #[validate(length(min = 1, max = 255), custom(function = "validate_not_blank"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[serde(default)]
    pub leveling: LevelingMode,
    #[serde(default)]
    #[validate(nested, custom(function = "validate_unique_managers"))]
    pub managers: Vec<AssignedManager>,
    #[validate(url)]
    pub logo_url: Option<String>,
}

/// Input for editing a catalog entry; absent fields are left as they are
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateApplicationInput {
    #[validate(length(min = 1, max = 255), custom(function = "validate_not_blank"))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    pub leveling: Option<LevelingMode>,
    #[validate(nested, custom(function = "validate_unique_managers"))]
    pub managers: Option<Vec<AssignedManager>>,
    #[validate(url)]
    pub logo_url: Option<String>,
    pub active: Option<bool>,
}

/// Catalog listing filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub include_inactive: bool,
    pub category: Option<String>,
    /// Case-insensitive substring of the name
    pub search: Option<String>,
}

/// Names are unique ignoring case and surrounding whitespace.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

fn validate_unique_managers(managers: &[AssignedManager]) -> Result<(), validator::ValidationError> {
    let mut seen: Vec<Uuid> = Vec::with_capacity(managers.len());
    for manager in managers {
        if seen.contains(&manager.id) {
            return Err(validator::ValidationError::new("duplicate_manager"));
        }
        seen.push(*manager.id);
    }
    Ok(())
}
