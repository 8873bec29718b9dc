use routinely_core::types::Role;
use serde::{Deserialize, Serialize};

/// Gender as recorded at registration. `None` is an explicit choice,
/// not a missing value — the stats rollups report it as its own column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    None,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
            Gender::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "none" => Ok(Gender::None),
            other => Err(format!("unknown gender: {}", other)),
        }
    }
}

/// Full profile record. Credentials and reset tokens belong to the external
/// identity service and are never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUIDv7 string — primary key.
    pub id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub nationality: String,
    /// ISO date string (YYYY-MM-DD).
    pub birthdate: String,
    pub gender: Gender,
    /// IANA zone name (e.g. "Europe/Berlin"). The midnight reset falls back
    /// to UTC when the name does not resolve.
    pub timezone: String,
    pub role: Role,
    /// Soft-delete flag; inactive users are skipped by the reset engine.
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for registering a profile. Role is always `user` at creation;
/// promotions happen through a separate update.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub nationality: String,
    /// ISO date string (YYYY-MM-DD); validated on insert.
    pub birthdate: String,
    #[serde(default)]
    pub gender: Gender,
    /// Defaults to UTC when absent.
    pub timezone: Option<String>,
}
