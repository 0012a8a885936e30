use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::ids::UserId;

/// Account role as issued by the identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Student,
    Professor,
}

impl UserRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Student => "STUDENT",
            UserRole::Professor => "PROFESSOR",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError(pub String);

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown user role: {}", self.0)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for UserRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STUDENT" => Ok(UserRole::Student),
            "PROFESSOR" => Ok(UserRole::Professor),
            _ => Err(ParseRoleError(s.to_owned())),
        }
    }
}

/// The acting user, supplied explicitly by the caller at the service boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub name: String,
    pub role: UserRole,
}

impl Identity {
    #[must_use]
    pub fn new(user_id: UserId, name: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id,
            name: name.into(),
            role,
        }
    }

    #[must_use]
    pub fn student(user_id: UserId, name: impl Into<String>) -> Self {
        Self::new(user_id, name, UserRole::Student)
    }

    #[must_use]
    pub fn professor(user_id: UserId, name: impl Into<String>) -> Self {
        Self::new(user_id, name, UserRole::Professor)
    }

    #[must_use]
    pub fn is_student(&self) -> bool {
        self.role == UserRole::Student
    }
}

/// Stored account data without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::new(self.user_id, self.name.clone(), self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("student".parse::<UserRole>().unwrap(), UserRole::Student);
        assert_eq!(" PROFESSOR ".parse::<UserRole>().unwrap(), UserRole::Professor);
        assert!("admin".parse::<UserRole>().is_err());
    }

    #[test]
    fn role_round_trips_through_display() {
        for role in [UserRole::Student, UserRole::Professor] {
            assert_eq!(role.to_string().parse::<UserRole>().unwrap(), role);
        }
    }
}
