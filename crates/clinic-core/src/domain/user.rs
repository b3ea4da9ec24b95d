//! User domain entity

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    ClinicAdmin,
    Coach,
    #[default]
    Client,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::ClinicAdmin => "clinic_admin",
            UserRole::Coach => "coach",
            UserRole::Client => "client",
        }
    }
}

impl FromStr for UserRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "clinic_admin" => Ok(UserRole::ClinicAdmin),
            "coach" => Ok(UserRole::Coach),
            "client" => Ok(UserRole::Client),
            _ => Err(DomainError::ValidationError(format!("Unknown role: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct User {
    pub id: Uuid,

    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    pub phone: Option<String>,
    pub role: UserRole,

    #[serde(skip_serializing)]
    pub password_hash: String,

    /// `None` only for platform admins.
    pub clinic_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        name: &str,
        email: &str,
        phone: Option<String>,
        role: UserRole,
        password_hash: String,
        clinic_id: Option<Uuid>,
    ) -> Result<Self, validator::ValidationErrors> {
        let now = Utc::now();
        let user = Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            phone,
            role,
            password_hash,
            clinic_id,
            created_at: now,
            updated_at: now,
        };
        user.validate()?;
        Ok(user)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_names() {
        for role in [UserRole::Admin, UserRole::ClinicAdmin, UserRole::Coach, UserRole::Client] {
            assert_eq!(role.as_str().parse::<UserRole>().ok(), Some(role));
        }
        assert_eq!("CLINIC_ADMIN".parse::<UserRole>().ok(), Some(UserRole::ClinicAdmin));
        assert!("owner".parse::<UserRole>().is_err());
        assert_eq!(UserRole::default(), UserRole::Client);
    }
}
