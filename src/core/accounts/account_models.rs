// Account domain models - users, roles and the logged-in identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What an account is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular forum member, not tied to a school.
    User,
    /// Member of exactly one school, created by its teacher.
    Student,
    /// Owner of one school's spotted board.
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }

    /// Teachers and students belong to a school.
    pub fn is_school_member(&self) -> bool {
        matches!(self, Role::Student | Role::Teacher)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// A stored account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub school_id: Option<i64>,
    pub created: DateTime<Utc>,
}

/// Everything needed to insert an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub school_id: Option<i64>,
}

/// The authenticated identity handed around after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub school_id: Option<i64>,
}

impl Session {
    pub fn is_teacher_of(&self, school_id: i64) -> bool {
        self.role == Role::Teacher && self.school_id == Some(school_id)
    }

    /// Teacher or student of `school_id`.
    pub fn belongs_to(&self, school_id: i64) -> bool {
        self.role.is_school_member() && self.school_id == Some(school_id)
    }
}

impl From<&User> for Session {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            school_id: user.school_id,
        }
    }
}

/// Where a freshly logged-in account should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    Forum,
    TeacherDashboard,
    Spotted { school_id: i64 },
}

impl fmt::Display for Landing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Landing::Forum => write!(f, "public forum"),
            Landing::TeacherDashboard => write!(f, "teacher dashboard"),
            Landing::Spotted { school_id } => write!(f, "spotted board of school #{}", school_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role, school_id: Option<i64>) -> Session {
        Session {
            user_id: 1,
            username: "ala".to_string(),
            role,
            school_id,
        }
    }

    #[test]
    fn test_role_roundtrip_through_text() {
        for role in [Role::User, Role::Student, Role::Teacher] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_school_membership() {
        assert!(session(Role::Teacher, Some(3)).is_teacher_of(3));
        assert!(!session(Role::Student, Some(3)).is_teacher_of(3));
        assert!(session(Role::Student, Some(3)).belongs_to(3));
        assert!(!session(Role::Student, Some(4)).belongs_to(3));
        assert!(!session(Role::User, Some(3)).belongs_to(3));
    }
}
