use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::question::Difficulty;
use super::{bson_datetime_as_chrono, bson_datetime_as_chrono_option};

/// Cosmetic avatars assigned at random on registration.
pub const AVATARS: [&str; 8] = ["👦", "👧", "🧒", "👶", "🧑", "🐱", "🐶", "🐼"];

/// Account stored in the "users" collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    /// bcrypt hash; never part of any response projection.
    pub password_hash: String,
    #[serde(default = "default_avatar")]
    pub avatar: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub year_level: Option<i32>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_as_chrono_option"
    )]
    pub last_login: Option<DateTime<Utc>>,
}

fn default_avatar() -> String {
    "👤".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Admin,
    #[serde(rename = "super-admin")]
    SuperAdmin,
}

impl UserRole {
    pub fn as_str(&self) -> &str {
        match self {
            UserRole::Student => "student",
            UserRole::Admin => "admin",
            UserRole::SuperAdmin => "super-admin",
        }
    }
}

/// Per-account practice defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default = "super::question::default_time_limit")]
    pub time_limit: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            time_limit: 30,
            difficulty: Difficulty::Medium,
        }
    }
}

/// Public projection returned to the client (no credential hash).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub role: UserRole,
    pub year_level: Option<i32>,
    pub preferences: Preferences,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            username: user.username,
            email: user.email,
            avatar: user.avatar,
            role: user.role,
            year_level: user.year_level,
            preferences: user.preferences,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 20, message = "Username must be 2-20 characters"))]
    pub username: String,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 5, message = "Password must be at least 5 characters"))]
    pub password: String,

    pub year_level: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Response after successful registration or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,

    #[validate(length(min = 5, message = "Password must be at least 5 characters"))]
    pub new_password: String,
}

/// Body for PUT /api/auth/users/{id}/role (admin only).
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_with_hyphenated_super_admin() {
        assert_eq!(
            serde_json::to_string(&UserRole::SuperAdmin).unwrap(),
            "\"super-admin\""
        );
        assert_eq!(
            serde_json::from_str::<UserRole>("\"super-admin\"").unwrap(),
            UserRole::SuperAdmin
        );
    }

    #[test]
    fn profile_never_carries_the_hash() {
        let user = User {
            id: Some(ObjectId::new()),
            username: "sam".to_string(),
            email: "sam@example.com".to_string(),
            password_hash: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
            avatar: "🐼".to_string(),
            role: UserRole::Student,
            year_level: Some(3),
            preferences: Preferences::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login: None,
        };

        let json = serde_json::to_value(UserProfile::from(user)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["username"], "sam");
        assert_eq!(json["preferences"]["timeLimit"], 30);
    }
}
