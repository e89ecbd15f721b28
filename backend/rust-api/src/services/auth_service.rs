use anyhow::Context;
use chrono::{Duration, Utc};
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;

use crate::error::ApiError;
use crate::middlewares::auth::{JwtClaims, JwtService};
use crate::models::user::{
    AuthResponse, LoginRequest, RegisterRequest, User, UserProfile, UserRole, AVATARS,
};

const YEAR_LEVELS: [i32; 4] = [3, 5, 7, 9];

pub struct AuthService {
    mongo: Database,
    jwt_service: JwtService,
    token_ttl_days: i64,
}

impl AuthService {
    pub fn new(mongo: Database, jwt_service: JwtService, token_ttl_days: i64) -> Self {
        Self {
            mongo,
            jwt_service,
            token_ttl_days,
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, ApiError> {
        Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, ApiError> {
        Ok(bcrypt::verify(password, hash)?)
    }

    /// Creates a new account. Handle and email are normalized to lowercase
    /// before the duplicate check so comparisons are case-insensitive.
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, ApiError> {
        if let Some(year) = req.year_level {
            if !YEAR_LEVELS.contains(&year) {
                return Err(ApiError::Validation(
                    "Year level must be 3, 5, 7 or 9".to_string(),
                ));
            }
        }

        let username = req.username.trim().to_lowercase();
        let email = req.email.trim().to_lowercase();

        let users = self.mongo.collection::<User>("users");

        let existing = users
            .find_one(doc! { "$or": [ { "email": &email }, { "username": &username } ] })
            .await?;

        if existing.is_some() {
            return Err(ApiError::Conflict(
                "User with this email or username already exists".to_string(),
            ));
        }

        let password_hash = self.hash_password(&req.password)?;
        let avatar = AVATARS[rand::random_range(0..AVATARS.len())].to_string();

        let now = Utc::now();
        let user = User {
            id: None,
            username,
            email,
            password_hash,
            avatar,
            role: UserRole::Student,
            year_level: req.year_level,
            preferences: Default::default(),
            created_at: now,
            updated_at: now,
            last_login: None,
        };

        let insert_result = users.insert_one(&user).await?;
        let user_id = insert_result
            .inserted_id
            .as_object_id()
            .context("inserted user id was not an ObjectId")?;

        let token = self.issue_token(&user_id, &user.role)?;

        let mut user_with_id = user;
        user_with_id.id = Some(user_id);

        tracing::info!(user_id = %user_id.to_hex(), "user registered");

        Ok(AuthResponse {
            success: true,
            message: "User registered successfully".to_string(),
            token,
            user: UserProfile::from(user_with_id),
        })
    }

    /// Authenticates by handle + password. Unknown handle and wrong password
    /// are indistinguishable to the caller.
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ApiError> {
        let username = req.username.trim().to_lowercase();
        let users = self.mongo.collection::<User>("users");

        let user = users
            .find_one(doc! { "username": &username })
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        if !self.verify_password(&req.password, &user.password_hash)? {
            tracing::warn!(username = %username, "failed login attempt");
            return Err(ApiError::InvalidCredentials);
        }

        let user_id = user.id.context("stored user has no id")?;

        users
            .update_one(
                doc! { "_id": user_id },
                doc! { "$set": { "lastLogin": mongodb::bson::DateTime::now() } },
            )
            .await?;

        let token = self.issue_token(&user_id, &user.role)?;

        tracing::info!(user_id = %user_id.to_hex(), "successful login");

        Ok(AuthResponse {
            success: true,
            message: "Login successful".to_string(),
            token,
            user: UserProfile::from(user),
        })
    }

    pub async fn get_user_by_id(&self, user_id: &str) -> Result<User, ApiError> {
        let object_id = ObjectId::parse_str(user_id)
            .map_err(|_| ApiError::Validation("Invalid user id".to_string()))?;

        self.mongo
            .collection::<User>("users")
            .find_one(doc! { "_id": object_id })
            .await?
            .ok_or(ApiError::NotFound("User"))
    }

    /// Re-hashes and replaces the credential after verifying the old one.
    pub async fn change_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let user = self.get_user_by_id(user_id).await?;

        if !self.verify_password(old_password, &user.password_hash)? {
            return Err(ApiError::InvalidCredentials);
        }

        let password_hash = self.hash_password(new_password)?;
        let object_id = user.id.context("stored user has no id")?;

        self.mongo
            .collection::<User>("users")
            .update_one(
                doc! { "_id": object_id },
                doc! { "$set": {
                    "passwordHash": password_hash,
                    "updatedAt": mongodb::bson::DateTime::now(),
                } },
            )
            .await?;

        tracing::info!(user_id = %object_id.to_hex(), "password changed");
        Ok(())
    }

    /// Role mutation, reachable only through the admin-guarded route.
    pub async fn update_role(&self, user_id: &str, role: UserRole) -> Result<UserProfile, ApiError> {
        let object_id = ObjectId::parse_str(user_id)
            .map_err(|_| ApiError::Validation("Invalid user id".to_string()))?;

        let users = self.mongo.collection::<User>("users");
        let result = users
            .update_one(
                doc! { "_id": object_id },
                doc! { "$set": {
                    "role": role.as_str(),
                    "updatedAt": mongodb::bson::DateTime::now(),
                } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(ApiError::NotFound("User"));
        }

        tracing::info!(user_id = %object_id.to_hex(), role = role.as_str(), "role updated");

        let updated = users
            .find_one(doc! { "_id": object_id })
            .await?
            .ok_or(ApiError::NotFound("User"))?;

        Ok(UserProfile::from(updated))
    }

    fn issue_token(&self, user_id: &ObjectId, role: &UserRole) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::days(self.token_ttl_days);

        let claims = JwtClaims {
            sub: user_id.to_hex(),
            role: role.as_str().to_string(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        };

        self.jwt_service.generate_token(claims)
    }
}
