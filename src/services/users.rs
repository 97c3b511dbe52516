//! Authentication and user management service

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        user::{RegisterUser, UpdateUser, User, UserClaims, MAX_SESSION_TOKENS},
        Pagination,
    },
    repository::{TransactionStore, UserStore},
};

#[derive(Clone)]
pub struct UsersService {
    users: Arc<dyn UserStore>,
    transactions: Arc<dyn TransactionStore>,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(users: Arc<dyn UserStore>, transactions: Arc<dyn TransactionStore>, config: AuthConfig) -> Self {
        Self { users, transactions, config }
    }

    /// Token lifetime in seconds
    pub fn token_lifetime(&self) -> i64 {
        self.config.jwt_expiration_hours as i64 * 3600
    }

    /// Register a new account
    pub async fn register(&self, user: RegisterUser) -> AppResult<User> {
        if self.users.email_exists(&user.email, None).await? {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        if let Some(ref username) = user.username {
            if self.users.username_exists(username, None).await? {
                return Err(AppError::Conflict("Username already exists".to_string()));
            }
        }

        let password = self.hash_password(&user.password)?;
        let created = self.users.create(&user, &password).await?;

        tracing::info!(user_id = created.id, role = %created.role, "User registered");
        Ok(created)
    }

    /// Authenticate by email or username and return a JWT token
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .users
            .find_by_login(login)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid login or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid login or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        self.users.push_token(user.id, &token, MAX_SESSION_TOKENS).await?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok((token, user))
    }

    /// Revoke a session token
    pub async fn logout(&self, user_id: i32, token: &str) -> AppResult<()> {
        self.users.remove_token(user_id, token).await
    }

    /// Verify a bearer token and resolve it to a live session
    pub async fn resolve_session(&self, token: &str) -> AppResult<UserClaims> {
        let claims = UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        let user = match self.users.get_by_id(claims.user_id).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Authentication("User no longer exists".to_string()))
            }
            Err(e) => return Err(e),
        };

        if !user.tokens.iter().any(|t| t == token) {
            return Err(AppError::Authentication("Session has been revoked".to_string()));
        }

        // Role changes take effect without waiting for a new login
        Ok(UserClaims { role: user.role, ..claims })
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();

        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            exp: now + self.token_lifetime(),
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.users.get_by_id(id).await
    }

    /// Search users
    pub async fn search_users(&self, pagination: Pagination, search: Option<String>) -> AppResult<(Vec<User>, i64)> {
        self.users.search(pagination, search).await
    }

    /// Update an existing user
    pub async fn update_user(&self, id: i32, user: UpdateUser) -> AppResult<User> {
        // Check if user exists
        self.users.get_by_id(id).await?;

        if let Some(ref email) = user.email {
            if self.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict("Email already exists".to_string()));
            }
        }

        if let Some(ref username) = user.username {
            if self.users.username_exists(username, Some(id)).await? {
                return Err(AppError::Conflict("Username already exists".to_string()));
            }
        }

        let password = match user.password {
            Some(ref password) => Some(self.hash_password(password)?),
            None => None,
        };

        self.users.update(id, &user, password).await
    }

    /// Delete a user with no book still out
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.users.get_by_id(id).await?;

        if self.transactions.has_open_for_user(id).await? {
            return Err(AppError::Conflict(
                "User has borrowed books that are not returned".to_string(),
            ));
        }

        if !self.users.delete(id).await? {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }
}
