//! Account registration, login and status.

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::domain::User;
use crate::error::{DomainError, RepoError};
use crate::ports::{PasswordService, TokenService, UserRepository};

/// Signup fields after normalization.
#[derive(Debug, Clone, Validate)]
pub struct SignupInput {
    #[validate(email(message = "Please enter a valid email."))]
    pub email: String,
    #[validate(length(min = 5, message = "Password must be at least 5 characters long."))]
    pub password: String,
    #[validate(length(min = 1, message = "Name must not be empty."))]
    pub name: String,
}

impl SignupInput {
    /// Trims every field and lowercases the email.
    pub fn new(email: &str, password: &str, name: &str) -> Self {
        Self {
            email: normalize_email(email),
            password: password.trim().to_string(),
            name: name.trim().to_string(),
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub user_id: Uuid,
    pub expires_in: i64,
}

/// Auth service - signup, login and the per-user status field.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordService>,
    tokens: Arc<dyn TokenService>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            users,
            passwords,
            tokens,
        }
    }

    /// Register a new user. The password is stored hashed.
    pub async fn signup(&self, input: SignupInput) -> Result<User, DomainError> {
        input.validate()?;

        if self.users.find_by_email(&input.email).await?.is_some() {
            return Err(email_taken());
        }

        let password_hash = self.passwords.hash(&input.password)?;
        let user = User::new(input.email, password_hash, input.name);

        match self.users.insert(user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "User created");
                Ok(user)
            }
            // Lost a race with a concurrent signup for the same email.
            Err(RepoError::Constraint(_)) => Err(email_taken()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check credentials and issue a bearer token.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, DomainError> {
        let email = normalize_email(email);

        let user = self.users.find_by_email(&email).await?.ok_or_else(|| {
            DomainError::Unauthorized("A user with this email could not be found.".to_string())
        })?;

        if !self.passwords.verify(password.trim(), &user.password_hash)? {
            return Err(DomainError::Unauthorized("Wrong password!".to_string()));
        }

        let token = self.tokens.generate_token(user.id, &user.email)?;

        tracing::debug!(user_id = %user.id, "User logged in");

        Ok(LoginOutcome {
            token,
            user_id: user.id,
            expires_in: self.tokens.expiration_seconds(),
        })
    }

    pub async fn status(&self, user_id: Uuid) -> Result<String, DomainError> {
        Ok(self.find_user(user_id).await?.status)
    }

    pub async fn update_status(&self, user_id: Uuid, status: &str) -> Result<(), DomainError> {
        let status = status.trim();
        if status.is_empty() {
            return Err(DomainError::invalid_field(
                "status",
                "Status must not be empty.",
            ));
        }

        match self.users.update_status(user_id, status).await {
            Ok(()) => Ok(()),
            Err(RepoError::NotFound) => Err(DomainError::NotFound {
                entity_type: "User",
                id: user_id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, user_id: Uuid) -> Result<User, DomainError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "User",
                id: user_id,
            })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_taken() -> DomainError {
    DomainError::invalid_field("email", "E-mail address already exists!")
}
