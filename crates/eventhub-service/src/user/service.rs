//! Account operations: sign-up, login and profile lookup.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use eventhub_auth::jwt::JwtEncoder;
use eventhub_auth::password::{PasswordHasher, PasswordValidator};
use eventhub_core::error::AppError;
use eventhub_database::store::UserStore;
use eventhub_entity::user::{CreateUser, User, UserRole};

use crate::context::RequestContext;

/// A freshly issued access token and the account it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    /// Signed JWT.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// The authenticated user.
    pub user: User,
}

/// Handles account creation and authentication.
#[derive(Clone)]
pub struct UserService {
    /// User store.
    users: Arc<dyn UserStore>,
    /// Password hasher.
    hasher: Arc<PasswordHasher>,
    /// Password validator.
    validator: Arc<PasswordValidator>,
    /// Token issuer.
    encoder: Arc<JwtEncoder>,
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService")
            .field("validator", &self.validator)
            .finish()
    }
}

impl UserService {
    /// Creates a new user service.
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<PasswordHasher>,
        validator: Arc<PasswordValidator>,
        encoder: Arc<JwtEncoder>,
    ) -> Self {
        Self {
            users,
            hasher,
            validator,
            encoder,
        }
    }

    /// Creates an account and signs it in.
    ///
    /// The role defaults to `user`. Fails `Conflict` if the email is taken.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Option<UserRole>,
    ) -> Result<AuthSession, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::validation("Name cannot be empty"));
        }
        if email.trim().is_empty() {
            return Err(AppError::validation("Email cannot be empty"));
        }
        self.validator.validate(password)?;

        if self.users.find_user_by_email(email).await?.is_some() {
            return Err(AppError::conflict("A user with this email already exists"));
        }

        let password_hash = self.hasher.hash_password(password)?;
        let user = User::new(
            CreateUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
                role: role.unwrap_or_default(),
            },
            Utc::now(),
        );
        self.users.insert_user(&user).await?;

        info!(user_id = %user.id, role = %user.role.as_str(), "User registered");
        self.issue(user)
    }

    /// Verifies credentials and issues a token.
    ///
    /// Unknown emails and wrong passwords fail the same way.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let Some(user) = self.users.find_user_by_email(email).await? else {
            warn!("Login attempt for unknown email");
            return Err(AppError::unauthorized("Invalid credentials"));
        };

        if !self.hasher.verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(AppError::unauthorized("Invalid credentials"));
        }

        info!(user_id = %user.id, "User logged in");
        self.issue(user)
    }

    /// The calling user's account.
    pub async fn profile(&self, ctx: &RequestContext) -> Result<User, AppError> {
        self.users
            .find_user(ctx.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    fn issue(&self, user: User) -> Result<AuthSession, AppError> {
        let (token, expires_at) = self.encoder.generate_access_token(&user)?;
        Ok(AuthSession {
            token,
            expires_at,
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use eventhub_auth::jwt::JwtDecoder;
    use eventhub_core::config::AuthConfig;
    use eventhub_core::error::ErrorKind;
    use eventhub_database::store::MemoryStore;

    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-key-for-user-service".to_string(),
            ..Default::default()
        }
    }

    fn service() -> UserService {
        let config = config();
        UserService::new(
            Arc::new(MemoryStore::new(Duration::from_secs(1))),
            Arc::new(PasswordHasher::new()),
            Arc::new(PasswordValidator::new(&config)),
            Arc::new(JwtEncoder::new(&config)),
        )
    }

    #[tokio::test]
    async fn test_register_issues_valid_token() {
        let service = service();
        let session = service
            .register("Ada", "Ada@Example.com", "correct horse", None)
            .await
            .unwrap();
        assert_eq!(session.user.email, "ada@example.com");
        assert_eq!(session.user.role, UserRole::User);

        let claims = JwtDecoder::new(&config())
            .decode_access_token(&session.token)
            .unwrap();
        assert_eq!(claims.user_id(), session.user.id);
        assert_eq!(claims.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let service = service();
        service
            .register("Ada", "ada@example.com", "correct horse", None)
            .await
            .unwrap();
        let err = service
            .register("Other", "ADA@example.com", "battery staple", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let err = service()
            .register("Ada", "ada@example.com", "short", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_login() {
        let service = service();
        let registered = service
            .register("Root", "root@example.com", "correct horse", Some(UserRole::Admin))
            .await
            .unwrap();

        let session = service.login("root@example.com", "correct horse").await.unwrap();
        assert_eq!(session.user.id, registered.user.id);
        assert_eq!(session.user.role, UserRole::Admin);

        let err = service.login("root@example.com", "wrong password").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        let err = service.login("nobody@example.com", "correct horse").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert_eq!(err.message, "Invalid credentials");
    }

    #[tokio::test]
    async fn test_profile() {
        let service = service();
        let session = service
            .register("Ada", "ada@example.com", "correct horse", None)
            .await
            .unwrap();
        let ctx = RequestContext::new(
            session.user.id,
            session.user.role,
            session.user.email.clone(),
        );
        assert_eq!(service.profile(&ctx).await.unwrap().name, "Ada");

        let ghost = RequestContext::new(uuid::Uuid::new_v4(), UserRole::User, String::new());
        assert_eq!(
            service.profile(&ghost).await.unwrap_err().kind,
            ErrorKind::NotFound
        );
    }
}
