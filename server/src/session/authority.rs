use mongodb::bson::oid::ObjectId;
use std::sync::Arc;

use crate::auth_token::{AuthTokenError, AuthTokenService};
use crate::config::AuthConfig;
use crate::db::{AuthToken, User, UserProfile, UserStore};
use crate::error::{Result, TodoApiError};

// Hashed once so unknown emails still pay for a bcrypt comparison.
const DECOY_PASSWORD: &str = "decoy-password-never-matches";

/// The user behind a verified token, together with that token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user: UserProfile,
    pub token: String,
}

/// Issues, verifies and revokes session tokens and checks credentials.
#[derive(Clone)]
pub struct SessionAuthority {
    users: Arc<dyn UserStore>,
    tokens: AuthTokenService,
    bcrypt_cost: u32,
    decoy_hash: Arc<str>,
}

impl SessionAuthority {
    pub fn new(users: Arc<dyn UserStore>, config: &AuthConfig) -> Result<Self> {
        let tokens = AuthTokenService::new(config.jwt_secret.as_bytes().to_vec())
            .map_err(|e| TodoApiError::Config(e.to_string()))?;
        let decoy_hash = bcrypt::hash(DECOY_PASSWORD, config.bcrypt_cost)?;

        Ok(Self {
            users,
            tokens,
            bcrypt_cost: config.bcrypt_cost,
            decoy_hash: Arc::from(decoy_hash),
        })
    }

    /// Creates the account and issues its first token.
    pub async fn register(&self, email: &str, password: &str) -> Result<(UserProfile, String)> {
        let user = User::new(email, password, self.bcrypt_cost)?;
        let user = self.users.insert_user(user).await?;
        let profile = user.profile();

        let token = self.generate_auth_token(&profile).await?;
        log::info!("Registered user {} ({})", profile.email, profile.id.to_hex());

        Ok((profile, token))
    }

    /// Signs a new token and appends it to the user's active tokens.
    pub async fn generate_auth_token(&self, user: &UserProfile) -> Result<String> {
        let token = self
            .tokens
            .issue_auth_token(&user.id.to_hex())
            .map_err(|e| TodoApiError::Internal(format!("Failed to issue auth token: {e}")))?;

        self.users
            .push_token(&user.id, AuthToken::auth(token.clone()))
            .await?;

        Ok(token)
    }

    /// Resolves a token to its user; any invalid or revoked token is an authentication error.
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser> {
        let claims = self.tokens.verify(token).map_err(|err: AuthTokenError| {
            log::debug!("Rejected auth token: {}", err);
            TodoApiError::Authentication
        })?;

        let user_id =
            ObjectId::parse_str(&claims.sub).map_err(|_| TodoApiError::Authentication)?;

        let user = self
            .users
            .find_user_by_token(&user_id, token)
            .await?
            .ok_or(TodoApiError::Authentication)?;

        Ok(AuthenticatedUser {
            user: user.profile(),
            token: token.to_string(),
        })
    }

    /// Revokes one token. Other tokens of the same user stay valid.
    pub async fn remove_token(&self, user: &UserProfile, token: &str) -> Result<()> {
        self.users.pull_token(&user.id, token).await?;
        log::info!("Revoked a token of user {}", user.id.to_hex());
        Ok(())
    }

    /// Unknown email and wrong password fail with the same error.
    pub async fn find_by_credentials(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim();

        let Some(user) = self.users.find_user_by_email(email).await? else {
            let _ = bcrypt::verify(password, &self.decoy_hash);
            log::warn!("Failed login attempt for {}", email);
            return Err(TodoApiError::Authentication);
        };

        if !user.verify_password(password)? {
            log::warn!("Failed login attempt for {}", email);
            return Err(TodoApiError::Authentication);
        }

        Ok(user)
    }

    /// Credential check followed by a fresh token.
    pub async fn login(&self, email: &str, password: &str) -> Result<(UserProfile, String)> {
        let user = self.find_by_credentials(email, password).await?;
        let profile = user.profile();
        let token = self.generate_auth_token(&profile).await?;

        log::info!("Successful login for {}", profile.email);
        Ok((profile, token))
    }
}
