use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::{
    directory::{DirectoryError, NewUser, UserDirectory, UserPatch},
    dto::{LoginResponse, PublicUser, RegisterRequest, UpdateOwnRequest, UpdateUserRequest},
    error::{AuthError, CredentialFault},
    jwt::TokenIssuer,
    password::{hash_password, verify_password},
};

/// How a free-text lookup term is interpreted. Classification happens once,
/// here; the query paths only ever see the already-tagged variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    /// The term parses as a user id: fetch exactly that row.
    Id(Uuid),
    /// Anything else is matched case-insensitively against email and role.
    EmailOrRole(String),
}

impl LookupKey {
    pub fn classify(term: &str) -> Self {
        match Uuid::try_parse(term) {
            Ok(id) => LookupKey::Id(id),
            Err(_) => LookupKey::EmailOrRole(term.trim().to_lowercase()),
        }
    }
}

/// Orchestrates the credential lifecycle: registration, login, lookup,
/// updates and deactivation. Stateless between calls; all persistence goes
/// through the injected directory, all tokens through the injected issuer.
pub struct CredentialService {
    directory: Arc<dyn UserDirectory>,
    tokens: TokenIssuer,
}

impl CredentialService {
    pub fn new(directory: Arc<dyn UserDirectory>, tokens: TokenIssuer) -> Self {
        Self { directory, tokens }
    }

    /// Create an account. The password is hashed before anything is stored
    /// and the plaintext is not retained.
    pub async fn register(&self, request: RegisterRequest) -> Result<PublicUser, AuthError> {
        let password_hash = hash_password(&request.password).map_err(AuthError::Internal)?;
        let user = self
            .directory
            .create(NewUser {
                email: normalize_email(&request.email),
                password_hash,
                full_name: request.full_name,
                roles: vec!["user".to_owned()],
            })
            .await
            .map_err(classify_store_error)?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user.into())
    }

    /// Authenticate an email/password pair and issue a bearer token.
    ///
    /// Checks run in order and short-circuit: unknown email, wrong password,
    /// inactive account. The first two are logged with their distinct reason
    /// but share one external message.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let email = normalize_email(email);
        let user = self
            .directory
            .find_by_email_with_secrets(&email)
            .await
            .map_err(classify_store_error)?
            .ok_or_else(|| {
                warn!(email = %email, reason = CredentialFault::UnknownEmail.as_str(), "login rejected");
                AuthError::InvalidCredential(CredentialFault::UnknownEmail)
            })?;

        let matches =
            verify_password(password, &user.password_hash).map_err(AuthError::Internal)?;
        if !matches {
            warn!(user_id = %user.id, reason = CredentialFault::WrongPassword.as_str(), "login rejected");
            return Err(AuthError::InvalidCredential(CredentialFault::WrongPassword));
        }

        if !user.is_active {
            warn!(user_id = %user.id, "login rejected for inactive account");
            return Err(AuthError::AccountDisabled);
        }

        let token = self.tokens.issue(&user.email).map_err(AuthError::Internal)?;
        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok(LoginResponse {
            user: user.into(),
            token,
        })
    }

    /// A page of accounts in creation order.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<PublicUser>, AuthError> {
        let users = self
            .directory
            .find_page(limit, offset)
            .await
            .map_err(classify_store_error)?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }

    /// Single-term lookup. An id-shaped term fetches by id (zero or one
    /// rows); anything else goes through the legacy combined email-or-role
    /// match. An empty result is a valid answer on both branches, not an
    /// error.
    pub async fn lookup(&self, term: &str) -> Result<Vec<PublicUser>, AuthError> {
        let users = match LookupKey::classify(term) {
            LookupKey::Id(id) => self
                .directory
                .find_by_id(id)
                .await
                .map_err(classify_store_error)?
                .into_iter()
                .collect(),
            LookupKey::EmailOrRole(term) => self
                .directory
                .find_by_email_or_role(&term)
                .await
                .map_err(classify_store_error)?,
        };
        Ok(users.into_iter().map(PublicUser::from).collect())
    }

    /// Administrative update: merge the given fields onto the stored row, no
    /// re-authentication. A present password is hashed before storage.
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<PublicUser, AuthError> {
        let password_hash = match &request.password {
            Some(plain) => Some(hash_password(plain).map_err(AuthError::Internal)?),
            None => None,
        };
        let patch = UserPatch {
            email: request.email.as_deref().map(normalize_email),
            full_name: request.full_name,
            roles: request.roles,
            password_hash,
        };

        let merged = self
            .directory
            .merge_partial(id, patch)
            .await
            .map_err(classify_store_error)?
            .ok_or_else(|| AuthError::NotFound(id.to_string()))?;

        let saved = self
            .directory
            .save(merged)
            .await
            .map_err(classify_store_error)?;
        info!(user_id = %saved.id, "user updated");
        Ok(saved.into())
    }

    /// Self-service update, gated on re-authentication: the caller must
    /// supply their current password even when not changing it. The merge
    /// runs first so an unknown id is reported as such; the credential check
    /// then guards every field change.
    pub async fn update_own(
        &self,
        id: Uuid,
        request: UpdateOwnRequest,
    ) -> Result<PublicUser, AuthError> {
        let patch = UserPatch {
            email: request.email.as_deref().map(normalize_email),
            full_name: request.full_name,
            ..Default::default()
        };
        let mut merged = self
            .directory
            .merge_partial(id, patch)
            .await
            .map_err(classify_store_error)?
            .ok_or_else(|| AuthError::NotFound(id.to_string()))?;

        let matches = verify_password(&request.password, &merged.password_hash)
            .map_err(AuthError::Internal)?;
        if !matches {
            warn!(user_id = %id, reason = CredentialFault::WrongPassword.as_str(), "self-service update rejected");
            return Err(AuthError::InvalidCredential(CredentialFault::WrongPassword));
        }

        if let Some(new_password) = &request.new_password {
            merged.password_hash = hash_password(new_password).map_err(AuthError::Internal)?;
        }

        let saved = self
            .directory
            .save(merged)
            .await
            .map_err(classify_store_error)?;
        info!(user_id = %saved.id, rotated_password = request.new_password.is_some(), "user updated own account");
        Ok(saved.into())
    }

    /// Soft delete: flip the active flag off, leave everything else. There
    /// is no reactivation; deactivating an already inactive account succeeds
    /// and leaves it inactive.
    pub async fn deactivate(&self, id: Uuid) -> Result<(), AuthError> {
        let mut user = self
            .directory
            .find_by_id(id)
            .await
            .map_err(classify_store_error)?
            .ok_or_else(|| AuthError::NotFound(id.to_string()))?;
        user.is_active = false;
        self.directory
            .save(user)
            .await
            .map_err(classify_store_error)?;
        info!(user_id = %id, "user deactivated");
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn classify_store_error(e: DirectoryError) -> AuthError {
    match e {
        DirectoryError::Duplicate(detail) => AuthError::Duplicate(detail),
        DirectoryError::Store(source) => {
            error!(error = ?source, "user store failure");
            AuthError::Internal(source)
        }
    }
}
