//! Registration and login.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::{hash_password, verify_password, TokenIssuer};
use crate::config::BootstrapOperator;
use crate::domain::user::{Role, User};
use crate::error::{errmsg, Error, Result};
use crate::storage::UserStore;

/// Registration and login over the user collection.
pub struct IdentityService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenIssuer>,
}

impl IdentityService {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenIssuer>) -> Self {
        Self { users, tokens }
    }

    /// Register a new account and issue a token for it.
    ///
    /// The role is always assigned server-side. A client-supplied role is
    /// ignored: honoring it would let any caller grant itself operator
    /// privileges.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        requested_role: Option<&str>,
    ) -> Result<(String, User)> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(Error::Validation(errmsg::FIELDS_REQUIRED.to_string()));
        }
        if !email.contains('@') {
            return Err(Error::Validation(errmsg::INVALID_EMAIL.to_string()));
        }
        if let Some(role) = requested_role {
            warn!(email, role, "ignoring client-supplied role at registration");
        }

        if self.users.find_by_email(email).await?.is_some() {
            return Err(Error::Conflict(errmsg::USER_EXISTS.to_string()));
        }

        let user = User::new(
            name.trim().to_string(),
            email.to_string(),
            hash_password(password)?,
            Role::Customer,
        );

        // The unique index still guards against a concurrent registration
        // slipping between the lookup and the insert.
        self.users.insert(&user).await?;
        info!(user = %user.id, "registered");

        let token = self.tokens.issue(&user)?;
        Ok((token, user))
    }

    /// Authenticate with email and password, issuing a fresh token.
    ///
    /// An unknown email reports NotFound while a wrong password reports
    /// an authentication failure; both carry the same message. Existing
    /// clients branch on the status codes.
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, User)> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| Error::NotFound(errmsg::INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(password, &user.password_hash) {
            return Err(Error::Authentication(errmsg::INVALID_CREDENTIALS.to_string()));
        }

        let token = self.tokens.issue(&user)?;
        Ok((token, user))
    }

    /// Seed the configured operator account if it does not exist yet.
    /// Idempotent across restarts.
    pub async fn bootstrap_operator(&self, operator: &BootstrapOperator) -> Result<()> {
        if self.users.find_by_email(&operator.email).await?.is_some() {
            debug!(email = %operator.email, "bootstrap operator already present");
            return Ok(());
        }

        let user = User::new(
            operator.name.clone(),
            operator.email.clone(),
            hash_password(&operator.password)?,
            Role::Operator,
        );
        self.users.insert(&user).await?;
        info!(email = %operator.email, "bootstrap operator created");
        Ok(())
    }
}
