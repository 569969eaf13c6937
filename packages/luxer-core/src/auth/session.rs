//! E-mail one-time-code login.
//!
//! The flow is two calls apart: [`AuthSession::request_code`] makes the service
//! e-mail a code, and [`AuthSession::verify_code`] trades that code plus the
//! device identifier generated for this attempt for a long-lived token.

use crate::api::LuxerClient;
use crate::error::ApiError;
use crate::model::{DeviceIdentifier, Token};

/// Owns the token lifecycle for one account.
#[derive(Debug, Clone)]
pub struct AuthSession {
    client: LuxerClient,
}

impl AuthSession {
    /// Start unauthenticated. Any token already on `client` is kept.
    pub fn new(client: LuxerClient) -> Self {
        Self { client }
    }

    /// Resume with a token obtained by an earlier login.
    pub fn with_token(client: LuxerClient, token: Token) -> Self {
        Self {
            client: client.with_token(token),
        }
    }

    /// Fresh identifier for one login attempt.
    pub fn generate_device_identifier() -> DeviceIdentifier {
        DeviceIdentifier::generate()
    }

    pub fn token(&self) -> Option<&Token> {
        self.client.token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.token().is_some()
    }

    /// Client carrying the current token, for handing to a poller.
    pub fn client(&self) -> &LuxerClient {
        &self.client
    }

    pub fn into_client(self) -> LuxerClient {
        self.client
    }

    /// Ask for a one-time code. `Ok(false)` means the service did not
    /// acknowledge the request.
    pub async fn request_code(&self, email: &str) -> Result<bool, ApiError> {
        let acknowledged = self.client.anonymous().request_code(email).await?;
        if acknowledged {
            tracing::info!("One-time code sent to {}", email);
        } else {
            tracing::warn!("Code request for {} was not acknowledged", email);
        }
        Ok(acknowledged)
    }

    /// Verify a one-time code and keep the resulting token.
    ///
    /// On failure the previously held token, if any, is left in place.
    pub async fn verify_code(
        &mut self,
        email: &str,
        code: &str,
        device: &DeviceIdentifier,
    ) -> Result<Token, ApiError> {
        let token = self
            .client
            .anonymous()
            .verify_code(email, code.trim(), device)
            .await?;

        self.client.set_token(Some(token.clone()));
        tracing::info!("Logged in as {}", email);
        Ok(token)
    }

    /// Revoke the current token. Best effort: transport failures are logged
    /// and the local token is cleared regardless.
    pub async fn revoke(&mut self) {
        let Some(token) = self.client.token().cloned() else {
            tracing::debug!("No token to revoke");
            return;
        };

        if let Err(e) = self.client.logout(&token).await {
            tracing::warn!("Failed to revoke token: {}", e);
        }
        self.client.set_token(None);
    }

    /// Human-readable account label from the user profile.
    pub async fn user_label(&self) -> Result<String, ApiError> {
        let user = self.client.user_info().await?;
        Ok(user.display_name())
    }
}
