//! Registration and login endpoints.

use super::ApiClient;
use crate::domain::{AuthResponse, Credentials, Registration};
use crate::error::ClientError;

impl ApiClient {
    /// `POST /auth/register`: creates an account.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure, a rejected
    /// registration, or an unexpected body.
    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse, ClientError> {
        self.post_json(&["auth", "register"], registration).await
    }

    /// `POST /userLogin`: checks credentials.
    ///
    /// The backend may answer `200` with `{"error": "..."}`; that is
    /// reported as [`ClientError::Http`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or wrong credentials.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ClientError> {
        self.post_json(&["userLogin"], credentials).await
    }
}
