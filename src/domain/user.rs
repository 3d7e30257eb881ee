//! Users, credentials, and profile payloads.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::UserId;
use crate::error::ClientError;

/// A user profile as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Average of the ratings left by other users, if any.
    #[serde(default)]
    pub rating: Option<f64>,
    /// URL of the profile picture.
    #[serde(default)]
    pub profile_image: Option<String>,
    /// URL of the banner picture.
    #[serde(default)]
    pub banner_image: Option<String>,
}

/// Body of `POST /userLogin`.
#[derive(Clone, Serialize)]
pub struct Credentials {
    /// Login email.
    pub email: String,
    /// Plain-text password; never logged.
    pub password: String,
}

impl Credentials {
    /// Builds credentials, rejecting blank fields.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] if either field is empty.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Result<Self, ClientError> {
        let email = email.into();
        let password = password.into();
        if email.trim().is_empty() || password.is_empty() {
            return Err(ClientError::InvalidRequest(
                "email and password are required".to_string(),
            ));
        }
        Ok(Self { email, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /auth/register`.
#[derive(Clone, Serialize)]
pub struct Registration {
    /// Login email.
    pub email: String,
    /// Plain-text password; never logged.
    pub password: String,
    /// Display name.
    pub name: String,
}

impl Registration {
    /// Builds a registration, rejecting blank fields.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] if any field is empty or the
    /// email has no `@`.
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let email = email.into();
        let password = password.into();
        let name = name.into();
        if email.trim().is_empty() || password.is_empty() || name.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "email, password and name are required".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(ClientError::InvalidRequest(format!(
                "invalid email: {email}"
            )));
        }
        Ok(Self {
            email,
            password,
            name,
        })
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

/// Response of register and login: at least the new user's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Identifier to persist as the session user.
    pub id: UserId,
    /// Display name, when the backend echoes it.
    #[serde(default)]
    pub name: Option<String>,
    /// Email, when the backend echoes it.
    #[serde(default)]
    pub email: Option<String>,
}

/// Body of `POST /updateUser`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New display name.
    pub name: String,
    /// New email.
    pub email: String,
}

/// Image bytes to upload as a profile or banner picture.
#[derive(Clone)]
pub struct ImageUpload {
    /// File name sent with the multipart part.
    pub file_name: String,
    /// MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Response of the image endpoints: `{"imageUrl": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    /// Public URL of the stored image.
    pub image_url: String,
}
