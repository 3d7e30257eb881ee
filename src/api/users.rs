//! User profile and image endpoints.

use reqwest::multipart::{Form, Part};

use super::ApiClient;
use super::dto::UserScoped;
use crate::domain::{ImageRef, ImageUpload, ProfileUpdate, User, UserId};
use crate::error::ClientError;

impl ApiClient {
    /// `GET /getUserById/:id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, status or decode failure.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, ClientError> {
        self.get_json(&["getUserById", &user_id.to_string()]).await
    }

    /// `POST /updateUser`: changes name and email.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] on blank fields, or any
    /// request failure.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, ClientError> {
        if update.name.trim().is_empty() || !update.email.contains('@') {
            return Err(ClientError::InvalidRequest(
                "profile needs a name and a valid email".to_string(),
            ));
        }
        self.post_json(
            &["updateUser"],
            &UserScoped {
                user_id,
                payload: update,
            },
        )
        .await
    }

    /// `GET /getUserProfileImage/:id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, status or decode failure.
    pub async fn profile_image(&self, user_id: UserId) -> Result<ImageRef, ClientError> {
        self.get_json(&["getUserProfileImage", &user_id.to_string()])
            .await
    }

    /// `POST /uploadUserProfileImage` (multipart).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] for an empty image or bad
    /// MIME type, or any request failure.
    pub async fn upload_profile_image(
        &self,
        user_id: UserId,
        image: ImageUpload,
    ) -> Result<ImageRef, ClientError> {
        let form = image_form(user_id, image)?;
        self.post_multipart(&["uploadUserProfileImage"], form).await
    }

    /// `GET /getUserBannerImage/:id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, status or decode failure.
    pub async fn banner_image(&self, user_id: UserId) -> Result<ImageRef, ClientError> {
        self.get_json(&["getUserBannerImage", &user_id.to_string()])
            .await
    }

    /// `POST /uploadUserBannerImage` (multipart).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] for an empty image or bad
    /// MIME type, or any request failure.
    pub async fn upload_banner_image(
        &self,
        user_id: UserId,
        image: ImageUpload,
    ) -> Result<ImageRef, ClientError> {
        let form = image_form(user_id, image)?;
        self.post_multipart(&["uploadUserBannerImage"], form).await
    }
}

/// Builds the `userId` + `image` multipart body.
fn image_form(user_id: UserId, image: ImageUpload) -> Result<Form, ClientError> {
    if image.bytes.is_empty() {
        return Err(ClientError::InvalidRequest("image is empty".to_string()));
    }
    let part = Part::bytes(image.bytes)
        .file_name(image.file_name)
        .mime_str(&image.mime_type)
        .map_err(|e| ClientError::InvalidRequest(format!("mime type: {e}")))?;
    Ok(Form::new()
        .text("userId", user_id.to_string())
        .part("image", part))
}
