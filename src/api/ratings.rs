//! Rating endpoints.

use super::ApiClient;
use crate::domain::{NewRating, Rating, UserId};
use crate::error::ClientError;

impl ApiClient {
    /// `POST /createNewUserRating`: appends a rating.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or status failure.
    pub async fn create_rating(&self, rating: &NewRating) -> Result<(), ClientError> {
        self.post_ack(&["createNewUserRating"], rating).await
    }

    /// `GET /getUserRating/:id`: ratings received by a user.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, status or decode failure.
    pub async fn user_ratings(&self, user_id: UserId) -> Result<Vec<Rating>, ClientError> {
        self.get_json(&["getUserRating", &user_id.to_string()])
            .await
    }
}
