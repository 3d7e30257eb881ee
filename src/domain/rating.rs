//! User ratings. Append-only from the client's point of view.

use serde::{Deserialize, Serialize};

use super::UserId;
use crate::error::ClientError;

/// Lowest accepted score.
pub const MIN_SCORE: u8 = 1;
/// Highest accepted score.
pub const MAX_SCORE: u8 = 5;

/// A rating left by one user for another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    /// Backend identifier, absent on older rows.
    #[serde(default)]
    pub id: Option<i64>,
    /// User who left the rating.
    pub rater_id: UserId,
    /// User being rated.
    pub rated_id: UserId,
    /// Score in `MIN_SCORE..=MAX_SCORE`.
    pub score: u8,
    /// Optional free-text comment.
    #[serde(default)]
    pub comment: String,
}

/// Body of `POST /createNewUserRating`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRating {
    rater_id: UserId,
    rated_id: UserId,
    score: u8,
    comment: String,
}

impl NewRating {
    /// Builds a rating after checking the score range.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] if the score is out of range
    /// or a user tries to rate themselves.
    pub fn new(
        rater_id: UserId,
        rated_id: UserId,
        score: u8,
        comment: impl Into<String>,
    ) -> Result<Self, ClientError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(ClientError::InvalidRequest(format!(
                "score {score} outside {MIN_SCORE}..={MAX_SCORE}"
            )));
        }
        if rater_id == rated_id {
            return Err(ClientError::InvalidRequest(
                "users cannot rate themselves".to_string(),
            ));
        }
        Ok(Self {
            rater_id,
            rated_id,
            score,
            comment: comment.into(),
        })
    }

    /// The user being rated.
    #[must_use]
    pub const fn rated_id(&self) -> UserId {
        self.rated_id
    }

    /// The user leaving the rating.
    #[must_use]
    pub const fn rater_id(&self) -> UserId {
        self.rater_id
    }
}

/// Average score across `ratings`, or `None` when there are none.
#[must_use]
pub fn average_score(ratings: &[Rating]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let total: u32 = ratings.iter().map(|r| u32::from(r.score)).sum();
    #[allow(clippy::cast_precision_loss)]
    let avg = f64::from(total) / ratings.len() as f64;
    Some(avg)
}
