use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use thiserror::Error;

/// Caller-facing failure kinds. All are deterministic given the same stored
/// state; every rule violation is checked before any mutation, so an error
/// never leaves a partial write behind.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("quest already completed")]
    AlreadyCompleted,

    #[error("hp is 0, rest before taking on quests")]
    RestRequired,

    #[error("not enough sp, rest or use an item")]
    InsufficientSp,

    #[error("item not in inventory")]
    InsufficientItem,

    #[error("not enough gold")]
    InsufficientGold,

    #[error("username already taken")]
    UsernameTaken,

    #[error("chain step already taken for this parent")]
    DuplicateStep,

    #[error("{0}")]
    Validation(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyCompleted
            | ApiError::RestRequired
            | ApiError::InsufficientSp
            | ApiError::InsufficientItem
            | ApiError::InsufficientGold
            | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::UsernameTaken | ApiError::DuplicateStep => StatusCode::CONFLICT,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable tag so clients can offer a specific remedy
    /// (e.g. prompt a rest) instead of parsing the message.
    fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::AlreadyCompleted => "already_completed",
            ApiError::RestRequired => "rest_required",
            ApiError::InsufficientSp => "insufficient_sp",
            ApiError::InsufficientItem => "insufficient_item",
            ApiError::InsufficientGold => "insufficient_gold",
            ApiError::UsernameTaken => "username_taken",
            ApiError::DuplicateStep => "duplicate_step",
            ApiError::Validation(_) => "validation",
            ApiError::Database(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Database(ref e) = self {
            tracing::error!("Database error: {}", e);
        }
        let body = Json(serde_json::json!({
            "success": false,
            "kind": self.kind(),
            "error": self.to_string(),
        }));
        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::NotFound("quest").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::RestRequired.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Validation("username must not be empty")
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::UsernameTaken.into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::DuplicateStep.into_response().status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_every_kind_is_tagged() {
        // Clients branch on the tag, so each variant carries one
        assert_eq!(ApiError::NotFound("item").kind(), "not_found");
        assert_eq!(ApiError::AlreadyCompleted.kind(), "already_completed");
        assert_eq!(ApiError::RestRequired.kind(), "rest_required");
        assert_eq!(ApiError::InsufficientSp.kind(), "insufficient_sp");
        assert_eq!(ApiError::InsufficientItem.kind(), "insufficient_item");
        assert_eq!(ApiError::InsufficientGold.kind(), "insufficient_gold");
        assert_eq!(ApiError::UsernameTaken.kind(), "username_taken");
        assert_eq!(ApiError::DuplicateStep.kind(), "duplicate_step");
        assert_eq!(ApiError::Validation("x").kind(), "validation");
    }
}
