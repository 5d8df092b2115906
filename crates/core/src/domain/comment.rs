use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::memo::MemoId;
use crate::domain::user::User;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentId(pub String);

/// An entry in a memo's minutes log. Append-only: no edit or delete exists.
/// The author's display fields and signature reference are joined in at read
/// time rather than denormalized onto the row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub memo_id: MemoId,
    pub author: User,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewComment {
    pub text: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.text.trim().is_empty() {
            return Err(DomainError::InvalidInput("comment text is required".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::NewComment;

    #[test]
    fn blank_comment_text_is_rejected() {
        assert!(NewComment { text: "  \n".to_string() }.validate().is_err());
        assert!(NewComment { text: "Noted for action.".to_string() }.validate().is_ok());
    }
}
