use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use memoreg_core::domain::approval::{
    ApprovalDecision, ApprovalStep, ApprovalStepId, ApproverEntry,
};
use memoreg_core::domain::comment::{Comment, NewComment};
use memoreg_core::domain::memo::{Memo, MemoId, MemoStatus, MemoType, NewMemo};
use memoreg_core::domain::user::{User, UserId};
use memoreg_core::errors::DomainError;

pub mod approval;
pub mod comment;
pub mod memo;
pub mod user;

pub use approval::SqlApprovalChainRepository;
pub use comment::SqlCommentRepository;
pub use memo::SqlMemoRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::Domain(DomainError::not_found(entity, id))
    }
}

/// Listing filter for the memo store. `search` matches subject or reference
/// number as a substring; `memo_type`/`status` are exact enum filters.
#[derive(Clone, Debug, Default)]
pub struct MemoFilter {
    pub search: Option<String>,
    pub memo_type: Option<MemoType>,
    pub status: Option<MemoStatus>,
}

/// A recipient with its display fields resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct RecipientDetail {
    pub user: User,
    pub added_at: DateTime<Utc>,
}

/// An approval step with its approver's display fields resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct ApprovalStepDetail {
    pub step: ApprovalStep,
    pub approver: User,
}

/// A memo with every child collection eagerly loaded: steps ordered by
/// `order` ascending, comments by creation time ascending.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoDetail {
    pub memo: Memo,
    pub created_by: User,
    pub recipients: Vec<RecipientDetail>,
    pub steps: Vec<ApprovalStepDetail>,
    pub comments: Vec<Comment>,
}

/// Result of applying one approver's decision: the mutated step plus the
/// memo status the chain recomputation produced.
#[derive(Clone, Debug, PartialEq)]
pub struct StepDecisionOutcome {
    pub step: ApprovalStep,
    pub memo_status: MemoStatus,
    pub approved_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait MemoRepository: Send + Sync {
    async fn create(&self, new_memo: NewMemo) -> Result<Memo, RepositoryError>;
    async fn find_by_id(&self, id: &MemoId) -> Result<Option<MemoDetail>, RepositoryError>;
    async fn list(&self, filter: MemoFilter) -> Result<Vec<Memo>, RepositoryError>;
    /// Direct, unconditional status edit. Used for SENT/ARCHIVED transitions
    /// that bypass the approval chain.
    async fn set_status(&self, id: &MemoId, status: MemoStatus) -> Result<Memo, RepositoryError>;
}

#[async_trait]
pub trait ApprovalChainRepository: Send + Sync {
    /// Creates one PENDING step per entry and moves the memo to
    /// PENDING_APPROVAL, atomically. An empty list fails before any write.
    async fn attach(
        &self,
        memo_id: &MemoId,
        entries: &[ApproverEntry],
    ) -> Result<Vec<ApprovalStep>, RepositoryError>;

    async fn list_for_memo(
        &self,
        memo_id: &MemoId,
    ) -> Result<Vec<ApprovalStepDetail>, RepositoryError>;

    /// Applies a decision to a step and recomputes the owning memo's status
    /// in the same transaction. The owning memo is derived from the step row;
    /// a mismatched `memo_id` fails with NotFound.
    async fn decide(
        &self,
        memo_id: &MemoId,
        step_id: &ApprovalStepId,
        decision: ApprovalDecision,
        comments: Option<String>,
    ) -> Result<StepDecisionOutcome, RepositoryError>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Appends a comment after verifying both the author and the memo exist.
    /// Never touches the memo's status.
    async fn append(
        &self,
        memo_id: &MemoId,
        author_id: &UserId,
        new_comment: NewComment,
    ) -> Result<Comment, RepositoryError>;

    async fn list_for_memo(&self, memo_id: &MemoId) -> Result<Vec<Comment>, RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    /// Replaces (Some) or clears (None) the user's signature reference.
    async fn set_signature_ref(
        &self,
        id: &UserId,
        signature_ref: Option<String>,
    ) -> Result<User, RepositoryError>;
}
