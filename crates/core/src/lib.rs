pub mod chain;
pub mod config;
pub mod domain;
pub mod errors;
pub mod reference;

pub use chain::{evaluate_chain, ChainOutcome};
pub use domain::approval::{
    validate_approver_entries, ApprovalDecision, ApprovalStep, ApprovalStepId, ApprovalStepStatus,
    ApproverEntry,
};
pub use domain::comment::{Comment, CommentId, NewComment};
pub use domain::memo::{DepartmentId, Memo, MemoId, MemoPriority, MemoStatus, MemoType, NewMemo};
pub use domain::user::{Department, User, UserId};
pub use errors::DomainError;
pub use reference::{format_reference, parse_reference};
