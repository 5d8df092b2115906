use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::memo::MemoId;
use crate::domain::user::UserId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalStepId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStepStatus {
    Pending,
    Approved,
    Rejected,
    Skipped,
}

impl ApprovalStepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Skipped => "SKIPPED",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "SKIPPED" => Ok(Self::Skipped),
            other => Err(DomainError::InvalidInput(format!(
                "unknown approval step status `{other}`"
            ))),
        }
    }
}

/// The action an approver may take on their step. PENDING is not a decision,
/// so this is deliberately narrower than [`ApprovalStepStatus`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalDecision {
    Approved,
    Rejected,
    Skipped,
}

impl ApprovalDecision {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "SKIPPED" => Ok(Self::Skipped),
            other => Err(DomainError::InvalidInput(format!(
                "invalid decision `{other}` (expected APPROVED, REJECTED, or SKIPPED)"
            ))),
        }
    }

    pub fn as_step_status(&self) -> ApprovalStepStatus {
        match self {
            Self::Approved => ApprovalStepStatus::Approved,
            Self::Rejected => ApprovalStepStatus::Rejected,
            Self::Skipped => ApprovalStepStatus::Skipped,
        }
    }
}

/// One approver's slot in a memo's sign-off chain. `order` defines display
/// sequence; it does not gate who may act first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub id: ApprovalStepId,
    pub memo_id: MemoId,
    pub approver_id: UserId,
    pub order: i64,
    pub status: ApprovalStepStatus,
    pub comments: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One entry of an attach-approvers request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverEntry {
    pub approver_id: UserId,
    pub order: i64,
}

/// Validates an attach-approvers request before any step is created.
pub fn validate_approver_entries(entries: &[ApproverEntry]) -> Result<(), DomainError> {
    if entries.is_empty() {
        return Err(DomainError::InvalidInput("approvers list must not be empty".to_string()));
    }
    for entry in entries {
        if entry.approver_id.0.trim().is_empty() {
            return Err(DomainError::InvalidInput("approver id must not be empty".to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::domain::user::UserId;

    use super::{validate_approver_entries, ApprovalDecision, ApprovalStepStatus, ApproverEntry};

    #[test]
    fn decision_accepts_exactly_the_three_allowed_values() {
        assert_eq!(
            ApprovalDecision::parse("APPROVED").expect("approved"),
            ApprovalDecision::Approved
        );
        assert_eq!(
            ApprovalDecision::parse("REJECTED").expect("rejected"),
            ApprovalDecision::Rejected
        );
        assert_eq!(
            ApprovalDecision::parse("SKIPPED").expect("skipped"),
            ApprovalDecision::Skipped
        );
    }

    #[test]
    fn decision_rejects_values_outside_the_enum() {
        assert!(ApprovalDecision::parse("MAYBE").is_err());
        assert!(ApprovalDecision::parse("PENDING").is_err());
        assert!(ApprovalDecision::parse("approved").is_err());
    }

    #[test]
    fn decision_maps_onto_step_status() {
        assert_eq!(ApprovalDecision::Skipped.as_step_status(), ApprovalStepStatus::Skipped);
    }

    #[test]
    fn empty_approver_list_is_invalid() {
        assert!(validate_approver_entries(&[]).is_err());
    }

    #[test]
    fn blank_approver_id_is_invalid() {
        let entries = vec![ApproverEntry { approver_id: UserId("  ".to_string()), order: 1 }];
        assert!(validate_approver_entries(&entries).is_err());
    }

    #[test]
    fn well_formed_entries_pass() {
        let entries = vec![
            ApproverEntry { approver_id: UserId("user-a".to_string()), order: 1 },
            ApproverEntry { approver_id: UserId("user-b".to_string()), order: 2 },
        ];
        assert!(validate_approver_entries(&entries).is_ok());
    }
}
