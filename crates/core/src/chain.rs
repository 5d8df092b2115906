//! Pure evaluation of a memo's approval chain.
//!
//! The chain is an ordered set of approval steps; the memo status is a pure
//! function of their statuses. Rejection by any single step rejects the whole
//! memo immediately, regardless of the other steps. Otherwise the memo
//! completes once every step is APPROVED or SKIPPED (SKIPPED passes through).
//! Anything else leaves the memo awaiting approval.
//!
//! Persistence applies these outcomes inside a single transaction; this
//! module never touches storage.

use serde::{Deserialize, Serialize};

use crate::domain::approval::{ApprovalStep, ApprovalStepStatus};

/// Result of folding a memo's full step collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainOutcome {
    /// At least one step is REJECTED. Short-circuits everything else.
    Rejected,
    /// Every step is APPROVED or SKIPPED.
    Completed,
    /// At least one step is still PENDING and none is REJECTED.
    InProgress,
}

/// Folds the step collection into a chain outcome.
///
/// An empty collection evaluates to `InProgress`: a memo with no steps has
/// nothing to complete, and attaching approvers is what moves it into the
/// chain lifecycle in the first place.
pub fn evaluate_chain(steps: &[ApprovalStep]) -> ChainOutcome {
    if steps.iter().any(|step| step.status == ApprovalStepStatus::Rejected) {
        return ChainOutcome::Rejected;
    }

    if !steps.is_empty()
        && steps.iter().all(|step| {
            matches!(step.status, ApprovalStepStatus::Approved | ApprovalStepStatus::Skipped)
        })
    {
        return ChainOutcome::Completed;
    }

    ChainOutcome::InProgress
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::approval::{ApprovalStep, ApprovalStepId, ApprovalStepStatus};
    use crate::domain::memo::MemoId;
    use crate::domain::user::UserId;

    use super::{evaluate_chain, ChainOutcome};

    fn step(id: &str, order: i64, status: ApprovalStepStatus) -> ApprovalStep {
        ApprovalStep {
            id: ApprovalStepId(id.to_string()),
            memo_id: MemoId("memo-1".to_string()),
            approver_id: UserId(format!("user-{order}")),
            order,
            status,
            comments: None,
            decided_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn all_pending_chain_is_in_progress() {
        let steps = vec![
            step("s1", 1, ApprovalStepStatus::Pending),
            step("s2", 2, ApprovalStepStatus::Pending),
        ];
        assert_eq!(evaluate_chain(&steps), ChainOutcome::InProgress);
    }

    #[test]
    fn partially_decided_chain_is_in_progress() {
        let steps = vec![
            step("s1", 1, ApprovalStepStatus::Approved),
            step("s2", 2, ApprovalStepStatus::Pending),
        ];
        assert_eq!(evaluate_chain(&steps), ChainOutcome::InProgress);
    }

    #[test]
    fn all_approved_chain_completes() {
        let steps = vec![
            step("s1", 1, ApprovalStepStatus::Approved),
            step("s2", 2, ApprovalStepStatus::Approved),
        ];
        assert_eq!(evaluate_chain(&steps), ChainOutcome::Completed);
    }

    #[test]
    fn skipped_steps_pass_through_to_completion() {
        let steps = vec![
            step("s1", 1, ApprovalStepStatus::Approved),
            step("s2", 2, ApprovalStepStatus::Skipped),
            step("s3", 3, ApprovalStepStatus::Approved),
        ];
        assert_eq!(evaluate_chain(&steps), ChainOutcome::Completed);
    }

    #[test]
    fn all_skipped_chain_completes() {
        let steps = vec![
            step("s1", 1, ApprovalStepStatus::Skipped),
            step("s2", 2, ApprovalStepStatus::Skipped),
        ];
        assert_eq!(evaluate_chain(&steps), ChainOutcome::Completed);
    }

    #[test]
    fn single_rejection_rejects_regardless_of_other_steps() {
        // Three-step chain: first approved, second rejected, third pending.
        let steps = vec![
            step("s1", 1, ApprovalStepStatus::Approved),
            step("s2", 2, ApprovalStepStatus::Rejected),
            step("s3", 3, ApprovalStepStatus::Pending),
        ];
        assert_eq!(evaluate_chain(&steps), ChainOutcome::Rejected);
    }

    #[test]
    fn rejection_wins_even_when_every_other_step_completed() {
        let steps = vec![
            step("s1", 1, ApprovalStepStatus::Approved),
            step("s2", 2, ApprovalStepStatus::Skipped),
            step("s3", 3, ApprovalStepStatus::Rejected),
        ];
        assert_eq!(evaluate_chain(&steps), ChainOutcome::Rejected);
    }

    #[test]
    fn empty_chain_is_in_progress() {
        assert_eq!(evaluate_chain(&[]), ChainOutcome::InProgress);
    }
}
