use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use memoreg_core::chain::{evaluate_chain, ChainOutcome};
use memoreg_core::domain::approval::{
    validate_approver_entries, ApprovalDecision, ApprovalStep, ApprovalStepId, ApprovalStepStatus,
    ApproverEntry,
};
use memoreg_core::domain::memo::{MemoId, MemoStatus};
use memoreg_core::domain::user::UserId;

use super::user::{parse_optional_timestamp, parse_timestamp, row_to_user, USER_COLUMNS};
use super::{ApprovalChainRepository, ApprovalStepDetail, RepositoryError, StepDecisionOutcome};
use crate::DbPool;

pub struct SqlApprovalChainRepository {
    pool: DbPool,
}

impl SqlApprovalChainRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const STEP_COLUMNS: &str = "a.id AS step_id, a.memo_id, a.approver_id, a.step_order, \
     a.status AS step_status, a.comments, a.decided_at, a.created_at AS step_created_at";

fn row_to_step(row: &SqliteRow) -> Result<ApprovalStep, RepositoryError> {
    let id: String = row.try_get("step_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let memo_id: String =
        row.try_get("memo_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_id: String =
        row.try_get("approver_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let order: i64 =
        row.try_get("step_order").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("step_status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comments: Option<String> =
        row.try_get("comments").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let decided_at: Option<String> =
        row.try_get("decided_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("step_created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ApprovalStep {
        id: ApprovalStepId(id),
        memo_id: MemoId(memo_id),
        approver_id: UserId(approver_id),
        order,
        status: ApprovalStepStatus::parse(&status)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        comments,
        decided_at: parse_optional_timestamp(decided_at),
        created_at: parse_timestamp(&created_at),
    })
}

/// Loads a memo's full chain with approver display fields, ordered by
/// `order` ascending. Shared with the memo detail fetch.
pub(crate) async fn fetch_step_details(
    pool: &DbPool,
    memo_id: &MemoId,
) -> Result<Vec<ApprovalStepDetail>, RepositoryError> {
    let rows = sqlx::query(&format!(
        "SELECT {STEP_COLUMNS}, {USER_COLUMNS}
         FROM memo_approval a
         JOIN app_user u ON u.id = a.approver_id
         LEFT JOIN department d ON d.id = u.department_id
         WHERE a.memo_id = ?
         ORDER BY a.step_order ASC, a.created_at ASC",
    ))
    .bind(&memo_id.0)
    .fetch_all(pool)
    .await?;

    let mut details = Vec::with_capacity(rows.len());
    for row in &rows {
        details.push(ApprovalStepDetail { step: row_to_step(row)?, approver: row_to_user(row)? });
    }
    Ok(details)
}

#[async_trait::async_trait]
impl ApprovalChainRepository for SqlApprovalChainRepository {
    async fn attach(
        &self,
        memo_id: &MemoId,
        entries: &[ApproverEntry],
    ) -> Result<Vec<ApprovalStep>, RepositoryError> {
        validate_approver_entries(entries)?;

        let mut tx = self.pool.begin().await?;

        let memo_exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM memo WHERE id = ?)")
            .bind(&memo_id.0)
            .fetch_one(&mut *tx)
            .await?;
        if memo_exists == 0 {
            return Err(RepositoryError::not_found("memo", memo_id.0.clone()));
        }

        for entry in entries {
            let approver_exists: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM app_user WHERE id = ?)")
                    .bind(&entry.approver_id.0)
                    .fetch_one(&mut *tx)
                    .await?;
            if approver_exists == 0 {
                return Err(RepositoryError::not_found("user", entry.approver_id.0.clone()));
            }
        }

        let now = Utc::now();
        let mut steps = Vec::with_capacity(entries.len());
        for entry in entries {
            let step = ApprovalStep {
                id: ApprovalStepId(Uuid::new_v4().to_string()),
                memo_id: memo_id.clone(),
                approver_id: entry.approver_id.clone(),
                order: entry.order,
                status: ApprovalStepStatus::Pending,
                comments: None,
                decided_at: None,
                created_at: now,
            };

            sqlx::query(
                "INSERT INTO memo_approval (id, memo_id, approver_id, step_order, status,
                                            comments, decided_at, created_at)
                 VALUES (?, ?, ?, ?, ?, NULL, NULL, ?)",
            )
            .bind(&step.id.0)
            .bind(&step.memo_id.0)
            .bind(&step.approver_id.0)
            .bind(step.order)
            .bind(step.status.as_str())
            .bind(now.to_rfc3339())
            .execute(&mut *tx)
            .await?;

            steps.push(step);
        }

        // Unconditional, as the source behaves: re-attachment appends a
        // second chain and resets the memo to awaiting approval.
        sqlx::query("UPDATE memo SET status = ?, updated_at = ? WHERE id = ?")
            .bind(MemoStatus::PendingApproval.as_str())
            .bind(now.to_rfc3339())
            .bind(&memo_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(steps)
    }

    async fn list_for_memo(
        &self,
        memo_id: &MemoId,
    ) -> Result<Vec<ApprovalStepDetail>, RepositoryError> {
        let memo_exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM memo WHERE id = ?)")
            .bind(&memo_id.0)
            .fetch_one(&self.pool)
            .await?;
        if memo_exists == 0 {
            return Err(RepositoryError::not_found("memo", memo_id.0.clone()));
        }

        fetch_step_details(&self.pool, memo_id).await
    }

    async fn decide(
        &self,
        memo_id: &MemoId,
        step_id: &ApprovalStepId,
        decision: ApprovalDecision,
        comments: Option<String>,
    ) -> Result<StepDecisionOutcome, RepositoryError> {
        // Step update and memo recomputation share one transaction; two
        // approvers deciding concurrently serialize on the memo row instead
        // of losing an update.
        let mut tx = self.pool.begin().await?;

        let step_row = sqlx::query(&format!(
            "SELECT {STEP_COLUMNS} FROM memo_approval a WHERE a.id = ?",
        ))
        .bind(&step_id.0)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(step_row) = step_row else {
            return Err(RepositoryError::not_found("approval step", step_id.0.clone()));
        };
        let mut step = row_to_step(&step_row)?;

        // The owning memo comes from the step row itself. A caller-supplied
        // memo id that names a different memo is rejected rather than
        // silently acting on the real owner.
        if step.memo_id != *memo_id {
            return Err(RepositoryError::not_found("approval step", step_id.0.clone()));
        }

        let now = Utc::now();
        let decided_at = matches!(decision, ApprovalDecision::Approved).then_some(now);

        sqlx::query(
            "UPDATE memo_approval
             SET status = ?, comments = COALESCE(?, comments), decided_at = ?
             WHERE id = ?",
        )
        .bind(decision.as_step_status().as_str())
        .bind(&comments)
        .bind(decided_at.map(|dt| dt.to_rfc3339()))
        .bind(&step_id.0)
        .execute(&mut *tx)
        .await?;

        step.status = decision.as_step_status();
        if let Some(text) = comments {
            step.comments = Some(text);
        }
        step.decided_at = decided_at;

        let chain_rows = sqlx::query(&format!(
            "SELECT {STEP_COLUMNS} FROM memo_approval a
             WHERE a.memo_id = ?
             ORDER BY a.step_order ASC, a.created_at ASC",
        ))
        .bind(&step.memo_id.0)
        .fetch_all(&mut *tx)
        .await?;

        let mut chain = Vec::with_capacity(chain_rows.len());
        for row in &chain_rows {
            chain.push(row_to_step(row)?);
        }

        let (memo_status, approved_at) = match evaluate_chain(&chain) {
            ChainOutcome::Rejected => {
                sqlx::query("UPDATE memo SET status = ?, updated_at = ? WHERE id = ?")
                    .bind(MemoStatus::Rejected.as_str())
                    .bind(now.to_rfc3339())
                    .bind(&step.memo_id.0)
                    .execute(&mut *tx)
                    .await?;
                (MemoStatus::Rejected, None)
            }
            ChainOutcome::Completed => {
                // approved_at is set exactly once; a chain re-attached and
                // completed again keeps the original timestamp.
                sqlx::query(
                    "UPDATE memo
                     SET status = ?, approved_at = COALESCE(approved_at, ?), updated_at = ?
                     WHERE id = ?",
                )
                .bind(MemoStatus::Approved.as_str())
                .bind(now.to_rfc3339())
                .bind(now.to_rfc3339())
                .bind(&step.memo_id.0)
                .execute(&mut *tx)
                .await?;

                let approved_at: Option<String> =
                    sqlx::query_scalar("SELECT approved_at FROM memo WHERE id = ?")
                        .bind(&step.memo_id.0)
                        .fetch_one(&mut *tx)
                        .await?;
                (MemoStatus::Approved, parse_optional_timestamp(approved_at))
            }
            ChainOutcome::InProgress => {
                let status: String = sqlx::query_scalar("SELECT status FROM memo WHERE id = ?")
                    .bind(&step.memo_id.0)
                    .fetch_one(&mut *tx)
                    .await?;
                (
                    MemoStatus::parse(&status)
                        .map_err(|e| RepositoryError::Decode(e.to_string()))?,
                    None,
                )
            }
        };

        tx.commit().await?;

        Ok(StepDecisionOutcome { step, memo_status, approved_at })
    }
}
