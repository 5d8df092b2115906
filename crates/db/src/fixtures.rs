use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical seed memos and the checks `verify` runs against them.
const SEED_MEMOS: &[SeedMemoContract] = &[
    SeedMemoContract {
        memo_id: "memo-budget-001",
        reference_number: "MEM-2025-001",
        status: "APPROVED",
        step_count: 2,
        comment_count: 1,
        approved_at_set: true,
        description: "Budget memo with a fully approved two-step chain",
    },
    SeedMemoContract {
        memo_id: "memo-circular-001",
        reference_number: "MEM-2025-002",
        status: "SENT",
        step_count: 0,
        comment_count: 0,
        approved_at_set: false,
        description: "Circular dispatched without an approval chain",
    },
    SeedMemoContract {
        memo_id: "memo-audit-001",
        reference_number: "MEM-2025-003",
        status: "PENDING_APPROVAL",
        step_count: 2,
        comment_count: 1,
        approved_at_set: false,
        description: "Audit letter mid-chain: step 1 approved, step 2 pending",
    },
];

const SEED_SEQUENCE: (i64, i64) = (2025, 3);

struct SeedMemoContract {
    memo_id: &'static str,
    reference_number: &'static str,
    status: &'static str,
    step_count: i64,
    comment_count: i64,
    approved_at_set: bool,
    description: &'static str,
}

/// Deterministic fixtures covering the three chain lifecycles: fully
/// approved, no chain, and mid-approval. Replaces the original one-time
/// HTTP setup endpoint with an operator-invoked load.
pub struct SeedDataset;

#[derive(Debug)]
pub struct MemoSeedInfo {
    pub memo_id: &'static str,
    pub reference_number: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct SeedResult {
    pub memos_seeded: Vec<MemoSeedInfo>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

impl SeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    /// Loads the dataset in one transaction.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let memos_seeded = SEED_MEMOS
            .iter()
            .map(|memo| MemoSeedInfo {
                memo_id: memo.memo_id,
                reference_number: memo.reference_number,
                description: memo.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { memos_seeded })
    }

    /// Verifies the loaded rows against the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for memo in SEED_MEMOS {
            let memo_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM memo
                 WHERE id = ?1 AND reference_number = ?2 AND status = ?3
                   AND (approved_at IS NOT NULL) = ?4)",
            )
            .bind(memo.memo_id)
            .bind(memo.reference_number)
            .bind(memo.status)
            .bind(memo.approved_at_set)
            .fetch_one(pool)
            .await?;
            checks.push((memo.memo_id, memo_ok == 1));

            let step_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM memo_approval WHERE memo_id = ?1")
                    .bind(memo.memo_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((memo.reference_number, step_count == memo.step_count));

            let comment_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM memo_comment WHERE memo_id = ?1")
                    .bind(memo.memo_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((memo.description, comment_count == memo.comment_count));
        }

        let sequence_ok: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM memo_sequence WHERE year = ?1 AND next_value = ?2)",
        )
        .bind(SEED_SEQUENCE.0)
        .bind(SEED_SEQUENCE.1)
        .fetch_one(pool)
        .await?;
        checks.push(("memo-sequence", sequence_ok == 1));

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }
}

#[cfg(test)]
mod tests {
    use crate::{connect_with_settings, migrations};

    use super::SeedDataset;

    #[tokio::test]
    async fn seed_loads_and_verifies_against_contract() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let result = SeedDataset::load(&pool).await.expect("seed load");
        assert_eq!(result.memos_seeded.len(), 3);

        let verification = SeedDataset::verify(&pool).await.expect("verify");
        let failed: Vec<&str> = verification
            .checks
            .iter()
            .filter_map(|(check, passed)| (!passed).then_some(*check))
            .collect();
        assert!(verification.all_present, "failed seed checks: {}", failed.join(", "));
    }

    #[tokio::test]
    async fn seeded_sequence_continues_after_the_last_fixture_memo() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SeedDataset::load(&pool).await.expect("seed load");

        let next: i64 = sqlx::query_scalar(
            "INSERT INTO memo_sequence (year, next_value) VALUES (2025, 1)
             ON CONFLICT(year) DO UPDATE SET next_value = next_value + 1
             RETURNING next_value",
        )
        .fetch_one(&pool)
        .await
        .expect("bump sequence");

        // MEM-2025-003 is seeded, so the next allocation is 004.
        assert_eq!(next, 4);

        // A fresh year starts its own counter at 1.
        let next_year: i64 = sqlx::query_scalar(
            "INSERT INTO memo_sequence (year, next_value) VALUES (2026, 1)
             ON CONFLICT(year) DO UPDATE SET next_value = next_value + 1
             RETURNING next_value",
        )
        .fetch_one(&pool)
        .await
        .expect("bump fresh-year sequence");
        assert_eq!(next_year, 1);
    }
}
