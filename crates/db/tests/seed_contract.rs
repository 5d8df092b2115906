use serde::Deserialize;
use std::collections::HashSet;

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left, $right
            ));
        }
    };
}

#[derive(Debug, Deserialize)]
struct SeedMemoContract {
    memo_id: String,
    reference_number: String,
    status: String,
    step_count: u32,
    comment_count: u32,
    approved_at_set: bool,
    description: String,
}

#[derive(Debug, Deserialize)]
struct SequenceContract {
    year: i32,
    next_value: u32,
}

#[derive(Debug, Deserialize)]
struct SeedContract {
    dataset: String,
    memos: Vec<SeedMemoContract>,
    sequence: SequenceContract,
}

#[test]
fn seed_contract_matches_seed_sql_fixture() -> SeedContractTestResult {
    let fixture_sql = include_str!("../../../config/fixtures/seed_data.sql");
    let contract: SeedContract =
        serde_json::from_str(include_str!("../../../config/fixtures/seed_contract.json"))
            .map_err(|_| "seed contract JSON must parse".to_string())?;

    require_eq!(contract.dataset, "deterministic_memo_registry");
    require_eq!(contract.memos.len(), 3);

    let mut memo_ids_seen = HashSet::new();
    let mut statuses_seen = HashSet::new();

    for memo in &contract.memos {
        require!(
            memo_ids_seen.insert(memo.memo_id.clone()),
            "duplicate memo id: {}",
            memo.memo_id
        );
        statuses_seen.insert(memo.status.clone());

        require!(!memo.description.is_empty());
        require!(
            memo.reference_number.starts_with("MEM-2025-"),
            "reference `{}` should carry the MEM-<year>- prefix",
            memo.reference_number
        );
        require!(
            fixture_sql.contains(&format!("'{}'", memo.memo_id)),
            "seed SQL should include memo id {}",
            memo.memo_id
        );
        require!(
            fixture_sql.contains(&format!("'{}'", memo.reference_number)),
            "seed SQL should include reference {}",
            memo.reference_number
        );
        require!(
            fixture_sql.contains(&format!("'{}'", memo.status)),
            "seed SQL should include status {} for {}",
            memo.status,
            memo.memo_id
        );

        let step_rows = fixture_sql
            .lines()
            .filter(|line| {
                line.contains(&format!("'{}'", memo.memo_id)) && line.trim_start().starts_with("('step-")
            })
            .count();
        require_eq!(step_rows as u32, memo.step_count);

        let comment_rows = fixture_sql
            .lines()
            .filter(|line| {
                line.contains(&format!("'{}'", memo.memo_id)) && line.trim_start().starts_with("('cmnt-")
            })
            .count();
        require_eq!(comment_rows as u32, memo.comment_count);

        if memo.approved_at_set {
            require_eq!(memo.status.as_str(), "APPROVED");
        }
    }

    // The dataset covers the three chain lifecycles.
    for expected_status in ["APPROVED", "SENT", "PENDING_APPROVAL"] {
        require!(
            statuses_seen.contains(expected_status),
            "missing canonical seed status: {expected_status}"
        );
    }

    require!(
        fixture_sql.contains(&format!(
            "INSERT INTO memo_sequence (year, next_value) VALUES ({}, {})",
            contract.sequence.year, contract.sequence.next_value
        )),
        "seed SQL sequence row should match the contract"
    );
    require_eq!(contract.sequence.next_value, contract.memos.len() as u32);

    Ok(())
}
