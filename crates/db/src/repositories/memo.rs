use chrono::{Datelike, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use memoreg_core::domain::comment::{Comment, CommentId};
use memoreg_core::domain::memo::{
    DepartmentId, Memo, MemoId, MemoPriority, MemoStatus, MemoType, NewMemo,
};
use memoreg_core::domain::user::UserId;
use memoreg_core::reference::format_reference;

use super::user::{parse_optional_timestamp, parse_timestamp, row_to_user, USER_COLUMNS, USER_JOIN};
use super::{MemoDetail, MemoFilter, MemoRepository, RecipientDetail, RepositoryError};
use crate::DbPool;

pub struct SqlMemoRepository {
    pool: DbPool,
}

impl SqlMemoRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const MEMO_COLUMNS: &str = "id, reference_number, subject, body, memo_type, priority, status, \
     department_id, created_by, created_at, updated_at, approved_at";

pub(crate) fn row_to_memo(row: &SqliteRow) -> Result<Memo, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let reference_number: String =
        row.try_get("reference_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let subject: String =
        row.try_get("subject").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let body: String = row.try_get("body").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let memo_type: String =
        row.try_get("memo_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let priority: String =
        row.try_get("priority").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let department_id: Option<String> =
        row.try_get("department_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_by: String =
        row.try_get("created_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approved_at: Option<String> =
        row.try_get("approved_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Memo {
        id: MemoId(id),
        reference_number,
        subject,
        body,
        memo_type: MemoType::parse(&memo_type).map_err(|e| RepositoryError::Decode(e.to_string()))?,
        priority: MemoPriority::parse(&priority)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        status: MemoStatus::parse(&status).map_err(|e| RepositoryError::Decode(e.to_string()))?,
        department_id: department_id.map(DepartmentId),
        created_by: UserId(created_by),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
        approved_at: parse_optional_timestamp(approved_at),
    })
}

#[async_trait::async_trait]
impl MemoRepository for SqlMemoRepository {
    async fn create(&self, new_memo: NewMemo) -> Result<Memo, RepositoryError> {
        new_memo.validate()?;

        let mut tx = self.pool.begin().await?;

        let creator_exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM app_user WHERE id = ?)")
                .bind(&new_memo.created_by.0)
                .fetch_one(&mut *tx)
                .await?;
        if creator_exists == 0 {
            return Err(RepositoryError::not_found("user", new_memo.created_by.0.clone()));
        }

        for recipient in &new_memo.recipient_ids {
            let exists: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM app_user WHERE id = ?)")
                    .bind(&recipient.0)
                    .fetch_one(&mut *tx)
                    .await?;
            if exists == 0 {
                return Err(RepositoryError::not_found("user", recipient.0.clone()));
            }
        }

        let now = Utc::now();
        let year = now.year();

        // Per-year counter bumped in the same transaction as the insert, so
        // two concurrent creates cannot observe the same sequence.
        let sequence: i64 = sqlx::query_scalar(
            "INSERT INTO memo_sequence (year, next_value) VALUES (?1, 1)
             ON CONFLICT(year) DO UPDATE SET next_value = next_value + 1
             RETURNING next_value",
        )
        .bind(year)
        .fetch_one(&mut *tx)
        .await?;

        let memo = Memo {
            id: MemoId(Uuid::new_v4().to_string()),
            reference_number: format_reference(year, sequence as u32),
            subject: new_memo.subject,
            body: new_memo.body,
            memo_type: new_memo.memo_type,
            priority: new_memo.priority,
            status: MemoStatus::Draft,
            department_id: new_memo.department_id,
            created_by: new_memo.created_by,
            created_at: now,
            updated_at: now,
            approved_at: None,
        };

        sqlx::query(
            "INSERT INTO memo (id, reference_number, subject, body, memo_type, priority, status,
                               department_id, created_by, created_at, updated_at, approved_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)",
        )
        .bind(&memo.id.0)
        .bind(&memo.reference_number)
        .bind(&memo.subject)
        .bind(&memo.body)
        .bind(memo.memo_type.as_str())
        .bind(memo.priority.as_str())
        .bind(memo.status.as_str())
        .bind(memo.department_id.as_ref().map(|d| d.0.as_str()))
        .bind(&memo.created_by.0)
        .bind(memo.created_at.to_rfc3339())
        .bind(memo.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for recipient in &new_memo.recipient_ids {
            sqlx::query(
                "INSERT INTO memo_recipient (id, memo_id, user_id, added_at) VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&memo.id.0)
            .bind(&recipient.0)
            .bind(now.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(memo)
    }

    async fn find_by_id(&self, id: &MemoId) -> Result<Option<MemoDetail>, RepositoryError> {
        let memo_row = sqlx::query(&format!("SELECT {MEMO_COLUMNS} FROM memo WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(memo_row) = memo_row else {
            return Ok(None);
        };
        let memo = row_to_memo(&memo_row)?;

        let creator_row =
            sqlx::query(&format!("SELECT {USER_COLUMNS} {USER_JOIN} WHERE u.id = ?"))
                .bind(&memo.created_by.0)
                .fetch_one(&self.pool)
                .await?;
        let created_by = row_to_user(&creator_row)?;

        let recipient_rows = sqlx::query(&format!(
            "SELECT r.added_at AS recipient_added_at, {USER_COLUMNS}
             FROM memo_recipient r
             JOIN app_user u ON u.id = r.user_id
             LEFT JOIN department d ON d.id = u.department_id
             WHERE r.memo_id = ?
             ORDER BY r.added_at ASC",
        ))
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut recipients = Vec::with_capacity(recipient_rows.len());
        for row in &recipient_rows {
            let added_at: String = row
                .try_get("recipient_added_at")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?;
            recipients.push(RecipientDetail {
                user: row_to_user(row)?,
                added_at: parse_timestamp(&added_at),
            });
        }

        let steps = super::approval::fetch_step_details(&self.pool, id).await?;

        let comment_rows = sqlx::query(&format!(
            "SELECT c.id AS comment_id, c.memo_id, c.comment, c.created_at AS comment_created_at,
                    {USER_COLUMNS}
             FROM memo_comment c
             JOIN app_user u ON u.id = c.author_id
             LEFT JOIN department d ON d.id = u.department_id
             WHERE c.memo_id = ?
             ORDER BY c.created_at ASC",
        ))
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut comments = Vec::with_capacity(comment_rows.len());
        for row in &comment_rows {
            comments.push(row_to_comment(row)?);
        }

        Ok(Some(MemoDetail { memo, created_by, recipients, steps, comments }))
    }

    async fn list(&self, filter: MemoFilter) -> Result<Vec<Memo>, RepositoryError> {
        let mut builder = QueryBuilder::new(format!("SELECT {MEMO_COLUMNS} FROM memo"));
        let mut has_where = false;

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            builder.push(" WHERE (subject LIKE ");
            builder.push_bind(format!("%{search}%"));
            builder.push(" OR reference_number LIKE ");
            builder.push_bind(format!("%{search}%"));
            builder.push(")");
            has_where = true;
        }

        if let Some(memo_type) = filter.memo_type {
            builder.push(if has_where { " AND memo_type = " } else { " WHERE memo_type = " });
            builder.push_bind(memo_type.as_str());
            has_where = true;
        }

        if let Some(status) = filter.status {
            builder.push(if has_where { " AND status = " } else { " WHERE status = " });
            builder.push_bind(status.as_str());
        }

        builder.push(" ORDER BY created_at DESC");

        let rows: Vec<SqliteRow> = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_memo).collect()
    }

    async fn set_status(&self, id: &MemoId, status: MemoStatus) -> Result<Memo, RepositoryError> {
        let updated = sqlx::query("UPDATE memo SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::not_found("memo", id.0.clone()));
        }

        let row = sqlx::query(&format!("SELECT {MEMO_COLUMNS} FROM memo WHERE id = ?"))
            .bind(&id.0)
            .fetch_one(&self.pool)
            .await?;
        row_to_memo(&row)
    }
}

pub(crate) fn row_to_comment(row: &SqliteRow) -> Result<Comment, RepositoryError> {
    let id: String =
        row.try_get("comment_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let memo_id: String =
        row.try_get("memo_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let text: String =
        row.try_get("comment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("comment_created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Comment {
        id: CommentId(id),
        memo_id: MemoId(memo_id),
        author: row_to_user(row)?,
        text,
        created_at: parse_timestamp(&created_at),
    })
}
