use chrono::Utc;
use uuid::Uuid;

use memoreg_core::domain::comment::{Comment, NewComment};
use memoreg_core::domain::memo::MemoId;
use memoreg_core::domain::user::UserId;

use super::memo::row_to_comment;
use super::user::USER_COLUMNS;
use super::{CommentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCommentRepository {
    pool: DbPool,
}

impl SqlCommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_one(&self, comment_id: &str) -> Result<Comment, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT c.id AS comment_id, c.memo_id, c.comment, c.created_at AS comment_created_at,
                    {USER_COLUMNS}
             FROM memo_comment c
             JOIN app_user u ON u.id = c.author_id
             LEFT JOIN department d ON d.id = u.department_id
             WHERE c.id = ?",
        ))
        .bind(comment_id)
        .fetch_one(&self.pool)
        .await?;

        row_to_comment(&row)
    }
}

#[async_trait::async_trait]
impl CommentRepository for SqlCommentRepository {
    async fn append(
        &self,
        memo_id: &MemoId,
        author_id: &UserId,
        new_comment: NewComment,
    ) -> Result<Comment, RepositoryError> {
        new_comment.validate()?;

        let author_exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM app_user WHERE id = ?)")
                .bind(&author_id.0)
                .fetch_one(&self.pool)
                .await?;
        if author_exists == 0 {
            return Err(RepositoryError::not_found("user", author_id.0.clone()));
        }

        let memo_exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM memo WHERE id = ?)")
            .bind(&memo_id.0)
            .fetch_one(&self.pool)
            .await?;
        if memo_exists == 0 {
            return Err(RepositoryError::not_found("memo", memo_id.0.clone()));
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO memo_comment (id, memo_id, author_id, comment, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&memo_id.0)
        .bind(&author_id.0)
        .bind(&new_comment.text)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.fetch_one(&id).await
    }

    async fn list_for_memo(&self, memo_id: &MemoId) -> Result<Vec<Comment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT c.id AS comment_id, c.memo_id, c.comment, c.created_at AS comment_created_at,
                    {USER_COLUMNS}
             FROM memo_comment c
             JOIN app_user u ON u.id = c.author_id
             LEFT JOIN department d ON d.id = u.department_id
             WHERE c.memo_id = ?
             ORDER BY c.created_at ASC",
        ))
        .bind(&memo_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_comment).collect()
    }
}
