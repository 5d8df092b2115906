use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use memoreg_core::domain::memo::DepartmentId;
use memoreg_core::domain::user::{Department, User, UserId};

use super::{RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Column list for a user row with its department joined. Shared by every
/// repository that resolves author/approver display fields at read time.
pub(crate) const USER_COLUMNS: &str = "u.id AS user_id, u.first_name, u.last_name, u.email, \
     u.role, u.signature_ref, u.created_at AS user_created_at, \
     d.id AS department_id, d.name AS department_name, d.code AS department_code";

pub(crate) const USER_JOIN: &str =
    "FROM app_user u LEFT JOIN department d ON d.id = u.department_id";

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn parse_optional_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|dt| dt.with_timezone(&Utc))
}

pub(crate) fn row_to_user(row: &SqliteRow) -> Result<User, RepositoryError> {
    let id: String = row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let first_name: String =
        row.try_get("first_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let last_name: String =
        row.try_get("last_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: String =
        row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role: String = row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let signature_ref: Option<String> =
        row.try_get("signature_ref").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("user_created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let department_id: Option<String> =
        row.try_get("department_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let department = match department_id {
        Some(dept_id) => {
            let name: String = row
                .try_get("department_name")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let code: String = row
                .try_get("department_code")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?;
            Some(Department { id: DepartmentId(dept_id), name, code })
        }
        None => None,
    };

    Ok(User {
        id: UserId(id),
        first_name,
        last_name,
        email,
        role,
        department,
        signature_ref,
        created_at: parse_timestamp(&created_at_str),
    })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} {USER_JOIN} WHERE u.id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_user(r)?)),
            None => Ok(None),
        }
    }

    async fn set_signature_ref(
        &self,
        id: &UserId,
        signature_ref: Option<String>,
    ) -> Result<User, RepositoryError> {
        let updated = sqlx::query("UPDATE app_user SET signature_ref = ? WHERE id = ?")
            .bind(&signature_ref)
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::not_found("user", id.0.clone()));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("user", id.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use memoreg_core::domain::user::UserId;

    use super::SqlUserRepository;
    use crate::repositories::testsupport::{insert_department, insert_user, setup};
    use crate::repositories::UserRepository;

    #[tokio::test]
    async fn find_by_id_resolves_department() {
        let pool = setup().await;
        insert_department(&pool, "dept-fin", "Finance", "FIN").await;
        insert_user(&pool, "user-1", "Amina", "Bello", Some("dept-fin"), None).await;

        let repo = SqlUserRepository::new(pool);
        let user = repo
            .find_by_id(&UserId("user-1".to_string()))
            .await
            .expect("find")
            .expect("should exist");

        assert_eq!(user.display_name(), "Amina Bello");
        assert_eq!(user.department_name(), "Finance");
        assert!(user.signature_ref.is_none());
    }

    #[tokio::test]
    async fn missing_user_resolves_to_none() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        let found = repo.find_by_id(&UserId("ghost".to_string())).await.expect("query");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn signature_ref_replace_and_clear() {
        let pool = setup().await;
        insert_user(&pool, "user-1", "Tunde", "Okafor", None, None).await;

        let repo = SqlUserRepository::new(pool);
        let id = UserId("user-1".to_string());

        let user = repo
            .set_signature_ref(&id, Some("signatures/user-1.png".to_string()))
            .await
            .expect("replace");
        assert_eq!(user.signature_ref.as_deref(), Some("signatures/user-1.png"));

        let user = repo.set_signature_ref(&id, None).await.expect("clear");
        assert!(user.signature_ref.is_none());
    }

    #[tokio::test]
    async fn signature_update_for_missing_user_is_not_found() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        let error = repo
            .set_signature_ref(&UserId("ghost".to_string()), None)
            .await
            .expect_err("should fail");
        assert!(matches!(
            error,
            crate::repositories::RepositoryError::Domain(
                memoreg_core::errors::DomainError::NotFound { .. }
            )
        ));
    }
}
