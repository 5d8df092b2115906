use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::memo::DepartmentId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub code: String,
}

/// A registry user as the core needs it: display fields plus the signature
/// reference resolved at render time. `signature_ref` is an absolute URL or a
/// local path; a user has at most one active signature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub department: Option<Department>,
    pub signature_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn department_name(&self) -> &str {
        self.department.as_ref().map(|d| d.name.as_str()).unwrap_or("N/A")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::memo::DepartmentId;

    use super::{Department, User, UserId};

    #[test]
    fn display_name_joins_first_and_last() {
        let user = User {
            id: UserId("user-1".to_string()),
            first_name: "Amina".to_string(),
            last_name: "Bello".to_string(),
            email: "amina.bello@example.com".to_string(),
            role: "DEPARTMENT_HEAD".to_string(),
            department: Some(Department {
                id: DepartmentId("dept-fin".to_string()),
                name: "Finance".to_string(),
                code: "FIN".to_string(),
            }),
            signature_ref: None,
            created_at: Utc::now(),
        };

        assert_eq!(user.display_name(), "Amina Bello");
        assert_eq!(user.department_name(), "Finance");
    }

    #[test]
    fn missing_department_renders_as_na() {
        let user = User {
            id: UserId("user-2".to_string()),
            first_name: "Tunde".to_string(),
            last_name: "Okafor".to_string(),
            email: "tunde.okafor@example.com".to_string(),
            role: "STAFF".to_string(),
            department: None,
            signature_ref: Some("/signatures/tunde.png".to_string()),
            created_at: Utc::now(),
        };

        assert_eq!(user.department_name(), "N/A");
    }
}
