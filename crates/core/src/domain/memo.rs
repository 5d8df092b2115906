use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepartmentId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoType {
    Approval,
    ExternalLetter,
    AuditLetter,
    Internal,
    Circular,
}

impl MemoType {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "APPROVAL" => Ok(Self::Approval),
            "EXTERNAL_LETTER" => Ok(Self::ExternalLetter),
            "AUDIT_LETTER" => Ok(Self::AuditLetter),
            "INTERNAL" => Ok(Self::Internal),
            "CIRCULAR" => Ok(Self::Circular),
            other => Err(DomainError::InvalidInput(format!(
                "unknown memo type `{other}` (expected APPROVAL|EXTERNAL_LETTER|AUDIT_LETTER|INTERNAL|CIRCULAR)"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approval => "APPROVAL",
            Self::ExternalLetter => "EXTERNAL_LETTER",
            Self::AuditLetter => "AUDIT_LETTER",
            Self::Internal => "INTERNAL",
            Self::Circular => "CIRCULAR",
        }
    }

    /// Human-facing label with underscores expanded, as shown on rendered
    /// documents ("EXTERNAL LETTER" rather than "EXTERNAL_LETTER").
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemoPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl MemoPriority {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "URGENT" => Ok(Self::Urgent),
            other => Err(DomainError::InvalidInput(format!(
                "unknown memo priority `{other}` (expected LOW|MEDIUM|HIGH|URGENT)"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }

    /// RGB fill used for the priority badge on rendered documents.
    pub fn badge_color(&self) -> (u8, u8, u8) {
        match self {
            Self::Urgent => (220, 38, 38),
            Self::High => (234, 179, 8),
            Self::Medium => (59, 130, 246),
            Self::Low => (156, 163, 175),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
    Sent,
    Archived,
}

impl MemoStatus {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "DRAFT" => Ok(Self::Draft),
            "PENDING_APPROVAL" => Ok(Self::PendingApproval),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "SENT" => Ok(Self::Sent),
            "ARCHIVED" => Ok(Self::Archived),
            other => Err(DomainError::InvalidInput(format!(
                "unknown memo status `{other}` (expected DRAFT|PENDING_APPROVAL|APPROVED|REJECTED|SENT|ARCHIVED)"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Sent => "SENT",
            Self::Archived => "ARCHIVED",
        }
    }

    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Memo {
    pub id: MemoId,
    pub reference_number: String,
    pub subject: String,
    pub body: String,
    pub memo_type: MemoType,
    pub priority: MemoPriority,
    pub status: MemoStatus,
    pub department_id: Option<DepartmentId>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Fields required to create a memo. Validation happens before any id or
/// reference number is allocated.
#[derive(Clone, Debug)]
pub struct NewMemo {
    pub subject: String,
    pub body: String,
    pub memo_type: MemoType,
    pub priority: MemoPriority,
    pub department_id: Option<DepartmentId>,
    pub created_by: UserId,
    pub recipient_ids: Vec<UserId>,
}

impl NewMemo {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.subject.trim().is_empty() {
            return Err(DomainError::InvalidInput("subject is required".to_string()));
        }
        if self.body.trim().is_empty() {
            return Err(DomainError::InvalidInput("body is required".to_string()));
        }
        if self.created_by.0.trim().is_empty() {
            return Err(DomainError::InvalidInput("creator is required".to_string()));
        }
        Ok(())
    }
}
