use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }
}

impl DomainError {
    /// True when the failure names a missing entity rather than bad input.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::DomainError;

    #[test]
    fn not_found_carries_entity_and_id() {
        let error = DomainError::not_found("memo", "memo-42");
        assert_eq!(error.to_string(), "memo `memo-42` was not found");
        assert!(error.is_not_found());
    }

    #[test]
    fn invalid_input_is_not_a_missing_entity() {
        let error = DomainError::InvalidInput("subject is required".to_string());
        assert!(!error.is_not_found());
    }
}
