use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrideError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Course is full: {0}")]
    CapacityExceeded(String),

    #[error("Another command is still in flight")]
    Busy,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StrideError {
    /// Returns `true` when the request was well-formed but collides with the
    /// current state of the store (HTTP 409 territory).
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateId(_)
                | Self::Conflict(_)
                | Self::CapacityExceeded(_)
                | Self::Busy
                | Self::NothingToUndo
        )
    }
}

pub type Result<T> = std::result::Result<T, StrideError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_kinds() {
        assert!(StrideError::DuplicateId("c1".into()).is_conflict());
        assert!(StrideError::CapacityExceeded("c1".into()).is_conflict());
        assert!(StrideError::Busy.is_conflict());
    }

    #[test]
    fn test_non_conflict_kinds() {
        assert!(!StrideError::NotFound("course c9".into()).is_conflict());
        assert!(!StrideError::InvalidInput("title cannot be empty".into()).is_conflict());
        assert!(!StrideError::Config("bad".into()).is_conflict());
    }

    #[test]
    fn test_display_messages() {
        let err = StrideError::NotFound("course c9".into());
        assert_eq!(err.to_string(), "Not found: course c9");
        assert_eq!(StrideError::Busy.to_string(), "Another command is still in flight");
    }
}
