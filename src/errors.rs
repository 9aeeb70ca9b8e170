//! Batch error taxonomy. Validation and transport failures stay distinct
//! kinds; the coordinator never folds one into the other.

use thiserror::Error;

/// A file rejected before any network traffic. The message lists the
/// extensions the policy accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub file_name: String,
    pub message: String,
}

/// A file whose submission was accepted by validation but failed in
/// transit. `message` and `context` come from the server's structured
/// error payload when one was present, otherwise from the transport's
/// generic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub message: String,
    pub context: String,
    pub file_name: String,
}

/// Entry in the coordinator's observable error sequence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("{}: {}", .0.file_name, .0.message)]
    Validation(ValidationFailure),
    #[error("{}: {}", .0.file_name, .0.message)]
    Transport(TransportFailure),
}

impl BatchError {
    /// Name of the file this error belongs to.
    pub fn file_name(&self) -> &str {
        match self {
            BatchError::Validation(failure) => &failure.file_name,
            BatchError::Transport(failure) => &failure.file_name,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            BatchError::Validation(failure) => &failure.message,
            BatchError::Transport(failure) => &failure.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_reach_through_both_kinds() {
        let validation = BatchError::Validation(ValidationFailure {
            file_name: "a.exe".to_string(),
            message: "not supported".to_string(),
        });
        let transport = BatchError::Transport(TransportFailure {
            message: "quota exceeded".to_string(),
            context: String::new(),
            file_name: "b.png".to_string(),
        });

        assert_eq!(validation.file_name(), "a.exe");
        assert_eq!(validation.message(), "not supported");
        assert_eq!(transport.file_name(), "b.png");
        assert_eq!(transport.message(), "quota exceeded");
    }

    #[test]
    fn display_includes_file_name_and_message() {
        let err = BatchError::Transport(TransportFailure {
            message: "quota exceeded".to_string(),
            context: String::new(),
            file_name: "b.png".to_string(),
        });

        assert_eq!(err.to_string(), "b.png: quota exceeded");
    }
}
