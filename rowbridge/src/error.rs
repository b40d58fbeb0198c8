///
/// Error types for row iteration.
///
/// Read-path operations (metadata, next, was_null, column getters) fail with
/// `DriverError`. Driver fault types are flattened to their display text so
/// no driver-specific type crosses the iterator boundary.
///
/// Teardown failures are `CloseFault`s. They are recorded on the iterator and
/// logged, never returned.
///

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DriverError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("{message}")]
    Fault { message: String },

    #[error("Row iterator is closed: cannot {operation}")]
    Closed { operation: &'static str },

    #[error("Column index {column} out of range 1..={count}")]
    ColumnIndex { column: usize, count: usize },
}

impl DriverError {
    pub fn from_fault(fault: impl fmt::Display) -> Self {
        DriverError::Fault {
            message: fault.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseStep {
    Cursor,
    Statement,
    Session,
}

impl fmt::Display for CloseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseStep::Cursor => write!(f, "close cursor"),
            CloseStep::Statement => write!(f, "close statement"),
            CloseStep::Session => write!(f, "release session"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to {step}: {message}")]
pub struct CloseFault {
    pub step: CloseStep,
    pub message: String,
}

impl CloseFault {
    pub fn new(step: CloseStep, fault: impl fmt::Display) -> Self {
        Self {
            step,
            message: fault.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_keeps_driver_message() {
        let err = DriverError::from_fault("connection reset by peer");
        assert_eq!(err.to_string(), "connection reset by peer");
        assert!(matches!(err, DriverError::Fault { .. }));
    }

    #[test]
    fn test_error_display_messages() {
        let err = DriverError::Closed { operation: "advance" };
        assert!(err.to_string().contains("closed"));
        assert!(err.to_string().contains("advance"));

        let err = DriverError::ColumnIndex { column: 0, count: 3 };
        assert!(err.to_string().contains("Column index 0"));
        assert!(err.to_string().contains("1..=3"));

        let fault = CloseFault::new(CloseStep::Statement, "statement busy");
        assert_eq!(fault.to_string(), "Failed to close statement: statement busy");
    }
}
