//! Structured formula errors
//!
//! Strict entry points hand these back to the caller. The lenient entry
//! points log them and degrade to `Null`, so a bad formula never blocks a
//! record write.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard error codes (machine-readable)
pub mod codes {
    pub const SYNTAX_ERROR: &str = "SYNTAX_ERROR";
    pub const SECURITY_VIOLATION: &str = "SECURITY_VIOLATION";
    pub const UNKNOWN_IDENTIFIER: &str = "UNKNOWN_IDENTIFIER";
    pub const DIV_ZERO: &str = "DIV_ZERO";
    pub const TYPE_ERROR: &str = "TYPE_ERROR";
    pub const ARG_COUNT: &str = "ARG_COUNT";
    pub const LIMIT_EXCEEDED: &str = "LIMIT_EXCEEDED";
}

/// Everything that can go wrong between a formula string and its value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("{}", render_syntax(.message, .position))]
    Syntax {
        message: String,
        position: Option<usize>,
    },

    #[error("Security violation: {0}")]
    SecurityViolation(String),

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Type error: expected {expected}, got {found}")]
    Type { expected: String, found: String },

    #[error("{function}() expects {expected} arguments, got {got}")]
    ArgumentCount {
        function: String,
        expected: String,
        got: usize,
    },

    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
}

fn render_syntax(message: &str, position: &Option<usize>) -> String {
    match position {
        Some(pos) => format!("Syntax error: {} at position {}", message, pos),
        None => format!("Syntax error: {}", message),
    }
}

impl FormulaError {
    // ========== Common Error Constructors ==========

    pub fn syntax(message: impl Into<String>, position: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            position: Some(position),
        }
    }

    pub fn syntax_at_end(message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
            position: None,
        }
    }

    pub fn security(message: impl Into<String>) -> Self {
        Self::SecurityViolation(message.into())
    }

    pub fn disallowed_character(character: char, index: usize) -> Self {
        Self::SecurityViolation(format!(
            "Disallowed character '{}' at index {}",
            character, index
        ))
    }

    pub fn type_error(expected: &str, found: &str) -> Self {
        Self::Type {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn limit(details: impl Into<String>) -> Self {
        Self::LimitExceeded(details.into())
    }

    /// Machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => codes::SYNTAX_ERROR,
            Self::SecurityViolation(_) => codes::SECURITY_VIOLATION,
            Self::UnknownIdentifier(_) => codes::UNKNOWN_IDENTIFIER,
            Self::DivisionByZero => codes::DIV_ZERO,
            Self::Type { .. } => codes::TYPE_ERROR,
            Self::ArgumentCount { .. } => codes::ARG_COUNT,
            Self::LimitExceeded(_) => codes::LIMIT_EXCEEDED,
        }
    }

    pub fn is_security_violation(&self) -> bool {
        matches!(self, Self::SecurityViolation(_))
    }

    /// Serializable form for callers outside the process
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

/// Wire form of a [`FormulaError`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
}

impl From<&FormulaError> for ErrorReport {
    fn from(err: &FormulaError) -> Self {
        err.report()
    }
}

/// Outcome of validating a formula or expression
///
/// Errors are collected rather than short-circuited so the schema editor can
/// show all of them at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    /// Build from a list of messages; valid iff the list is empty.
    /// Duplicates are dropped, first occurrence wins.
    pub fn from_errors(errors: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(errors.len());
        for e in errors {
            if !unique.contains(&e) {
                unique.push(e);
            }
        }
        Self {
            is_valid: unique.is_empty(),
            errors: unique,
        }
    }

    pub fn push(&mut self, error: impl Into<String>) {
        let error = error.into();
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
        self.is_valid = false;
    }

    /// Append another result's errors after this one's
    pub fn merge(mut self, other: ValidationResult) -> Self {
        for e in other.errors {
            self.push(e);
        }
        self
    }
}
