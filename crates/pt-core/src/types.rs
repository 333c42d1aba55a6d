//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The user ID was not a number.
    #[error("invalid user ID: {value} (must be a number)")]
    InvalidUserId { value: String },

    /// The phone number contained characters other than digits and separators.
    #[error("invalid phone number: {value}")]
    InvalidPhone { value: String },
}

/// How the tracked identity is looked up on the presence service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identifier {
    /// International phone number, e.g. `+15551234567`.
    Phone(String),
    /// Numeric account ID.
    UserId(i64),
}

impl Identifier {
    /// Validates a phone number.
    ///
    /// Spaces, dashes and parentheses are accepted as separators and stripped;
    /// a single leading `+` is kept.
    pub fn phone(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "phone" });
        }

        let mut normalized = String::with_capacity(trimmed.len());
        for (i, c) in trimmed.chars().enumerate() {
            match c {
                '0'..='9' => normalized.push(c),
                '+' if i == 0 => normalized.push(c),
                ' ' | '-' | '(' | ')' => {}
                _ => {
                    return Err(ValidationError::InvalidPhone {
                        value: trimmed.to_string(),
                    });
                }
            }
        }

        if !normalized.chars().any(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidPhone {
                value: trimmed.to_string(),
            });
        }
        Ok(Self::Phone(normalized))
    }

    /// Parses a numeric user ID.
    pub fn user_id(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "user ID" });
        }
        trimmed
            .parse::<i64>()
            .map(Self::UserId)
            .map_err(|_| ValidationError::InvalidUserId {
                value: trimmed.to_string(),
            })
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phone(phone) => f.write_str(phone),
            Self::UserId(id) => write!(f, "{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_strips_separators() {
        let id = Identifier::phone(" +1 (555) 123-4567 ").unwrap();
        assert_eq!(id, Identifier::Phone("+15551234567".to_string()));
        assert_eq!(id.to_string(), "+15551234567");
    }

    #[test]
    fn phone_rejects_empty() {
        assert_eq!(
            Identifier::phone("   "),
            Err(ValidationError::Empty { field: "phone" })
        );
    }

    #[test]
    fn phone_rejects_letters() {
        assert!(matches!(
            Identifier::phone("+1555abc"),
            Err(ValidationError::InvalidPhone { .. })
        ));
    }

    #[test]
    fn phone_rejects_plus_only() {
        assert!(matches!(
            Identifier::phone("+"),
            Err(ValidationError::InvalidPhone { .. })
        ));
    }

    #[test]
    fn phone_rejects_inner_plus() {
        assert!(Identifier::phone("1+555").is_err());
    }

    #[test]
    fn user_id_parses_number() {
        assert_eq!(
            Identifier::user_id(" 123456789 ").unwrap(),
            Identifier::UserId(123_456_789)
        );
    }

    #[test]
    fn user_id_rejects_non_numeric() {
        let err = Identifier::user_id("alice").unwrap_err();
        assert_eq!(err.to_string(), "invalid user ID: alice (must be a number)");
    }

    #[test]
    fn user_id_rejects_empty() {
        assert!(matches!(
            Identifier::user_id(""),
            Err(ValidationError::Empty { .. })
        ));
    }
}
