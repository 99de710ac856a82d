//! Password policy applied to new passwords.
//!
//! Only passwords that will protect new or re-sealed containers are checked;
//! opening an existing file accepts whatever password sealed it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    /// Minimum length in characters (default: 8)
    pub min_length: usize,
    pub require_upper: bool,
    pub require_lower: bool,
    pub require_number: bool,
    /// Any character that is neither alphanumeric nor whitespace
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_upper: true,
            require_lower: true,
            require_number: true,
            require_special: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("password must be at least {min} characters")]
    TooShort { min: usize },

    #[error("password must contain an uppercase letter")]
    MissingUpper,

    #[error("password must contain a lowercase letter")]
    MissingLower,

    #[error("password must contain a digit")]
    MissingNumber,

    #[error("password must contain a special character")]
    MissingSpecial,
}

impl PasswordPolicy {
    /// Check `password`, reporting the first unmet requirement.
    pub fn validate(&self, password: &str) -> Result<(), PolicyViolation> {
        if password.chars().count() < self.min_length {
            return Err(PolicyViolation::TooShort {
                min: self.min_length,
            });
        }
        if self.require_upper && !password.chars().any(char::is_uppercase) {
            return Err(PolicyViolation::MissingUpper);
        }
        if self.require_lower && !password.chars().any(char::is_lowercase) {
            return Err(PolicyViolation::MissingLower);
        }
        if self.require_number && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(PolicyViolation::MissingNumber);
        }
        if self.require_special
            && !password
                .chars()
                .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
        {
            return Err(PolicyViolation::MissingSpecial);
        }
        Ok(())
    }

    /// One-line summary for prompts.
    pub fn describe(&self) -> String {
        let mut parts = vec![format!("at least {} characters", self.min_length)];
        if self.require_upper {
            parts.push("an uppercase letter".into());
        }
        if self.require_lower {
            parts.push("a lowercase letter".into());
        }
        if self.require_number {
            parts.push("a digit".into());
        }
        if self.require_special {
            parts.push("a special character".into());
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = PasswordPolicy::default();

        assert!(policy.validate("Correct9horse").is_ok());
        assert_eq!(
            policy.validate("Sh0rt"),
            Err(PolicyViolation::TooShort { min: 8 })
        );
        assert_eq!(policy.validate("lowercase9"), Err(PolicyViolation::MissingUpper));
        assert_eq!(policy.validate("UPPERCASE9"), Err(PolicyViolation::MissingLower));
        assert_eq!(policy.validate("NoDigitsHere"), Err(PolicyViolation::MissingNumber));
    }

    #[test]
    fn test_length_counts_characters() {
        let policy = PasswordPolicy {
            min_length: 4,
            require_upper: false,
            require_lower: false,
            require_number: false,
            require_special: false,
        };
        // 4 characters, 8 bytes
        assert!(policy.validate("żółw").is_ok());
        assert!(policy.validate("żół").is_err());
    }

    #[test]
    fn test_require_special() {
        let policy = PasswordPolicy {
            require_special: true,
            ..PasswordPolicy::default()
        };
        assert_eq!(
            policy.validate("Abcdefg1 "),
            Err(PolicyViolation::MissingSpecial)
        );
        assert!(policy.validate("Abcdefg1!").is_ok());
    }

    #[test]
    fn test_describe() {
        let text = PasswordPolicy::default().describe();
        assert!(text.starts_with("at least 8 characters"));
        assert!(!text.contains("special"));
    }
}
