// ABOUTME: Validated contract name captured when a deployment is initiated.
// ABOUTME: Rejects blank names and names too long for the custody platform.

use std::fmt;
use thiserror::Error;

/// Longest contract name the custody platform accepts.
pub const MAX_CONTRACT_NAME_LEN: usize = 255;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContractNameError {
    #[error("contract name is required")]
    Empty,

    #[error("contract name exceeds maximum length of {MAX_CONTRACT_NAME_LEN} characters")]
    TooLong,

    #[error("contract name cannot contain control characters")]
    ControlChar,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractName(String);

impl ContractName {
    pub fn new(value: &str) -> Result<Self, ContractNameError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ContractNameError::Empty);
        }

        if value.chars().count() > MAX_CONTRACT_NAME_LEN {
            return Err(ContractNameError::TooLong);
        }

        if value.chars().any(char::is_control) {
            return Err(ContractNameError::ControlChar);
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
