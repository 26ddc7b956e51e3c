//! Input validation for workflow commands.
//!
//! Every validator trims its input and returns the normalized value, so the
//! store never holds leading or trailing whitespace.

use finplat_shared::{Amount, WalletAddress, WorkflowConfig};
use validator::ValidateEmail;

use crate::workflow::error::WorkflowError;

/// Longest accepted e-mail address.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Length limits applied to free-text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLimits {
    /// Maximum user name length in characters.
    pub max_name_length: usize,
    /// Maximum transaction description length in characters.
    pub max_description_length: usize,
    /// Maximum approval reason length in characters.
    pub max_reason_length: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self::from(&WorkflowConfig::default())
    }
}

impl From<&WorkflowConfig> for InputLimits {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            max_name_length: config.max_name_length,
            max_description_length: config.max_description_length,
            max_reason_length: config.max_reason_length,
        }
    }
}

impl InputLimits {
    /// Validates a display name.
    pub fn name(&self, name: &str) -> Result<String, WorkflowError> {
        required_text("name", name, self.max_name_length)
    }

    /// Validates an e-mail address.
    pub fn email(&self, email: &str) -> Result<String, WorkflowError> {
        let email = required_text("email", email, MAX_EMAIL_LENGTH)?;
        if !email.validate_email() {
            return Err(WorkflowError::invalid_input(
                "email",
                "not a valid e-mail address",
            ));
        }
        Ok(email)
    }

    /// Validates a transaction description.
    pub fn description(&self, description: &str) -> Result<String, WorkflowError> {
        required_text("description", description, self.max_description_length)
    }

    /// Validates the reason given when requesting approval.
    pub fn reason(&self, reason: &str) -> Result<String, WorkflowError> {
        required_text("reason", reason, self.max_reason_length)
    }

    /// Validates the optional note given when processing an approval.
    /// Blank notes collapse to `None`.
    pub fn approver_note(&self, note: Option<&str>) -> Result<Option<String>, WorkflowError> {
        match note.map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => bounded("reason", text, self.max_reason_length).map(Some),
        }
    }
}

/// Validates a transfer amount.
pub fn amount(amount: Amount) -> Result<Amount, WorkflowError> {
    if amount == 0 {
        return Err(WorkflowError::invalid_input(
            "amount",
            "must be greater than zero",
        ));
    }
    Ok(amount)
}

/// Validates that sender and receiver differ.
pub fn distinct_parties(from: &WalletAddress, to: &WalletAddress) -> Result<(), WorkflowError> {
    if from == to {
        return Err(WorkflowError::invalid_input(
            "to",
            "cannot send a transaction to yourself",
        ));
    }
    Ok(())
}

fn required_text(field: &'static str, value: &str, max: usize) -> Result<String, WorkflowError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::invalid_input(field, "is required"));
    }
    bounded(field, trimmed, max)
}

fn bounded(field: &'static str, trimmed: &str, max: usize) -> Result<String, WorkflowError> {
    let len = trimmed.chars().count();
    if len > max {
        return Err(WorkflowError::invalid_input(
            field,
            format!("must be at most {max} characters, got {len}"),
        ));
    }
    Ok(trimmed.to_string())
}
